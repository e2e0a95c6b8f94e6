// SQLite rollout store
// Sessions table is the index; items table is the append-only log

mod cursor;
mod db;
mod error;
mod queries;
mod records;
mod schema;

// Public API
pub use cursor::Cursor;
pub use db::{Database, DEFAULT_CLEANUP_BATCH, DEFAULT_SCAN_CAP, MAX_PAGE_SIZE};
pub use error::{Error, Result};
pub use records::{
    CleanupReport, CommitOutcome, ConversationPage, ConversationSummary, ItemRecord,
    SessionMetaRecord, SessionRecord,
};
pub use schema::SCHEMA_VERSION;
