//! Rollout recorder runtime.
//!
//! Decides which conversation items are durable, writes them in order
//! through one background writer per session, and answers listing, history
//! and retention queries against the shared index.

pub mod config;
mod error;
pub mod ops;
pub mod policy;
mod reaper;
mod recorder;
mod sequencer;
mod store;

pub use config::{Config, ListingConfig, WriterConfig, resolve_data_dir};
pub use error::{Error, Result};
pub use ops::{export_session, import_session};
pub use policy::{filter_persisted, should_persist};
pub use reaper::{Reaper, ReaperHandle};
pub use recorder::{CreateOptions, InitialHistory, ResumedHistory, RolloutRecorder};
pub use sequencer::PendingWrite;
pub use store::RolloutStore;

pub use rollout_index::{
    CleanupReport, CommitOutcome, ConversationPage, ConversationSummary, Cursor, ItemRecord,
    MAX_PAGE_SIZE, SessionRecord,
};
