use chrono::{DateTime, Utc};
use rollout_types::{GitInfo, RolloutItem, SessionId, SessionMetaLine, SessionStatus};
use serde::Serialize;

use crate::Cursor;

/// Complete session record from the index database.
///
/// One row per rollout. `item_count` always equals the number of rows in
/// the item log for this session; both are updated in the same transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    /// Session UUID.
    pub id: SessionId,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Time of the last committed batch (never earlier than `created`).
    pub updated: DateTime<Utc>,
    /// Expiry instant; `None` for permanent sessions.
    pub expires_at: Option<DateTime<Utc>>,
    /// Denormalized copy of the session-meta header.
    pub meta: SessionMetaRecord,
    /// Number of persisted items (sequence numbers are `0..item_count`).
    pub item_count: u64,
    pub status: SessionStatus,
    /// First user message, for listings.
    pub preview: Option<String>,
}

/// Session metadata columns, extracted from the session-meta item
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionMetaRecord {
    pub originator: String,
    pub cwd: String,
    pub instructions: Option<String>,
    pub git: Option<GitInfo>,
}

impl SessionMetaRecord {
    pub fn from_line(line: &SessionMetaLine) -> Self {
        Self {
            originator: line.meta.originator.clone(),
            cwd: line.meta.cwd.to_string_lossy().to_string(),
            instructions: line.meta.instructions.clone(),
            git: line.git.clone(),
        }
    }
}

/// One entry of a session's item log
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub session_id: SessionId,
    /// Zero-based, gap-free position within the session.
    pub sequence: u64,
    /// Commit time of the batch that wrote this item.
    pub timestamp: DateTime<Utc>,
    pub item: RolloutItem,
}

/// Result of a committed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Sequence assigned to the first item of the batch.
    pub first_sequence: u64,
    /// Session item count after the commit.
    pub item_count: u64,
    pub updated: DateTime<Utc>,
}

/// Lightweight session summary for list operations.
///
/// Returned by conversation listing. Contains only what a picker needs to
/// render a row and resume the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationSummary {
    /// Session UUID.
    pub id: SessionId,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub item_count: u64,
    pub status: SessionStatus,
    /// Working directory recorded in the session header.
    pub cwd: String,
    pub originator: String,
    /// First user message snippet for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl ConversationSummary {
    /// Position of this summary in the `(updated DESC, id DESC)` order
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.updated, self.id)
    }
}

/// One page of conversations, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationPage {
    pub items: Vec<ConversationSummary>,
    /// Resume token; `None` once the listing is exhausted.
    pub next_cursor: Option<Cursor>,
    /// Raw session rows inspected to build this page.
    pub num_scanned: usize,
    /// True if the scan cap stopped the page early.
    pub reached_cap: bool,
}

/// Outcome of a reaper pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Sessions removed together with their items.
    pub deleted: usize,
    /// Expired sessions left alone because a live writer still holds them.
    pub skipped: usize,
    /// Expired sessions whose delete transaction failed.
    pub failed: usize,
    /// True if more expired sessions remain beyond this pass's batch limit.
    pub reached_cap: bool,
}
