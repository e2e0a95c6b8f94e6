use chrono::{DateTime, Utc};
use rollout_types::{RolloutItem, SessionId, SessionMetaLine};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

use crate::queries::{item, listing, session};
use crate::records::{CleanupReport, CommitOutcome, ConversationPage, ItemRecord, SessionRecord};
use crate::{Cursor, Error, Result, schema};

/// Upper bound for `list_conversations` page size
pub const MAX_PAGE_SIZE: usize = 100;

/// Raw session rows a single listing call may inspect
pub const DEFAULT_SCAN_CAP: usize = 100;

/// Expired sessions handled per cleanup pass
pub const DEFAULT_CLEANUP_BATCH: usize = 500;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;

        schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    // Session index

    /// Create a session row together with its `session-meta` item at sequence 0
    pub fn create_session(
        &self,
        meta: &SessionMetaLine,
        created: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<SessionRecord> {
        session::create(&self.conn, meta, created, expires_at)
    }

    pub fn get_session(&self, session_id: &SessionId) -> Result<Option<SessionRecord>> {
        session::get_by_id(&self.conn, session_id)
    }

    pub fn session_exists(&self, session_id: &SessionId) -> Result<bool> {
        session::exists(&self.conn, session_id)
    }

    pub fn count_sessions(&self) -> Result<usize> {
        session::count(&self.conn)
    }

    /// Delete a session and its items; `false` if it did not exist
    pub fn delete_session(&self, session_id: &SessionId) -> Result<bool> {
        session::delete(&self.conn, &session_id.to_string())
    }

    // Item log

    /// Commit a batch starting at `first_sequence` (must equal the current item count)
    pub fn append_items(
        &self,
        session_id: &SessionId,
        first_sequence: u64,
        items: &[RolloutItem],
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome> {
        if items.is_empty() {
            let record = self
                .get_session(session_id)?
                .ok_or_else(|| Error::SessionGone(session_id.to_string()))?;
            return Ok(CommitOutcome {
                first_sequence,
                item_count: record.item_count,
                updated: record.updated,
            });
        }

        item::append_batch(&self.conn, session_id, first_sequence, items, now)
    }

    pub fn last_sequence(&self, session_id: &SessionId) -> Result<Option<u64>> {
        item::last_sequence(&self.conn, session_id)
    }

    pub fn load_items(&self, session_id: &SessionId) -> Result<Vec<ItemRecord>> {
        item::load_all(&self.conn, session_id)
    }

    // Listing

    /// One page of listable sessions, newest first.
    ///
    /// `page_size` must be within `1..=MAX_PAGE_SIZE`.
    pub fn list_conversations(
        &self,
        page_size: usize,
        cursor: Option<&Cursor>,
        scan_cap: usize,
    ) -> Result<ConversationPage> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidPageSize(page_size));
        }
        listing::list_page(&self.conn, page_size, cursor, scan_cap)
    }

    // Cleanup

    /// Delete up to `batch` sessions whose expiry is before `now`.
    ///
    /// Each session is removed in its own transaction. A session for which
    /// `skip` returns true is left alone; a session whose delete fails is
    /// counted as failed and the pass moves on.
    pub fn cleanup_expired<F>(
        &self,
        now: DateTime<Utc>,
        batch: usize,
        mut skip: F,
    ) -> Result<CleanupReport>
    where
        F: FnMut(&SessionId) -> bool,
    {
        let batch = batch.max(1);
        let mut ids = session::expired_ids(&self.conn, now, batch + 1)?;

        let mut report = CleanupReport {
            reached_cap: ids.len() > batch,
            ..Default::default()
        };
        ids.truncate(batch);

        for raw in &ids {
            // Rows with unparseable ids cannot have a writer, so they are always eligible
            if let Ok(id) = SessionId::parse(raw) {
                if skip(&id) {
                    tracing::debug!(session_id = %id, "Skipping expired session with live writer");
                    report.skipped += 1;
                    continue;
                }
            }

            match session::delete_if_expired(&self.conn, raw, now) {
                Ok(true) => report.deleted += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(
                        session_id = %raw,
                        error = %err,
                        "Failed to delete expired session"
                    );
                    report.failed += 1;
                }
            }
        }

        if report.deleted > 0 || report.failed > 0 {
            tracing::info!(
                deleted = report.deleted,
                skipped = report.skipped,
                failed = report.failed,
                "Expired session cleanup finished"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rollout_types::{EventMsg, SessionMeta};
    use std::path::PathBuf;

    fn meta(id: SessionId) -> SessionMetaLine {
        SessionMetaLine {
            meta: SessionMeta {
                id,
                timestamp: "2025-01-01T00:00:00.000Z".to_string(),
                cwd: PathBuf::from("/work"),
                originator: "test".to_string(),
                cli_version: "0.0.0".to_string(),
                instructions: None,
            },
            git: None,
        }
    }

    fn listed_session(db: &Database, updated: DateTime<Utc>) -> SessionId {
        let id = SessionId::new();
        db.create_session(&meta(id), updated, None).unwrap();
        db.append_items(
            &id,
            1,
            &[RolloutItem::from(EventMsg::user_message("hello"))],
            updated,
        )
        .unwrap();
        id
    }

    #[test]
    fn test_page_size_bounds() -> Result<()> {
        let db = Database::open_in_memory()?;
        assert!(matches!(
            db.list_conversations(0, None, DEFAULT_SCAN_CAP),
            Err(Error::InvalidPageSize(0))
        ));
        assert!(matches!(
            db.list_conversations(MAX_PAGE_SIZE + 1, None, DEFAULT_SCAN_CAP),
            Err(Error::InvalidPageSize(101))
        ));
        assert!(db.list_conversations(MAX_PAGE_SIZE, None, DEFAULT_SCAN_CAP)?.items.is_empty());
        Ok(())
    }

    #[test]
    fn test_sessions_without_user_events_are_hidden() -> Result<()> {
        let db = Database::open_in_memory()?;
        let t0 = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();

        let bare = SessionId::new();
        db.create_session(&meta(bare), t0, None)?;
        let shown = listed_session(&db, t0);

        let page = db.list_conversations(10, None, DEFAULT_SCAN_CAP)?;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, shown);
        assert_eq!(page.num_scanned, 2);
        assert!(page.next_cursor.is_none());
        Ok(())
    }

    #[test]
    fn test_ties_on_updated_are_broken_by_id() -> Result<()> {
        let db = Database::open_in_memory()?;
        let t0 = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let mut ids: Vec<SessionId> = (0..5).map(|_| listed_session(&db, t0)).collect();
        ids.sort_by_key(|id| std::cmp::Reverse(id.to_string()));

        let first = db.list_conversations(2, None, DEFAULT_SCAN_CAP)?;
        let cursor = first.next_cursor.expect("more pages");
        let second = db.list_conversations(3, Some(&cursor), DEFAULT_SCAN_CAP)?;

        let seen: Vec<SessionId> = first
            .items
            .iter()
            .chain(second.items.iter())
            .map(|s| s.id)
            .collect();
        assert_eq!(seen, ids);
        assert!(second.next_cursor.is_none());
        Ok(())
    }

    #[test]
    fn test_scan_cap_with_nothing_listable_still_advances() -> Result<()> {
        let db = Database::open_in_memory()?;
        let t0 = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let old = listed_session(&db, t0);
        for i in 0..4 {
            let id = SessionId::new();
            db.create_session(&meta(id), t0 + chrono::Duration::minutes(i + 1), None)?;
        }

        let first = db.list_conversations(10, None, 3)?;
        assert!(first.items.is_empty());
        assert!(first.reached_cap);
        assert_eq!(first.num_scanned, 3);

        let second = db.list_conversations(10, first.next_cursor.as_ref(), 3)?;
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].id, old);
        assert!(!second.reached_cap);
        assert!(second.next_cursor.is_none());
        Ok(())
    }

    #[test]
    fn test_cleanup_skips_and_reports_cap() -> Result<()> {
        let db = Database::open_in_memory()?;
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let past = now - chrono::Duration::days(1);
        let created = now - chrono::Duration::days(10);

        let ids: Vec<SessionId> = (0..3)
            .map(|_| {
                let id = SessionId::new();
                db.create_session(&meta(id), created, Some(past)).unwrap();
                id
            })
            .collect();
        let busy = ids[0];

        let report = db.cleanup_expired(now, 2, |id| *id == busy)?;
        assert!(report.reached_cap);
        assert_eq!(report.deleted + report.skipped, 2);

        let report = db.cleanup_expired(now, 10, |id| *id == busy)?;
        assert!(!report.reached_cap);
        assert_eq!(report.skipped, 1);
        assert_eq!(db.count_sessions()?, 1);
        assert!(db.session_exists(&busy)?);
        Ok(())
    }
}
