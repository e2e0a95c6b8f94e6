use chrono::{DateTime, Utc};
use rollout_types::{
    GitInfo, RolloutItem, SessionId, SessionMetaLine, SessionStatus, from_millis, to_millis,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{
    Error, Result,
    records::{SessionMetaRecord, SessionRecord},
};

const SESSION_COLUMNS: &str = "id, created_at, updated_at, expires_at, originator, cwd, \
                               instructions, git_json, item_count, status, preview";

/// Session row as stored, before domain validation
pub(crate) struct RawSession {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub expires_at: Option<i64>,
    pub originator: String,
    pub cwd: String,
    pub instructions: Option<String>,
    pub git_json: Option<String>,
    pub item_count: i64,
    pub status: String,
    pub preview: Option<String>,
}

impl RawSession {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            updated_at: row.get(2)?,
            expires_at: row.get(3)?,
            originator: row.get(4)?,
            cwd: row.get(5)?,
            instructions: row.get(6)?,
            git_json: row.get(7)?,
            item_count: row.get(8)?,
            status: row.get(9)?,
            preview: row.get(10)?,
        })
    }

    pub fn into_record(self) -> Result<SessionRecord> {
        let corrupt = |reason: String| Error::CorruptRecord {
            session_id: self.id.clone(),
            sequence: None,
            reason,
        };

        let id = SessionId::parse(&self.id).map_err(|e| corrupt(e.to_string()))?;
        let status = self.status.parse::<SessionStatus>().map_err(corrupt)?;
        let item_count = u64::try_from(self.item_count)
            .map_err(|_| corrupt(format!("negative item count {}", self.item_count)))?;
        let git = match &self.git_json {
            Some(json) => Some(
                serde_json::from_str::<GitInfo>(json)
                    .map_err(|e| corrupt(format!("bad git info: {}", e)))?,
            ),
            None => None,
        };

        Ok(SessionRecord {
            id,
            created: from_millis(self.created_at),
            updated: from_millis(self.updated_at),
            expires_at: self.expires_at.map(from_millis),
            meta: SessionMetaRecord {
                originator: self.originator,
                cwd: self.cwd,
                instructions: self.instructions,
                git,
            },
            item_count,
            status,
            preview: self.preview,
        })
    }
}

/// Insert the session row and its `session-meta` item (sequence 0) together.
pub fn create(
    conn: &Connection,
    meta: &SessionMetaLine,
    created: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<SessionRecord> {
    let id = meta.meta.id.to_string();
    let record = SessionMetaRecord::from_line(meta);
    let git_json = record.git.as_ref().map(serde_json::to_string).transpose()?;
    let header = RolloutItem::SessionMeta(meta.clone());
    let payload = header.payload_json()?;
    let created_ms = to_millis(created);

    let tx = conn.unchecked_transaction()?;

    let exists = tx
        .query_row("SELECT 1 FROM sessions WHERE id = ?1", [&id], |_| Ok(()))
        .optional()?
        .is_some();
    if exists {
        return Err(Error::AlreadyExists(id));
    }

    tx.execute(
        r#"
        INSERT INTO sessions (id, created_at, updated_at, expires_at, originator, cwd,
                              instructions, git_json, item_count, status)
        VALUES (?1, ?2, ?2, ?3, ?4, ?5, ?6, ?7, 1, 'active')
        "#,
        params![
            &id,
            created_ms,
            expires_at.map(to_millis),
            &record.originator,
            &record.cwd,
            &record.instructions,
            &git_json,
        ],
    )?;

    tx.execute(
        "INSERT INTO items (session_id, seq, ts, kind, payload) VALUES (?1, 0, ?2, ?3, ?4)",
        params![&id, created_ms, header.kind().as_str(), &payload],
    )?;

    tx.commit()?;

    Ok(SessionRecord {
        id: meta.meta.id,
        created: from_millis(created_ms),
        updated: from_millis(created_ms),
        expires_at: expires_at.map(|ts| from_millis(to_millis(ts))),
        meta: record,
        item_count: 1,
        status: SessionStatus::Active,
        preview: None,
    })
}

pub fn get_by_id(conn: &Connection, session_id: &SessionId) -> Result<Option<SessionRecord>> {
    let query = format!("SELECT {} FROM sessions WHERE id = ?1", SESSION_COLUMNS);
    let raw = conn
        .query_row(&query, [session_id.to_string()], RawSession::from_row)
        .optional()?;

    raw.map(RawSession::into_record).transpose()
}

pub fn exists(conn: &Connection, session_id: &SessionId) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sessions WHERE id = ?1",
            [session_id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Ids of sessions whose expiry lies strictly before `now`, oldest expiry first.
///
/// Ids are returned raw so that a row with a malformed id can still be reaped.
pub fn expired_ids(conn: &Connection, now: DateTime<Utc>, limit: usize) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id FROM sessions
        WHERE expires_at IS NOT NULL AND expires_at < ?1
        ORDER BY expires_at ASC, id ASC
        LIMIT ?2
        "#,
    )?;

    let ids = stmt
        .query_map(params![to_millis(now), limit as i64], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, rusqlite::Error>>()?;

    Ok(ids)
}

/// Remove a session and all of its items in one transaction.
pub fn delete(conn: &Connection, session_id: &str) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM items WHERE session_id = ?1", [session_id])?;
    let removed = tx.execute("DELETE FROM sessions WHERE id = ?1", [session_id])?;
    tx.commit()?;
    Ok(removed > 0)
}

/// Reaper variant of [`delete`]: re-checks expiry inside the transaction and
/// marks the row expired before removing it.
///
/// Returns `false` without touching anything if the session is gone or no
/// longer expired.
pub fn delete_if_expired(conn: &Connection, session_id: &str, now: DateTime<Utc>) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;

    let marked = tx.execute(
        r#"
        UPDATE sessions SET status = 'expired'
        WHERE id = ?1 AND expires_at IS NOT NULL AND expires_at < ?2
        "#,
        params![session_id, to_millis(now)],
    )?;
    if marked == 0 {
        return Ok(false);
    }

    tx.execute("DELETE FROM items WHERE session_id = ?1", [session_id])?;
    tx.execute("DELETE FROM sessions WHERE id = ?1", [session_id])?;
    tx.commit()?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::{Duration, TimeZone};
    use rollout_types::SessionMeta;
    use std::path::PathBuf;

    fn meta(id: SessionId) -> SessionMetaLine {
        SessionMetaLine {
            meta: SessionMeta {
                id,
                timestamp: "2025-01-01T00:00:00.000Z".to_string(),
                cwd: PathBuf::from("/work"),
                originator: "test".to_string(),
                cli_version: "0.0.0".to_string(),
                instructions: Some("debug task".to_string()),
            },
            git: Some(GitInfo {
                branch: Some("main".to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_create_writes_header_and_row() -> Result<()> {
        let db = Database::open_in_memory()?;
        let id = SessionId::new();
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let record = create(db.conn(), &meta(id), created, Some(created + Duration::days(60)))?;
        assert_eq!(record.item_count, 1);
        assert_eq!(record.updated, record.created);

        let loaded = get_by_id(db.conn(), &id)?.expect("session row");
        assert_eq!(loaded, record);
        assert_eq!(loaded.meta.instructions.as_deref(), Some("debug task"));
        assert_eq!(
            loaded.meta.git.and_then(|g| g.branch).as_deref(),
            Some("main")
        );

        Ok(())
    }

    #[test]
    fn test_create_twice_is_rejected() -> Result<()> {
        let db = Database::open_in_memory()?;
        let id = SessionId::new();
        let created = Utc::now();

        create(db.conn(), &meta(id), created, None)?;
        let err = create(db.conn(), &meta(id), created, None).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert_eq!(count(db.conn())?, 1);

        Ok(())
    }

    #[test]
    fn test_delete_if_expired_respects_expiry() -> Result<()> {
        let db = Database::open_in_memory()?;
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let fresh = SessionId::new();
        create(db.conn(), &meta(fresh), now, Some(now + Duration::days(1)))?;
        assert!(!delete_if_expired(db.conn(), &fresh.to_string(), now)?);
        assert!(exists(db.conn(), &fresh)?);

        let stale = SessionId::new();
        create(db.conn(), &meta(stale), now - Duration::days(2), Some(now - Duration::days(1)))?;
        assert!(delete_if_expired(db.conn(), &stale.to_string(), now)?);
        assert!(!exists(db.conn(), &stale)?);

        Ok(())
    }
}
