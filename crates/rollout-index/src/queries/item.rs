use chrono::{DateTime, Utc};
use rollout_types::{ItemKind, RolloutItem, SessionId, from_millis, to_millis, truncate};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{
    Error, Result,
    records::{CommitOutcome, ItemRecord},
};

/// Maximum characters kept from the first user message
pub const PREVIEW_MAX_CHARS: usize = 200;

/// Commit one batch for a session.
///
/// The batch must start exactly at the session's current item count. Items,
/// `item_count`, `updated_at` and the listing flags change in one transaction,
/// so a failure leaves the session exactly as it was.
pub fn append_batch(
    conn: &Connection,
    session_id: &SessionId,
    first_sequence: u64,
    items: &[RolloutItem],
    now: DateTime<Utc>,
) -> Result<CommitOutcome> {
    let id = session_id.to_string();

    // Encode before opening the transaction
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        rows.push((item.kind().as_str(), item.payload_json()?));
    }
    let has_user_event = items.iter().any(RolloutItem::is_user_visible);
    let preview = items
        .iter()
        .find_map(RolloutItem::user_message_text)
        .map(|text| truncate(text.trim(), PREVIEW_MAX_CHARS));

    let tx = conn.unchecked_transaction()?;

    let current: Option<i64> = tx
        .query_row(
            "SELECT item_count FROM sessions WHERE id = ?1",
            [&id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(current) = current else {
        return Err(Error::SessionGone(id));
    };
    if current as u64 != first_sequence {
        return Err(Error::SequenceConflict {
            session_id: id,
            expected: first_sequence,
            found: current as u64,
        });
    }

    let now_ms = to_millis(now);
    {
        let mut stmt = tx.prepare(
            "INSERT INTO items (session_id, seq, ts, kind, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (offset, (kind, payload)) in rows.iter().enumerate() {
            let seq = first_sequence + offset as u64;
            stmt.execute(params![&id, seq as i64, now_ms, kind, payload])?;
        }
    }

    tx.execute(
        r#"
        UPDATE sessions SET
            item_count = item_count + ?2,
            updated_at = MAX(updated_at, ?3),
            has_user_event = MAX(has_user_event, ?4),
            preview = COALESCE(preview, ?5)
        WHERE id = ?1
        "#,
        params![&id, rows.len() as i64, now_ms, has_user_event as i64, &preview],
    )?;

    let (item_count, updated_ms): (i64, i64) = tx.query_row(
        "SELECT item_count, updated_at FROM sessions WHERE id = ?1",
        [&id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    tx.commit()?;

    Ok(CommitOutcome {
        first_sequence,
        item_count: item_count as u64,
        updated: from_millis(updated_ms),
    })
}

/// Highest stored sequence for a session, `None` if it has no items
pub fn last_sequence(conn: &Connection, session_id: &SessionId) -> Result<Option<u64>> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(seq) FROM items WHERE session_id = ?1",
        [session_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(max.map(|seq| seq as u64))
}

/// Load a session's log in sequence order.
///
/// Every row must decode, sequences must run `0, 1, 2, ...` starting with
/// the `session-meta` header, and the row count must match the session's
/// `item_count`; anything else is reported as corrupt rather than skipped.
pub fn load_all(conn: &Connection, session_id: &SessionId) -> Result<Vec<ItemRecord>> {
    let id = session_id.to_string();
    // One read transaction so the count and the rows come from the same snapshot
    let tx = conn.unchecked_transaction()?;
    let item_count: Option<i64> = tx
        .query_row(
            "SELECT item_count FROM sessions WHERE id = ?1",
            [&id],
            |row| row.get(0),
        )
        .optional()?;

    let mut stmt = tx.prepare(
        r#"
        SELECT seq, ts, kind, payload
        FROM items
        WHERE session_id = ?1
        ORDER BY seq ASC
        "#,
    )?;

    let rows = stmt
        .query_map([&id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    let mut records = Vec::with_capacity(rows.len());
    for (expected, (seq, ts, kind, payload)) in rows.into_iter().enumerate() {
        let expected = expected as u64;
        let corrupt = |reason: String| Error::CorruptRecord {
            session_id: id.clone(),
            sequence: Some(seq.max(0) as u64),
            reason,
        };

        if seq < 0 || seq as u64 != expected {
            return Err(corrupt(format!("sequence gap: expected {}", expected)));
        }
        let kind = kind.parse::<ItemKind>().map_err(corrupt)?;
        if expected == 0 && kind != ItemKind::SessionMeta {
            return Err(corrupt(format!("log starts with {} instead of session-meta", kind)));
        }
        let item = RolloutItem::from_payload_json(kind, &payload)
            .map_err(|e| corrupt(e.to_string()))?;

        records.push(ItemRecord {
            session_id: *session_id,
            sequence: expected,
            timestamp: from_millis(ts),
            item,
        });
    }

    if let Some(count) = item_count
        && count != records.len() as i64
    {
        return Err(Error::CorruptRecord {
            session_id: id,
            sequence: None,
            reason: format!(
                "log has {} items but the session records {}",
                records.len(),
                count
            ),
        });
    }

    Ok(records)
}
