use chrono::Utc;
use rollout_types::{RolloutItem, RolloutLine, SessionId, SessionMetaLine, TtlConfig};
use std::io::{BufRead, Write};
use tracing::warn;

use crate::recorder::RolloutRecorder;
use crate::store::RolloutStore;
use crate::{Error, Result};

// NOTE: Line Format
//
// Export writes one RolloutLine per stored item, in sequence order, so the
// first line is always the session-meta header. Import reverses it:
// - Line 1 must be session-meta; its id becomes the new session's id
// - All lines are parsed before anything is written, so a malformed file
//   leaves the store untouched
// - Remaining items go through the persistence policy like live writes
// - If appending the items fails, the half-imported session is deleted so
//   the same file can be imported again
// - The imported session is created now; its TTL counts from import time

/// Write every stored item of a session as JSONL; returns the line count
pub async fn export_session<W: Write>(
    store: &RolloutStore,
    session_id: &str,
    mut writer: W,
) -> Result<usize> {
    let id = SessionId::parse(session_id)?;

    let records = store
        .with_db(move |db| {
            if !db.session_exists(&id)? {
                return Ok(None);
            }
            Ok(Some(db.load_items(&id)?))
        })
        .await?
        .ok_or_else(|| Error::NotFound(id.to_string()))?;

    let count = records.len();
    for record in records {
        let line = RolloutLine::new(record.timestamp, record.item);
        serde_json::to_writer(&mut writer, &line)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(count)
}

/// Create a session from an exported JSONL stream; returns its id
pub async fn import_session<R: BufRead>(
    store: &RolloutStore,
    reader: R,
    ttl: Option<TtlConfig>,
) -> Result<SessionId> {
    let mut header: Option<SessionMetaLine> = None;
    let mut items = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let parsed: RolloutLine = serde_json::from_str(&line)
            .map_err(|e| import_error(header.as_ref(), Some(index), e.to_string()))?;

        match (header.is_some(), parsed.item) {
            (false, RolloutItem::SessionMeta(meta)) => header = Some(meta),
            (false, other) => {
                let reason = format!("first line is {} instead of session-meta", other.kind());
                return Err(import_error(None, Some(index), reason));
            }
            (true, item) => items.push(item),
        }
    }

    let meta = header.ok_or_else(|| import_error(None, None, "empty input".to_string()))?;
    let id = meta.meta.id;
    let ttl = ttl.unwrap_or(store.config().ttl_days);

    let recorder = RolloutRecorder::create_from_meta(store, meta, Utc::now(), ttl).await?;
    let recorded = recorder.record_items(&items).await;
    let closed = recorder.shutdown().await;

    if let Err(err) = recorded.and(closed) {
        match RolloutRecorder::delete_session(store, &id.to_string()).await {
            Ok(_) => warn!(
                session_id = %id,
                error = %err,
                "Import failed; removed partial session"
            ),
            Err(cleanup) => warn!(
                session_id = %id,
                error = %err,
                cleanup_error = %cleanup,
                "Import failed and the partial session could not be removed"
            ),
        }
        return Err(err);
    }

    Ok(id)
}

fn import_error(header: Option<&SessionMetaLine>, line: Option<usize>, reason: String) -> Error {
    let reason = match line {
        Some(index) => format!("line {}: {}", index + 1, reason),
        None => reason,
    };
    Error::CorruptRecord {
        session_id: header
            .map(|meta| meta.meta.id.to_string())
            .unwrap_or_else(|| "<import>".to_string()),
        sequence: None,
        reason,
    }
}
