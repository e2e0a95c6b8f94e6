use rollout_types::{SessionId, SessionStatus, from_millis};
use rusqlite::{Connection, params};

use crate::{
    Cursor, Error, Result,
    records::{ConversationPage, ConversationSummary},
};

// NOTE: Pagination Algorithm
//
// Order is (updated_at DESC, id DESC); the id tiebreak makes the order total.
// A cursor is the position of the last returned summary, and the next page
// starts strictly after it:
//   updated_at < ts OR (updated_at = ts AND id < cursor_id)
//
// Each call reads at most scan_cap + 1 rows. The extra row only answers
// "is there more?". Rows failing the listing filter still count as scanned,
// so a long run of filtered sessions ends the page with reached_cap = true
// instead of an unbounded scan.

struct ListingRow {
    id: String,
    created_at: i64,
    updated_at: i64,
    expires_at: Option<i64>,
    item_count: i64,
    status: String,
    cwd: String,
    originator: String,
    preview: Option<String>,
    has_user_event: bool,
    has_header: bool,
}

pub fn list_page(
    conn: &Connection,
    page_size: usize,
    cursor: Option<&Cursor>,
    scan_cap: usize,
) -> Result<ConversationPage> {
    let scan_cap = scan_cap.max(1);

    let where_clause = match cursor {
        Some(_) => "WHERE s.updated_at < ?1 OR (s.updated_at = ?1 AND s.id < ?2)",
        None => "",
    };
    let query = format!(
        r#"
        SELECT s.id, s.created_at, s.updated_at, s.expires_at, s.item_count, s.status,
               s.cwd, s.originator, s.preview, s.has_user_event,
               EXISTS (
                   SELECT 1 FROM items i
                   WHERE i.session_id = s.id AND i.seq = 0 AND i.kind = 'session-meta'
               )
        FROM sessions s
        {}
        ORDER BY s.updated_at DESC, s.id DESC
        LIMIT ?3
        "#,
        where_clause
    );

    let (bound_ts, bound_id) = match cursor {
        Some(c) => (c.timestamp_millis(), c.id().to_string()),
        None => (0, String::new()),
    };
    let limit = (scan_cap + 1) as i64;

    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query(params![bound_ts, bound_id, limit])?;

    let mut page = ConversationPage::default();
    let mut last_scanned: Option<Cursor> = None;
    let mut more = false;

    while let Some(row) = rows.next()? {
        if page.items.len() == page_size {
            more = true;
            break;
        }
        if page.num_scanned == scan_cap {
            more = true;
            page.reached_cap = true;
            break;
        }

        let listing = ListingRow {
            id: row.get(0)?,
            created_at: row.get(1)?,
            updated_at: row.get(2)?,
            expires_at: row.get(3)?,
            item_count: row.get(4)?,
            status: row.get(5)?,
            cwd: row.get(6)?,
            originator: row.get(7)?,
            preview: row.get(8)?,
            has_user_event: row.get(9)?,
            has_header: row.get(10)?,
        };
        page.num_scanned += 1;
        if let Ok(id) = SessionId::parse(&listing.id) {
            last_scanned = Some(Cursor::new(from_millis(listing.updated_at), id));
        }

        let summary = match into_summary(listing) {
            Ok(Some(summary)) => summary,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping unreadable session row in listing");
                continue;
            }
        };
        page.items.push(summary);
    }

    if more {
        page.next_cursor = page.items.last().map(ConversationSummary::cursor).or(last_scanned);
    }

    if page.reached_cap {
        tracing::warn!(
            scanned = page.num_scanned,
            returned = page.items.len(),
            "Listing scan cap reached"
        );
    }

    Ok(page)
}

/// Decode a row, returning `None` for sessions the listing hides
fn into_summary(row: ListingRow) -> Result<Option<ConversationSummary>> {
    let corrupt = |reason: String| Error::CorruptRecord {
        session_id: row.id.clone(),
        sequence: None,
        reason,
    };

    let id = SessionId::parse(&row.id).map_err(|e| corrupt(e.to_string()))?;
    if !row.has_header || !row.has_user_event {
        return Ok(None);
    }
    let status = row.status.parse::<SessionStatus>().map_err(corrupt)?;

    Ok(Some(ConversationSummary {
        id,
        created: from_millis(row.created_at),
        updated: from_millis(row.updated_at),
        expires_at: row.expires_at.map(from_millis),
        item_count: row.item_count.max(0) as u64,
        status,
        cwd: row.cwd,
        originator: row.originator,
        preview: row.preview,
    }))
}
