use rusqlite::Connection;

use crate::Result;

// Schema version (increment when changing table definitions)
pub const SCHEMA_VERSION: i32 = 3;

// NOTE: Database Design Rationale
//
// Why two tables (sessions + items)?
// - sessions is the index: one row per rollout, small, scanned by listing and the reaper
// - items is the log: append-only, keyed by (session_id, seq), never updated
// - A batch commit touches both in one transaction, so item_count never lags the log
//
// Why integer millisecond timestamps?
// - Range scans on (updated_at, id) and expires_at need a total order
// - ISO strings are rendered at the edge (export, CLI)
//
// Why hard delete (not a soft is_valid flag)?
// - TTL reclamation exists to free space; a tombstone would keep the payloads
// - Status is flipped to 'expired' inside the deleting transaction, so no reader
//   can ever observe an expired row
//
// Why drop-and-recreate on version mismatch?
// - Keeps open() working across upgrades without a migration framework
// - The log is the only copy of the data, so bump SCHEMA_VERSION only together
//   with a data-preserving migration

pub fn init_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version != 0 && current_version != SCHEMA_VERSION {
        tracing::warn!(
            found = current_version,
            expected = SCHEMA_VERSION,
            "Schema version mismatch; recreating rollout tables"
        );
        drop_all_tables(conn)?;
    }

    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            expires_at INTEGER,
            originator TEXT NOT NULL,
            cwd TEXT NOT NULL,
            instructions TEXT,
            git_json TEXT,
            item_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            has_user_event INTEGER NOT NULL DEFAULT 0,
            preview TEXT,
            CHECK (updated_at >= created_at),
            CHECK (item_count >= 0)
        );

        CREATE TABLE IF NOT EXISTS items (
            session_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            ts INTEGER NOT NULL,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            PRIMARY KEY (session_id, seq),
            FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
        ) WITHOUT ROWID;

        CREATE INDEX IF NOT EXISTS idx_sessions_updated ON sessions(updated_at DESC, id DESC);
        CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)
            WHERE expires_at IS NOT NULL;
        "#,
    )?;

    conn.execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;

    Ok(())
}

fn drop_all_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DROP TABLE IF EXISTS items;
        DROP TABLE IF EXISTS sessions;
        "#,
    )?;
    Ok(())
}
