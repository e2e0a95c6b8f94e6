use std::fmt;

/// Result type for rollout-index operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the index layer
#[derive(Debug)]
pub enum Error {
    /// Database operation failed
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Payload could not be encoded
    Json(serde_json::Error),

    /// Pagination token could not be decoded
    InvalidCursor(String),

    /// Page size outside 1..=MAX_PAGE_SIZE
    InvalidPageSize(usize),

    /// A stored row could not be decoded
    CorruptRecord {
        session_id: String,
        sequence: Option<u64>,
        reason: String,
    },

    /// Batch did not start at the session's current item count
    SequenceConflict {
        session_id: String,
        expected: u64,
        found: u64,
    },

    /// Session row disappeared (reaped or deleted) before the write committed
    SessionGone(String),

    /// A session with this id is already indexed
    AlreadyExists(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => {
                let msg = err.to_string();
                // Detect schema mismatch errors and provide actionable hint
                if msg.contains("no such column") || msg.contains("no such table") {
                    write!(
                        f,
                        "Database schema mismatch: {}. Please reopen the store to auto-migrate.",
                        msg
                    )
                } else {
                    write!(f, "Database error: {}", err)
                }
            }
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::InvalidCursor(token) => write!(f, "Invalid cursor: {:?}", token),
            Error::InvalidPageSize(size) => write!(
                f,
                "Invalid page size {} (must be between 1 and {})",
                size,
                crate::MAX_PAGE_SIZE
            ),
            Error::CorruptRecord {
                session_id,
                sequence: Some(seq),
                reason,
            } => write!(
                f,
                "Corrupt record {}#{}: {}",
                session_id, seq, reason
            ),
            Error::CorruptRecord {
                session_id,
                sequence: None,
                reason,
            } => write!(f, "Corrupt session record {}: {}", session_id, reason),
            Error::SequenceConflict {
                session_id,
                expected,
                found,
            } => write!(
                f,
                "Sequence conflict on {}: batch starts at {} but session has {} items",
                session_id, expected, found
            ),
            Error::SessionGone(id) => write!(f, "Session {} no longer exists", id),
            Error::AlreadyExists(id) => write!(f, "Session {} already exists", id),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
