use std::fmt;

/// Result type for rollout-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by the recorder and its static operations.
///
/// Every variant is a distinct kind so callers can branch on it instead of
/// matching message text.
#[derive(Debug)]
pub enum Error {
    /// Session identifier is not a hyphenated UUID
    InvalidId(String),

    /// Resume or delete of a session that does not exist
    NotFound(String),

    /// Create with an id that is already stored
    AlreadyExists(String),

    /// Operation on a recorder that has been shut down
    NotInitialized(String),

    /// A batch transaction aborted; nothing from it was committed.
    /// Re-issuing the same items is safe.
    WriteFailed { session_id: String, reason: String },

    /// Listing page size outside 1..=100
    InvalidPageSize(usize),

    /// Listing cursor token could not be decoded
    InvalidCursor(String),

    /// A stored or imported record could not be decoded
    CorruptRecord {
        session_id: String,
        sequence: Option<u64>,
        reason: String,
    },

    /// Another recorder in this process already owns the session
    SessionBusy(String),

    /// Database/index layer error
    Index(rollout_index::Error),

    /// JSON encoding failed
    Json(serde_json::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Configuration error
    Config(String),
}

impl Error {
    /// Whether re-issuing the failed call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::WriteFailed { .. })
    }

    pub(crate) fn write_failed(session_id: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Error::WriteFailed {
            session_id: session_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidId(id) => write!(f, "Invalid session id: {:?}", id),
            Error::NotFound(id) => write!(f, "Session not found: {}", id),
            Error::AlreadyExists(id) => write!(f, "Session already exists: {}", id),
            Error::NotInitialized(id) => write!(f, "Recorder for {} is shut down", id),
            Error::WriteFailed { session_id, reason } => {
                write!(f, "Write failed for session {}: {}", session_id, reason)
            }
            Error::InvalidPageSize(size) => write!(
                f,
                "Invalid page size {} (must be between 1 and {})",
                size,
                rollout_index::MAX_PAGE_SIZE
            ),
            Error::InvalidCursor(token) => write!(f, "Invalid cursor: {:?}", token),
            Error::CorruptRecord {
                session_id,
                sequence: Some(seq),
                reason,
            } => write!(f, "Corrupt record {}#{}: {}", session_id, seq, reason),
            Error::CorruptRecord {
                session_id,
                sequence: None,
                reason,
            } => write!(f, "Corrupt session {}: {}", session_id, reason),
            Error::SessionBusy(id) => write!(f, "Session {} is open in another recorder", id),
            Error::Index(err) => write!(f, "Index error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Index(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rollout_index::Error> for Error {
    fn from(err: rollout_index::Error) -> Self {
        match err {
            rollout_index::Error::InvalidCursor(token) => Error::InvalidCursor(token),
            rollout_index::Error::InvalidPageSize(size) => Error::InvalidPageSize(size),
            rollout_index::Error::AlreadyExists(id) => Error::AlreadyExists(id),
            rollout_index::Error::CorruptRecord {
                session_id,
                sequence,
                reason,
            } => Error::CorruptRecord {
                session_id,
                sequence,
                reason,
            },
            other => Error::Index(other),
        }
    }
}

impl From<rollout_types::Error> for Error {
    fn from(err: rollout_types::Error) -> Self {
        match err {
            rollout_types::Error::InvalidId(id) => Error::InvalidId(id),
            rollout_types::Error::InvalidTtl(raw) => {
                Error::Config(format!("invalid ttl {:?}", raw))
            }
            rollout_types::Error::TtlOutOfRange(days) => {
                Error::Config(format!("ttl of {} days is out of range", days))
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
