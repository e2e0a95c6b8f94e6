use std::fmt;

/// Result type for rollout-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the types layer
#[derive(Debug)]
pub enum Error {
    /// Session identifier is not a hyphenated UUID
    InvalidId(String),

    /// Value is not a valid TTL setting (day count or "permanent")
    InvalidTtl(String),

    /// Day count pushes the expiry past the representable date range
    TtlOutOfRange(u32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidId(id) => write!(f, "Invalid session id: {:?}", id),
            Error::InvalidTtl(raw) => write!(
                f,
                "Invalid TTL: {:?} (expected a day count or \"permanent\")",
                raw
            ),
            Error::TtlOutOfRange(days) => {
                write!(f, "TTL of {} days is out of range", days)
            }
        }
    }
}

impl std::error::Error for Error {}
