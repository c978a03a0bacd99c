use std::fmt;

/// Failures surfaced by a [`crate::DocumentStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No document under the given key.
    NotFound { collection: &'static str, key: String },
    /// Compare-and-set lost: the document moved on since it was observed.
    VersionConflict { expected: i64, actual: i64 },
    /// Insert of a key that is already present.
    AlreadyExists { collection: &'static str, key: String },
    /// Transport / database failure.
    Backend(String),
    /// A stored document could not be decoded or encoded.
    Decode(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { collection, key } => {
                write!(f, "{collection}/{key} not found")
            }
            StoreError::VersionConflict { expected, actual } => write!(
                f,
                "version conflict: expected {expected}, document is at {actual}"
            ),
            StoreError::AlreadyExists { collection, key } => {
                write!(f, "{collection}/{key} already exists")
            }
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
            StoreError::Decode(msg) => write!(f, "document decode error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}
