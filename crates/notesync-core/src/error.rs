//! Error types for notesync-core

use thiserror::Error;

/// Result type alias using notesync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur inside the store, codec, and sync layers.
///
/// These never cross the trust boundary; the coordinator logs them and
/// reports [`SyncError::Internal`] instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be turned back into a note
    #[error("Corrupt stored record: {0}")]
    CorruptRecord(String),

    /// Note content could not be encoded or decoded
    #[error("Content codec error: {0}")]
    Codec(String),
}

/// Failure kinds reported to the caller of a sync round.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No caller identity was supplied
    #[error("Caller is not authenticated")]
    Unauthenticated,

    /// The request payload failed to decode or validate
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Store, codec, or encoding failure on the server side
    #[error("Internal error")]
    Internal,
}

impl SyncError {
    /// Stable error code for transports that map errors to status codes.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidArgument(_) => "invalid-argument",
            Self::Internal => "internal",
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_display_has_no_detail() {
        assert_eq!(SyncError::Internal.to_string(), "Internal error");
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(SyncError::Unauthenticated.code(), "unauthenticated");
        assert_eq!(
            SyncError::invalid_argument("missing field").code(),
            "invalid-argument"
        );
        assert_eq!(SyncError::Internal.code(), "internal");
    }
}
