//! Error types for state synchronization.

use thiserror::Error;

/// Main error type for registry and mutation operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Store not registered: {0}")]
    StoreNotRegistered(String),

    #[error("Store already exists: {0}")]
    StoreExists(String),

    #[error("Shape mismatch at '{path}': expected {expected}, found {found}")]
    ShapeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Stale version for store {key}: received {received}, last accepted {last}")]
    StaleVersion { key: String, received: u64, last: u64 },

    #[error("Malformed sync message: {0}")]
    MalformedMessage(String),

    #[error("Sync message too large: {size} bytes (limit {limit})")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub(crate) fn shape(path: &str, expected: &'static str, found: &'static str) -> Self {
        SyncError::ShapeMismatch {
            path: path.to_string(),
            expected,
            found,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            SyncError::Deserialization(e.to_string())
        } else {
            SyncError::Serialization(e.to_string())
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
