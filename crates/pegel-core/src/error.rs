//! Error types for pegel-core

use thiserror::Error;

use crate::item::ItemId;
use crate::persistence::schema::SchemaVersion;

/// Result type alias for data-layer operations
pub type Result<T> = std::result::Result<T, DataError>;

/// Caller-facing error type for the data layer.
///
/// `ItemNotFound` is a recoverable, logical condition; everything wrapped in
/// `Persistence` means the store itself could not read or commit.
#[derive(Error, Debug)]
pub enum DataError {
    /// The targeted item does not exist (or was already deleted)
    #[error("item not found (id: {0})")]
    ItemNotFound(ItemId),

    /// The backing store failed
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Store-level failures, carrying the underlying cause
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A store-enforced constraint was violated
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The store was written by a newer schema than this build targets
    #[error("schema version mismatch: store has {found}, current is {current}")]
    SchemaVersionMismatch {
        found: SchemaVersion,
        current: SchemaVersion,
    },
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for DataError {
    fn from(err: rusqlite::Error) -> Self {
        DataError::Persistence(PersistenceError::from(err))
    }
}
