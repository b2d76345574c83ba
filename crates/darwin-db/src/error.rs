//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`rusqlite`] and [`serde_json`] errors and adds the universe-level
//! conditions (closed handle, lock contention, foreign files).

use std::path::PathBuf;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A JSON column could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The universe handle has been closed.
    #[error("universe is closed")]
    Closed,

    /// Another handle holds the universe's exclusive lock.
    #[error("universe {} is locked by another writer", path.display())]
    Locked {
        /// Universe file.
        path: PathBuf,
    },

    /// `create` was called on an existing file.
    #[error("universe {} already exists", path.display())]
    AlreadyExists {
        /// Universe file.
        path: PathBuf,
    },

    /// `open` was called on a missing file.
    #[error("universe {} does not exist", path.display())]
    Missing {
        /// Universe file.
        path: PathBuf,
    },

    /// The file is not a universe, or not one this version can read.
    #[error("{} is not a valid universe: {reason}", path.display())]
    InvalidUniverse {
        /// Universe file.
        path: PathBuf,
        /// What failed to validate.
        reason: String,
    },

    /// A row referenced by id does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Table name.
        entity: &'static str,
        /// Requested row id.
        id: i64,
    },

    /// Another experiment already uses this name.
    #[error("an experiment named '{0}' already exists")]
    DuplicateName(String),

    /// A stored integer does not fit the in-memory type.
    #[error("value out of range: {0}")]
    OutOfRange(String),
}
