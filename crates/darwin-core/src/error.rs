//! Error types for experiments, owners and the universe handle.
//!
//! Lower-level errors are wrapped, except for the conditions callers
//! are expected to match on directly (`Closed`, `DuplicateName`,
//! `Sealed`, `IndexOutOfRange`), which are lifted into first-class
//! variants.

use darwin_db::DbError;
use darwin_props::PropertyError;
use darwin_trace::TraceError;

use crate::model::ModelError;

/// Errors that can occur in the core layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The universe handle has been closed.
    #[error("universe is closed")]
    Closed,

    /// A configuration set is sealed by an initialized experiment.
    #[error("'{set}' is sealed")]
    Sealed {
        /// Name of the sealed set.
        set: String,
    },

    /// A population or domain is already attached to a live experiment.
    #[error("{role} '{kind}' is already bound to an experiment")]
    AlreadyBound {
        /// `"population"` or `"domain"`.
        role: &'static str,
        /// Registered kind of the instance.
        kind: String,
    },

    /// An experiment name is empty or only whitespace.
    #[error("experiment name must not be empty")]
    EmptyName,

    /// Another experiment in the universe already uses this name.
    #[error("an experiment named '{0}' already exists")]
    DuplicateName(String),

    /// Population size must be at least one.
    #[error("invalid population size {size}")]
    InvalidSize {
        /// The rejected size.
        size: usize,
    },

    /// No kind with this name is registered.
    #[error("unknown {role} kind '{kind}'")]
    UnknownKind {
        /// `"population"` or `"domain"`.
        role: &'static str,
        /// The requested kind.
        kind: String,
    },

    /// The population has no members (not initialized, or reset).
    #[error("population is not initialized")]
    NotInitialized,

    /// A signed index fell outside `[-len, len)`.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: i64,
        /// Length of the indexed sequence.
        len: usize,
    },

    /// A property operation failed.
    #[error(transparent)]
    Property(PropertyError),

    /// A trace operation failed.
    #[error(transparent)]
    Trace(TraceError),

    /// A persistence operation failed.
    #[error(transparent)]
    Db(DbError),

    /// A population or domain model failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl From<PropertyError> for CoreError {
    fn from(err: PropertyError) -> Self {
        match err {
            PropertyError::Sealed { set } => Self::Sealed { set },
            other => Self::Property(other),
        }
    }
}

impl From<TraceError> for CoreError {
    fn from(err: TraceError) -> Self {
        match err {
            TraceError::IndexOutOfRange { index, len } => Self::IndexOutOfRange { index, len },
            other => Self::Trace(other),
        }
    }
}

impl From<DbError> for CoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Closed => Self::Closed,
            DbError::DuplicateName(name) => Self::DuplicateName(name),
            other => Self::Db(other),
        }
    }
}
