//! Error types for property sets.

use crate::value::ValueError;

/// Errors that can occur when reading or mutating a property set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// No property with this name is declared.
    #[error("unknown property '{name}'")]
    NotFound {
        /// The requested name.
        name: String,
    },

    /// The raw value was rejected by the property's kind.
    #[error("property '{name}': {source}")]
    InvalidValue {
        /// The property being assigned.
        name: String,
        /// Why the value was rejected.
        source: ValueError,
    },

    /// The set is sealed; mutation is not allowed.
    #[error("property set '{set}' is sealed")]
    Sealed {
        /// Name of the sealed set.
        set: String,
    },

    /// The property exists but has no nested variant set.
    #[error("property '{name}' has no variant")]
    NoVariant {
        /// The requested name.
        name: String,
    },

    /// A snapshot does not match the set's schema.
    #[error("malformed snapshot for '{set}': {reason}")]
    Snapshot {
        /// Name of the target set.
        set: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A schema declaration is inconsistent.
    #[error("invalid schema '{schema}': {reason}")]
    Schema {
        /// Name of the schema.
        schema: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl PropertyError {
    /// Whether this error reports a rejected value or snapshot.
    pub const fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidValue { .. } | Self::Snapshot { .. })
    }
}
