//! Type-safe identifier wrappers around `SQLite` row ids.
//!
//! Experiments, variations and traces are rows in a universe file and
//! are addressed by the integer primary key `SQLite` assigns on insert.
//! The lineage graph is an arena of these ids: a variation points at its
//! parent by id, never by reference, so cycles cannot be expressed.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around an `i64` row id with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Return the inner row id.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Row id of an experiment in a universe.
    ExperimentId
}

define_id! {
    /// Row id of a variation (an immutable configuration snapshot).
    VariationId
}

define_id! {
    /// Row id of a trace (the log of one evolution run).
    TraceId
}
