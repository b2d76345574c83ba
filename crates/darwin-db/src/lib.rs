//! Persistence layer for Darwin universes (`SQLite`).
//!
//! A universe is one `SQLite` file holding every experiment, every
//! configuration variation and every evolution trace recorded in it.
//! This crate owns the file format and the exclusive connection; the
//! stores are thin, synchronous views over that connection.
//!
//! # Architecture
//!
//! ```text
//! UniverseDb (exclusive connection, Arc-shared)
//!     |
//!     +-- ExperimentStore  (mutable: name, setup, lineage tip)
//!     +-- VariationStore   (append-only configuration snapshots)
//!     +-- TraceStore       (append-only traces and generations)
//!             ^
//!             +-- GenerationSink impl used by open traces
//! ```
//!
//! # Modules
//!
//! - [`universe`] -- File creation, exclusive opening, connection handle
//! - [`schema`] -- Header pragmas, tables and append-only triggers
//! - [`experiment_store`] -- Experiment rows, forks and renames
//! - [`variation_store`] -- Variation rows and lineage queries
//! - [`trace_store`] -- Trace and generation rows
//! - [`error`] -- Shared error types

pub mod error;
pub mod experiment_store;
pub mod schema;
pub mod trace_store;
pub mod universe;
pub mod variation_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use experiment_store::ExperimentStore;
pub use schema::{APPLICATION_ID, FORMAT_VERSION};
pub use trace_store::TraceStore;
pub use universe::{UniverseConfig, UniverseDb};
pub use variation_store::VariationStore;
