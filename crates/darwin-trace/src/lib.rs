//! The append-only generation log of an evolution run.
//!
//! A [`Trace`] is created each time an experiment is initialized and
//! receives one [`GenerationRecord`](darwin_types::GenerationRecord) per
//! evolution step. It is never rewritten: records are immutable once
//! appended, indices are contiguous from zero, and once the run ends the
//! trace is sealed and only readable.
//!
//! # Architecture
//!
//! - [`trace`] -- The [`Trace`] log and the [`GenerationSink`] persistence seam
//! - [`builder`] -- [`GenerationBuilder`]: ranked fitness to a generation record
//! - [`compression`] -- Piecewise-linear fitness compression and interpolation
//!
//! # Indexing
//!
//! [`Trace::get`] takes a signed index: `0` is the first generation, `-1`
//! the last. Anything outside `[-len, len)` is
//! [`TraceError::IndexOutOfRange`]; indices never wrap or clamp.

pub mod builder;
pub mod compression;
pub mod trace;

pub use builder::{GenerationBuilder, summarize};
pub use compression::{MAX_FITNESS_DEVIATION, compress_fitness, compress_fitness_with, interpolate_fitness};
pub use trace::{GenerationSink, SinkError, Trace, signed_index};

use darwin_types::TraceId;

/// Errors that can occur when reading or appending to a trace.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    /// The trace no longer accepts appends.
    #[error("trace {trace} is sealed")]
    Sealed {
        /// The sealed trace.
        trace: TraceId,
    },

    /// A signed index fell outside `[-len, len)`.
    #[error("generation index {index} out of range for trace of length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: i64,
        /// Length of the trace.
        len: usize,
    },

    /// An appended record does not carry the next generation index.
    #[error("expected generation {expected}, got {actual}")]
    NonContiguous {
        /// The next free index.
        expected: usize,
        /// The index carried by the record.
        actual: usize,
    },

    /// A generation cannot be built from an empty population.
    #[error("cannot record a generation with no fitness values")]
    EmptyGeneration,

    /// The persistence sink rejected the record.
    #[error("failed to persist generation {generation} of trace {trace}: {source}")]
    Sink {
        /// The target trace.
        trace: TraceId,
        /// The rejected generation.
        generation: usize,
        /// The sink's error.
        source: SinkError,
    },
}
