//! Shared type definitions for the Darwin universe.
//!
//! This crate is the single source of truth for the records that cross
//! crate boundaries: the rows persisted in a universe file and the JSON
//! payloads attached to each generation. The configuration engine, the
//! trace log, the storage layer and the orchestration crate all speak in
//! terms of these types.
//!
//! # Modules
//!
//! - [`ids`] -- Row-id newtypes for experiments, variations and traces
//! - [`enums`] -- Closed tag sets shared by configuration and records
//! - [`records`] -- Persisted records and generation payloads

pub mod enums;
pub mod ids;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use enums::{ComplexityHint, FitnessInfoKind, ProfileInfoKind, UnknownTagError};
pub use ids::{ExperimentId, TraceId, VariationId};
pub use records::{
    CompressedFitnessValue, ExperimentRecord, ExperimentSetup, Genealogy, GenerationDetails,
    GenerationGenotypes, GenerationProfile, GenerationRecord, GenerationSummary, ProfileStage,
    TraceRecord, VariationRecord,
};
