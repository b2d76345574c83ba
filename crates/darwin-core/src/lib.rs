//! Experiments, populations, domains and the universe handle.
//!
//! This crate ties the property sets, the trace log and the persistence
//! layer into the objects an evolution driver works with:
//!
//! ```text
//! Universe ──new_experiment──> Experiment ──binds──> Domain, Population
//!    │                             │
//!    │                  initialize_population: seal + Variation + Trace
//!    │                  evaluate_population / create_next_generation
//!    │                  reset: unseal + detach Trace
//!    │
//!    └── read API: experiments, variation lineage, traces
//! ```
//!
//! # Modules
//!
//! - [`universe`] -- [`Universe`]: open/create/close, experiment creation, read API
//! - [`experiment`] -- [`Experiment`]: binding, sealing, the generation loop
//! - [`population`] / [`domain`] -- Config owners created from a registered kind
//! - [`registry`] -- [`Registry`] of kinds (schema + model factory)
//! - [`schemas`] -- Builtin property schemas
//! - [`model`] -- [`PopulationModel`] / [`DomainModel`] seams
//! - [`reference`] -- Deterministic reference models
//! - [`settings`] -- [`FrameworkSettings`] loaded from YAML
//! - [`error`] -- [`CoreError`]
//!
//! [`PopulationModel`]: model::PopulationModel
//! [`DomainModel`]: model::DomainModel

mod binding;
pub mod domain;
pub mod error;
pub mod experiment;
pub mod model;
pub mod population;
pub mod reference;
pub mod registry;
pub mod schemas;
pub mod settings;
pub mod universe;

pub use domain::Domain;
pub use error::CoreError;
pub use experiment::Experiment;
pub use model::{DomainModel, Genotype, ModelContext, ModelError, PopulationModel};
pub use population::Population;
pub use registry::Registry;
pub use settings::{FrameworkSettings, SettingsError};
pub use universe::Universe;
