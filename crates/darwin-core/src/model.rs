//! Seams to the evolution algorithms.
//!
//! The framework records what happens during a run but does not own the
//! genetic operators or the fitness evaluation. Those live behind two
//! traits, created per run by the factories registered for each kind:
//!
//! - [`PopulationModel`] -- creates the primordial generation and breeds
//!   the next one from a ranked generation
//! - [`DomainModel`] -- assigns a fitness to every genotype
//!
//! Genotypes carry their own self-describing payload, so the recording
//! side never needs to understand the encoding.

use darwin_props::{PropertyError, PropertySet};
use darwin_types::{ComplexityHint, Genealogy};

/// Errors reported by population or domain models.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model could not read its configuration.
    #[error("invalid model configuration: {0}")]
    Config(#[from] PropertyError),

    /// A genotype payload could not be decoded.
    #[error("malformed genotype: {0}")]
    Genotype(#[from] serde_json::Error),

    /// The model failed for another reason.
    #[error("model error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

/// One member of a population.
#[derive(Debug, Clone, PartialEq)]
pub struct Genotype {
    /// Fitness assigned by the last evaluation (0 before the first).
    pub fitness: f32,
    /// How this genotype was produced.
    pub genealogy: Genealogy,
    /// Self-describing encoding, recorded verbatim for the champion.
    pub payload: serde_json::Value,
}

impl Genotype {
    /// A genotype with no fitness yet.
    pub const fn new(genealogy: Genealogy, payload: serde_json::Value) -> Self {
        Self {
            fitness: 0.0,
            genealogy,
            payload,
        }
    }
}

/// Everything a model factory may read besides its own kind's config.
#[derive(Debug, Clone)]
pub struct ModelContext {
    /// Seed for any randomness in the model.
    pub seed: u64,
    /// Complexity hint recorded for this model's side of the setup.
    pub hint: ComplexityHint,
    /// The experiment's shared network settings.
    pub core: PropertySet,
}

/// Creates and breeds genotypes.
pub trait PopulationModel: Send {
    /// Create the first generation.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the genotypes cannot be created.
    fn primordial(&mut self, size: usize) -> Result<Vec<Genotype>, ModelError>;

    /// Breed the next generation from genotypes ranked best-first.
    ///
    /// The result must have the same length as `ranked`; parent indices in
    /// the genealogy refer to positions in `ranked`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if a genotype cannot be decoded or bred.
    fn next_generation(&mut self, ranked: &[Genotype]) -> Result<Vec<Genotype>, ModelError>;
}

/// Assigns fitness values.
pub trait DomainModel: Send {
    /// Evaluate every genotype in place.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if a genotype cannot be evaluated.
    fn evaluate(&mut self, genotypes: &mut [Genotype]) -> Result<(), ModelError>;
}

/// Constructor of a population model from its kind's config.
pub type PopulationFactory =
    fn(&PropertySet, &ModelContext) -> Result<Box<dyn PopulationModel>, ModelError>;

/// Constructor of a domain model from its kind's config.
pub type DomainFactory = fn(&PropertySet, &ModelContext) -> Result<Box<dyn DomainModel>, ModelError>;
