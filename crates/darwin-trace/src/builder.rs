//! Turning a ranked population into a generation record.
//!
//! The evolution driver hands over the fitness values in rank order
//! (best first) together with whatever optional payloads the experiment's
//! settings ask for. How much of the distribution is kept depends on the
//! [`FitnessInfoKind`]:
//!
//! | kind              | `details` payload          |
//! |-------------------|----------------------------|
//! | `samples_only`    | none                       |
//! | `full_compressed` | `compressed_fitness` pairs |
//! | `full_raw`        | `full_fitness` values      |

use darwin_types::{
    FitnessInfoKind, Genealogy, GenerationDetails, GenerationGenotypes, GenerationProfile,
    GenerationRecord, GenerationSummary,
};

use crate::TraceError;
use crate::compression::{MAX_FITNESS_DEVIATION, compress_fitness_with};

/// Summarize fitness values sorted best-first.
///
/// The median is the value at `len / 2`; the champion is the best.
pub fn summarize(ranked: &[f32]) -> Option<GenerationSummary> {
    let best = *ranked.first()?;
    let worst = *ranked.last()?;
    let median = *ranked.get(ranked.len() / 2)?;
    Some(GenerationSummary {
        best_fitness: best,
        median_fitness: median,
        worst_fitness: worst,
        champion_fitness: best,
    })
}

/// Builder for a [`GenerationRecord`].
#[derive(Debug, Clone)]
pub struct GenerationBuilder {
    generation: usize,
    ranked_fitness: Vec<f32>,
    fitness_information: FitnessInfoKind,
    max_deviation: f32,
    genealogy: Option<Vec<Genealogy>>,
    champion: Option<serde_json::Value>,
    profile: GenerationProfile,
}

impl GenerationBuilder {
    /// Start a record for `generation` from best-first fitness values.
    pub fn new(generation: usize, ranked_fitness: Vec<f32>) -> Self {
        Self {
            generation,
            ranked_fitness,
            fitness_information: FitnessInfoKind::default(),
            max_deviation: MAX_FITNESS_DEVIATION,
            genealogy: None,
            champion: None,
            profile: GenerationProfile::default(),
        }
    }

    /// Choose how much of the distribution to keep.
    #[must_use]
    pub const fn fitness_information(mut self, kind: FitnessInfoKind) -> Self {
        self.fitness_information = kind;
        self
    }

    /// Override the compression deviation.
    #[must_use]
    pub const fn max_deviation(mut self, max_deviation: f32) -> Self {
        self.max_deviation = max_deviation;
        self
    }

    /// Attach the genealogy of every genotype, in rank order.
    #[must_use]
    pub fn genealogy(mut self, genealogy: Vec<Genealogy>) -> Self {
        self.genealogy = Some(genealogy);
        self
    }

    /// Attach the champion genotype.
    #[must_use]
    pub fn champion(mut self, champion: serde_json::Value) -> Self {
        self.champion = Some(champion);
        self
    }

    /// Attach timing information.
    #[must_use]
    pub fn profile(mut self, profile: GenerationProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Build the record, stamped with the current time.
    pub fn build(self) -> Result<GenerationRecord, TraceError> {
        let summary = summarize(&self.ranked_fitness).ok_or(TraceError::EmptyGeneration)?;

        let mut details = GenerationDetails {
            genealogy: self.genealogy,
            ..GenerationDetails::default()
        };
        match self.fitness_information {
            FitnessInfoKind::SamplesOnly => {}
            FitnessInfoKind::FullCompressed => {
                details.compressed_fitness =
                    Some(compress_fitness_with(&self.ranked_fitness, self.max_deviation));
            }
            FitnessInfoKind::FullRaw => details.full_fitness = Some(self.ranked_fitness),
        }

        Ok(GenerationRecord {
            generation: self.generation,
            timestamp: chrono::Utc::now().timestamp(),
            summary,
            details,
            profile: self.profile,
            genotypes: GenerationGenotypes {
                champion: self.champion,
            },
        })
    }
}
