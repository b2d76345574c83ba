//! Persisted records and the JSON payloads attached to them.
//!
//! Every struct here maps to one row (or one JSON column) of a universe
//! file. Field names are the persisted names: analysis tooling reads the
//! same JSON, so renaming a field is a format change.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::ComplexityHint;
use crate::ids::{ExperimentId, TraceId, VariationId};

// ---------------------------------------------------------------------------
// Experiment
// ---------------------------------------------------------------------------

/// The `setup` document of an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentSetup {
    /// Number of genotypes in the population.
    pub population_size: usize,
    /// Registered population kind.
    pub population_name: String,
    /// Complexity hint for the population.
    #[serde(default)]
    pub population_hint: ComplexityHint,
    /// Registered domain kind.
    pub domain_name: String,
    /// Complexity hint for the domain.
    #[serde(default)]
    pub domain_hint: ComplexityHint,
}

/// A row of the `Experiment` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentRecord {
    /// Row id.
    pub id: ExperimentId,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Creation time (Unix seconds).
    pub timestamp: i64,
    /// Unique name, or `None` for an unnamed experiment.
    pub name: Option<String>,
    /// Population/domain setup.
    pub setup: ExperimentSetup,
    /// Tip of this experiment's variation lineage.
    pub last_variation_id: Option<VariationId>,
    /// Last time a variation was recorded for this experiment (Unix seconds).
    pub last_activity_timestamp: i64,
}

// ---------------------------------------------------------------------------
// Variation
// ---------------------------------------------------------------------------

/// A row of the `Variation` table: an immutable configuration snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationRecord {
    /// Row id.
    pub id: VariationId,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Creation time (Unix seconds).
    pub timestamp: i64,
    /// Parent variation, `None` for a lineage root.
    pub previous_id: Option<VariationId>,
    /// Experiment that was active when the snapshot was sealed.
    pub experiment_id: ExperimentId,
    /// Optional label.
    pub name: Option<String>,
    /// The sealed configuration snapshot.
    pub config: serde_json::Value,
}

impl VariationRecord {
    /// Whether this variation starts a lineage.
    pub const fn is_root(&self) -> bool {
        self.previous_id.is_none()
    }
}

// ---------------------------------------------------------------------------
// Trace
// ---------------------------------------------------------------------------

/// A row of the `Trace` table: one evolution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Row id.
    pub id: TraceId,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Creation time (Unix seconds).
    pub timestamp: i64,
    /// The variation this run was started from.
    pub variation_id: VariationId,
    /// Snapshot of the evolution settings used by this run.
    pub evolution_config: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Fitness summary of one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSummary {
    /// Highest fitness in the generation.
    pub best_fitness: f32,
    /// Median of the ranked fitness values.
    pub median_fitness: f32,
    /// Lowest fitness in the generation.
    pub worst_fitness: f32,
    /// Fitness of the genotype selected as champion.
    pub champion_fitness: f32,
}

/// One point of a compressed fitness curve, serialized as `[rank, value]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressedFitnessValue(
    /// Rank (0 = best).
    pub usize,
    /// Fitness at that rank.
    pub f32,
);

impl CompressedFitnessValue {
    /// Rank of this point.
    pub const fn rank(self) -> usize {
        self.0
    }

    /// Fitness value of this point.
    pub const fn value(self) -> f32 {
        self.1
    }
}

/// How a genotype was produced from the previous generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genealogy {
    /// Operator name (e.g. `"primordial"`, `"elite"`, `"mutation"`).
    pub genetic_operator: String,
    /// Indices of the parents in the previous generation.
    pub parents: Vec<usize>,
}

/// The `details` column of a generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationDetails {
    /// Every ranked fitness value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_fitness: Option<Vec<f32>>,
    /// Piecewise-linear approximation of the ranked fitness values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_fitness: Option<Vec<CompressedFitnessValue>>,
    /// Genealogy of every genotype, in ranked order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genealogy: Option<Vec<Genealogy>>,
}

/// Timing of one evolution stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileStage {
    /// Stage name.
    pub name: String,
    /// Wall time in seconds.
    pub elapsed: f64,
    /// Named counters collected during the stage.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, u64>,
}

/// The `profile` column of a generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationProfile {
    /// Total wall time of the generation, in seconds.
    pub elapsed: f64,
    /// Per-stage breakdown, when stage profiling is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<ProfileStage>>,
}

/// The `genotypes` column of a generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationGenotypes {
    /// Self-describing form of the champion genotype.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub champion: Option<serde_json::Value>,
}

/// One entry of a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Zero-based index within the trace.
    pub generation: usize,
    /// Time the generation was recorded (Unix seconds).
    pub timestamp: i64,
    /// Fitness summary.
    pub summary: GenerationSummary,
    /// Full or compressed fitness distribution.
    pub details: GenerationDetails,
    /// Timing information.
    pub profile: GenerationProfile,
    /// Genotypes of interest.
    pub genotypes: GenerationGenotypes,
}
