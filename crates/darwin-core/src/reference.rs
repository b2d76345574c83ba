//! Reference models.
//!
//! Deterministic stand-ins for the real genetic algorithms and task
//! domains. A genotype is a flat weight vector; the population breeds by
//! elite copies plus seeded perturbation, and the domain scores a genotype
//! by how close its weights are to a target derived from the domain's
//! config. They exist so that a run can be driven end to end and produce
//! realistic traces.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use darwin_props::PropertySet;
use darwin_types::{ComplexityHint, Genealogy};

use crate::model::{DomainModel, Genotype, ModelContext, ModelError, PopulationModel};

/// Payload of a reference genotype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceGenome {
    /// Connection weights.
    pub weights: Vec<f32>,
}

impl ReferenceGenome {
    /// Decode a genotype payload.
    pub fn from_genotype(genotype: &Genotype) -> Result<Self, ModelError> {
        Ok(Self::deserialize(&genotype.payload)?)
    }

    fn into_genotype(self, operator: &str, parents: Vec<usize>) -> Result<Genotype, ModelError> {
        Ok(Genotype::new(
            Genealogy {
                genetic_operator: operator.to_owned(),
                parents,
            },
            serde_json::to_value(self)?,
        ))
    }
}

/// Number of weights for a complexity hint.
const fn genome_len(hint: ComplexityHint) -> usize {
    match hint {
        ComplexityHint::Minimal => 4,
        ComplexityHint::Balanced => 8,
        ComplexityHint::Extra => 16,
    }
}

// ---------------------------------------------------------------------------
// Mutation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Mutation {
    normal: bool,
    std_dev: f32,
    chance: f64,
    range: f32,
}

impl Mutation {
    fn from_core(core: &PropertySet, chance: f64) -> Result<Self, ModelError> {
        Ok(Self {
            normal: core.get_as("mutation_normal_distribution")?,
            std_dev: narrow(core.get_as("mutation_std_dev")?),
            chance: chance.clamp(0.0, 1.0),
            range: narrow(core.get_as::<f64>("connection_range")?).abs(),
        })
    }

    fn apply(&self, weights: &mut [f32], rng: &mut StdRng) {
        for weight in weights {
            if rng.random_bool(self.chance) {
                let noise = if self.normal {
                    gaussian(rng)
                } else {
                    rng.random_range(-1.0..=1.0)
                };
                *weight = noise.mul_add(self.std_dev, *weight).clamp(-self.range, self.range);
            }
        }
    }
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut StdRng) -> f32 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random();
    narrow((-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos())
}

#[allow(clippy::cast_possible_truncation)]
const fn narrow(value: f64) -> f32 {
    value as f32
}

/// `ceil(n * fraction)`, at least one when `n > 0`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn elite_count(n: usize, fraction: f64) -> usize {
    let raw = (n as f64 * fraction.clamp(0.0, 1.0)).ceil() as usize;
    raw.clamp(1, n.max(1))
}

// ---------------------------------------------------------------------------
// Population
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Strategy {
    /// Elite copies plus mutated offspring of the elite.
    Evolve { elite_fraction: f64 },
    /// Fresh random weights every generation.
    Random { range: f32 },
    /// The same constant weights every generation.
    Constant { value: f32 },
}

/// Weight-vector population with elitist breeding.
#[derive(Debug)]
pub struct ReferencePopulation {
    rng: StdRng,
    genome_len: usize,
    mutation: Mutation,
    strategy: Strategy,
}

impl ReferencePopulation {
    fn weights(&mut self) -> Vec<f32> {
        let len = self.genome_len;
        match self.strategy {
            Strategy::Constant { value } => vec![value; len],
            Strategy::Random { range } => (0..len)
                .map(|_| self.rng.random_range(-range..=range))
                .collect(),
            Strategy::Evolve { .. } => (0..len)
                .map(|_| self.rng.random_range(-1.0..=1.0))
                .collect(),
        }
    }

    fn fresh(&mut self, size: usize, operator: &str) -> Result<Vec<Genotype>, ModelError> {
        (0..size)
            .map(|_| {
                ReferenceGenome {
                    weights: self.weights(),
                }
                .into_genotype(operator, Vec::new())
            })
            .collect()
    }
}

impl PopulationModel for ReferencePopulation {
    fn primordial(&mut self, size: usize) -> Result<Vec<Genotype>, ModelError> {
        self.fresh(size, "primordial")
    }

    fn next_generation(&mut self, ranked: &[Genotype]) -> Result<Vec<Genotype>, ModelError> {
        let elite_fraction = match self.strategy {
            Strategy::Evolve { elite_fraction } => elite_fraction,
            Strategy::Random { .. } => return self.fresh(ranked.len(), "random"),
            Strategy::Constant { .. } => return self.fresh(ranked.len(), "constant"),
        };

        let genomes = ranked
            .iter()
            .map(ReferenceGenome::from_genotype)
            .collect::<Result<Vec<_>, _>>()?;
        let elite = elite_count(genomes.len(), elite_fraction);

        let mut next = Vec::with_capacity(genomes.len());
        for (index, genome) in genomes.iter().take(elite).enumerate() {
            next.push(genome.clone().into_genotype("elite", vec![index])?);
        }
        while next.len() < genomes.len() {
            let parent = self.rng.random_range(0..elite);
            let Some(source) = genomes.get(parent) else {
                break;
            };
            let mut weights = source.weights.clone();
            self.mutation.apply(&mut weights, &mut self.rng);
            next.push(ReferenceGenome { weights }.into_genotype("mutation", vec![parent])?);
        }
        Ok(next)
    }
}

/// Factory for the `dummy` population.
pub fn dummy_population(
    config: &PropertySet,
    context: &ModelContext,
) -> Result<Box<dyn PopulationModel>, ModelError> {
    let strategy = if config.get_as("random_outputs")? {
        Strategy::Random {
            range: narrow(config.get_as::<f64>("output_range")?).abs(),
        }
    } else {
        Strategy::Constant {
            value: narrow(config.get_as("const_output")?),
        }
    };
    Ok(Box::new(ReferencePopulation {
        rng: StdRng::seed_from_u64(context.seed),
        genome_len: genome_len(context.hint),
        mutation: Mutation::from_core(&context.core, 0.0)?,
        strategy,
    }))
}

/// Factory for the `neat` population.
pub fn neat_population(
    config: &PropertySet,
    context: &ModelContext,
) -> Result<Box<dyn PopulationModel>, ModelError> {
    Ok(Box::new(ReferencePopulation {
        rng: StdRng::seed_from_u64(context.seed),
        genome_len: genome_len(context.hint),
        mutation: Mutation::from_core(&context.core, config.get_as("weight_mutation_chance")?)?,
        strategy: Strategy::Evolve {
            elite_fraction: config.get_as("elite_percentage")?,
        },
    }))
}

/// Factory for the `cne.lstm` population.
pub fn cne_lstm_population(
    config: &PropertySet,
    context: &ModelContext,
) -> Result<Box<dyn PopulationModel>, ModelError> {
    let hidden_layers: Vec<i64> = config.get_as("hidden_layers")?;
    Ok(Box::new(ReferencePopulation {
        rng: StdRng::seed_from_u64(context.seed),
        genome_len: genome_len(context.hint).saturating_add(hidden_layers.len()),
        mutation: Mutation::from_core(&context.core, config.get_as("mutation_chance")?)?,
        strategy: Strategy::Evolve {
            elite_fraction: config.get_as("elite_percentage")?,
        },
    }))
}

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// Scores a genotype by the distance of its weights to a target value.
///
/// `fitness = scale / (1 + mean squared error)`, so a perfect genotype
/// scores `scale` and fitness is always positive.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDomain {
    target: f32,
    scale: f32,
}

impl ReferenceDomain {
    /// Score one weight vector.
    pub fn score(&self, weights: &[f32]) -> f32 {
        if weights.is_empty() {
            return self.scale;
        }
        let (sum, count) = weights.iter().fold((0.0_f32, 0.0_f32), |(sum, count), w| {
            (sum + (w - self.target).powi(2), count + 1.0)
        });
        self.scale / (1.0 + sum / count)
    }
}

impl DomainModel for ReferenceDomain {
    fn evaluate(&mut self, genotypes: &mut [Genotype]) -> Result<(), ModelError> {
        for genotype in genotypes {
            let genome = ReferenceGenome::from_genotype(genotype)?;
            genotype.fitness = self.score(&genome.weights);
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn steps_scale(config: &PropertySet, name: &str) -> Result<f32, ModelError> {
    let steps: i64 = config.get_as(name)?;
    Ok(steps.max(1) as f32)
}

/// Factory for the `unicycle` domain.
pub fn unicycle_domain(
    config: &PropertySet,
    _context: &ModelContext,
) -> Result<Box<dyn DomainModel>, ModelError> {
    let pole_length: f64 = config.get_as("pole_length")?;
    let max_distance: f64 = config.get_as("max_distance")?;
    let target = if max_distance.abs() > f64::EPSILON {
        pole_length / max_distance
    } else {
        0.0
    };
    Ok(Box::new(ReferenceDomain {
        target: narrow(target),
        scale: steps_scale(config, "max_steps")?,
    }))
}

/// Factory for the `conquest` domain.
pub fn conquest_domain(
    config: &PropertySet,
    _context: &ModelContext,
) -> Result<Box<dyn DomainModel>, ModelError> {
    Ok(Box::new(ReferenceDomain {
        target: narrow(config.get_as("points_draw")?),
        scale: steps_scale(config, "max_steps")?,
    }))
}

/// Factory for the `tic_tac_toe` domain.
pub fn tic_tac_toe_domain(
    config: &PropertySet,
    _context: &ModelContext,
) -> Result<Box<dyn DomainModel>, ModelError> {
    let target = if config.get("ann_type")?.format() == "policy" {
        -0.5
    } else {
        0.5
    };
    Ok(Box::new(ReferenceDomain {
        target,
        scale: steps_scale(config, "calibration_matches")?,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schemas;

    fn context() -> ModelContext {
        ModelContext {
            seed: 7,
            hint: ComplexityHint::Minimal,
            core: PropertySet::new(Arc::new(schemas::core().unwrap())),
        }
    }

    fn neat() -> Box<dyn PopulationModel> {
        let config = PropertySet::new(Arc::new(schemas::neat_population().unwrap()));
        config.set("weight_mutation_chance", "1").unwrap();
        config.set("elite_percentage", "0.2").unwrap();
        neat_population(&config, &context()).unwrap()
    }

    #[test]
    fn elite_count_rounds_up_and_keeps_one() {
        assert_eq!(elite_count(10, 0.1), 1);
        assert_eq!(elite_count(10, 0.25), 3);
        assert_eq!(elite_count(10, 0.0), 1);
        assert_eq!(elite_count(10, 2.0), 10);
        assert_eq!(elite_count(0, 0.5), 1);
    }

    #[test]
    fn primordial_genotypes_have_hinted_length() {
        let members = neat().primordial(5).unwrap();
        assert_eq!(members.len(), 5);
        for genotype in &members {
            assert_eq!(genotype.genealogy.genetic_operator, "primordial");
            let genome = ReferenceGenome::from_genotype(genotype).unwrap();
            assert_eq!(genome.weights.len(), 4);
        }
    }

    #[test]
    fn same_seed_same_population() {
        assert_eq!(neat().primordial(3).unwrap(), neat().primordial(3).unwrap());
    }

    #[test]
    fn next_generation_keeps_elite_and_records_parents() {
        let mut model = neat();
        let mut members = model.primordial(10).unwrap();
        let mut domain = ReferenceDomain {
            target: 0.5,
            scale: 100.0,
        };
        domain.evaluate(&mut members).unwrap();
        members.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        let next = model.next_generation(&members).unwrap();
        assert_eq!(next.len(), 10);
        assert_eq!(next[0].genealogy.genetic_operator, "elite");
        assert_eq!(next[0].payload, members[0].payload);
        assert_eq!(next[1].genealogy.genetic_operator, "elite");
        for genotype in &next[2..] {
            assert_eq!(genotype.genealogy.genetic_operator, "mutation");
            assert!(genotype.genealogy.parents.iter().all(|&p| p < 2));
        }
    }

    #[test]
    fn constant_dummy_population_repeats_itself() {
        let config = PropertySet::new(Arc::new(schemas::dummy_population().unwrap()));
        config.set("random_outputs", "false").unwrap();
        config.set("const_output", "0.5").unwrap();
        let mut model = dummy_population(&config, &context()).unwrap();

        let members = model.primordial(2).unwrap();
        let genome = ReferenceGenome::from_genotype(&members[0]).unwrap();
        assert_eq!(genome.weights, vec![0.5; 4]);

        let next = model.next_generation(&members).unwrap();
        assert_eq!(next[1].genealogy.genetic_operator, "constant");
        assert_eq!(next[1].payload, members[1].payload);
    }

    #[test]
    fn domain_score_peaks_at_target() {
        let domain = ReferenceDomain {
            target: 0.5,
            scale: 1000.0,
        };
        assert_eq!(domain.score(&[0.5, 0.5]), 1000.0);
        assert!(domain.score(&[0.0, 1.0]) < 1000.0);
        assert_eq!(domain.score(&[]), 1000.0);
    }

    #[test]
    fn unicycle_target_follows_config() {
        let config = PropertySet::new(Arc::new(schemas::unicycle_domain().unwrap()));
        config.set("max_steps", "10").unwrap();
        let mut domain = unicycle_domain(&config, &context()).unwrap();
        let mut members = vec![
            ReferenceGenome {
                weights: vec![0.5; 4],
            }
            .into_genotype("primordial", Vec::new())
            .unwrap(),
        ];
        domain.evaluate(&mut members).unwrap();
        assert_eq!(members[0].fitness, 10.0);
    }
}
