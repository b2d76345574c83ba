//! Experiments: binding, sealing and the generation loop.
//!
//! An experiment binds one [`Domain`] and one [`Population`] and owns two
//! config sets of its own (`evolution` and `core`). It drives the
//! lifecycle of a run:
//!
//! ```text
//! configure --initialize_population--> sealed, trace open
//!     ^                                     |
//!     |                     evaluate_population / create_next_generation
//!     |                                     |
//!     +---------------reset-----------------+
//! ```
//!
//! `initialize_population` seals all four config sets, records the sealed
//! configuration as a variation (reusing the last one when nothing
//! changed) and opens a new trace. `reset` unseals everything, seals the
//! trace for appends and discards the population's members.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use darwin_db::{ExperimentStore, TraceStore, UniverseDb, VariationStore};
use darwin_props::{PropertyError, PropertySet, ValueError};
use darwin_trace::{GenerationBuilder, GenerationSink, Trace};
use darwin_types::{
    ExperimentId, ExperimentRecord, ExperimentSetup, FitnessInfoKind, GenerationProfile,
    GenerationRecord, ProfileInfoKind, ProfileStage, VariationId,
};

use crate::binding::next_owner;
use crate::domain::Domain;
use crate::error::CoreError;
use crate::model::{DomainModel, Genotype, ModelContext, PopulationModel};
use crate::population::Population;
use crate::registry::Registry;
use crate::schemas;
use crate::settings::FrameworkSettings;

/// Name of the experiment-level sets in sealed error messages.
const EXPERIMENT_SET: &str = "experiment";

/// A live experiment.
///
/// Dropping the experiment (or calling [`Experiment::dispose`]) ends any
/// running trace and releases the domain and population for reuse.
pub struct Experiment {
    db: Arc<UniverseDb>,
    settings: Arc<FrameworkSettings>,
    owner: u64,
    id: ExperimentId,
    name: Option<String>,
    domain: Domain,
    population: Population,
    config: PropertySet,
    core_config: PropertySet,
    run: Option<Run>,
}

/// State of an initialized experiment.
struct Run {
    trace: Trace,
    population_model: Box<dyn PopulationModel>,
    domain_model: Box<dyn DomainModel>,
    evaluated: bool,
    generation_started: Instant,
    stages: Vec<ProfileStage>,
}

impl std::fmt::Debug for Experiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Experiment")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("domain", &self.domain.kind())
            .field("population", &self.population.kind())
            .field("trace", &self.run.as_ref().map(|run| run.trace.id()))
            .finish_non_exhaustive()
    }
}

impl Experiment {
    /// Bind the owners and persist a new experiment record.
    ///
    /// With a base variation the record starts from a clone of it, and the
    /// four config sets are loaded from that clone.
    pub(crate) fn create(
        db: Arc<UniverseDb>,
        settings: Arc<FrameworkSettings>,
        domain: &Domain,
        population: &Population,
        name: Option<&str>,
        base_variation: Option<VariationId>,
    ) -> Result<Self, CoreError> {
        validate_name(name)?;
        let config = PropertySet::new(Arc::new(schemas::evolution()?));
        let core_config = PropertySet::new(Arc::new(schemas::core()?));
        let sets = [
            core_config.clone(),
            domain.config(),
            population.config(),
            config.clone(),
        ];

        let base = base_variation
            .map(|id| VariationStore::new(&db).load(id))
            .transpose()?;
        if let Some(base) = &base {
            check_snapshot(&sets, &base.config)?;
        }

        let owner = bind_owners(domain, population)?;
        let setup = setup_of(domain, population);
        let record = match ExperimentStore::new(&db).create(name, &setup, base_variation) {
            Ok(record) => record,
            Err(err) => {
                domain.release(owner);
                population.release(owner);
                return Err(err.into());
            }
        };

        let experiment = Self {
            db,
            settings,
            owner,
            id: record.id,
            name: record.name,
            domain: domain.clone(),
            population: population.clone(),
            config,
            core_config,
            run: None,
        };
        if let Some(base) = &base {
            apply_snapshot(&sets, &base.config)?;
            tracing::info!(
                experiment_id = %experiment.id,
                base_variation_id = %base.id,
                "Loaded forked configuration"
            );
        }
        Ok(experiment)
    }

    /// Rebuild a live experiment from its persisted record.
    ///
    /// Domain and population are created from the recorded setup, and the
    /// config sets are loaded from the experiment's last variation.
    pub(crate) fn resume(
        db: Arc<UniverseDb>,
        settings: Arc<FrameworkSettings>,
        registry: &Registry,
        record: ExperimentRecord,
    ) -> Result<Self, CoreError> {
        let setup = &record.setup;
        let domain = Domain::new(registry, &setup.domain_name)?;
        domain.set_hint(setup.domain_hint)?;
        let population = Population::new(registry, &setup.population_name)?;
        population.set_hint(setup.population_hint)?;
        population.set_size(setup.population_size)?;

        let config = PropertySet::new(Arc::new(schemas::evolution()?));
        let core_config = PropertySet::new(Arc::new(schemas::core()?));
        let sets = [
            core_config.clone(),
            domain.config(),
            population.config(),
            config.clone(),
        ];
        if let Some(last_id) = record.last_variation_id {
            let last = VariationStore::new(&db).load(last_id)?;
            apply_snapshot(&sets, &last.config)?;
        }

        let owner = bind_owners(&domain, &population)?;
        tracing::info!(
            experiment_id = %record.id,
            variation_id = ?record.last_variation_id.map(VariationId::into_inner),
            "Resumed experiment"
        );
        Ok(Self {
            db,
            settings,
            owner,
            id: record.id,
            name: record.name,
            domain,
            population,
            config,
            core_config,
            run: None,
        })
    }

    // -----------------------------------------------------------------------
    // Identity and binding
    // -----------------------------------------------------------------------

    /// Row id of the experiment.
    pub const fn id(&self) -> ExperimentId {
        self.id
    }

    /// The experiment's name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Rename (or unname) the experiment.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmptyName`] for an empty or whitespace-only name
    /// - [`CoreError::DuplicateName`] if another experiment uses the name
    /// - [`CoreError::Sealed`] while the experiment is initialized
    pub fn set_name(&mut self, name: Option<&str>) -> Result<(), CoreError> {
        self.ensure_unsealed()?;
        validate_name(name)?;
        ExperimentStore::new(&self.db).rename(self.id, name)?;
        self.name = name.map(str::to_owned);
        Ok(())
    }

    /// The bound domain.
    pub const fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The bound population.
    pub const fn population(&self) -> &Population {
        &self.population
    }

    /// Bind a different domain and population.
    ///
    /// Instances already bound to this experiment may be passed again.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyBound`] if either instance is bound to
    /// another live experiment (nothing changes in that case) and
    /// [`CoreError::Sealed`] while the experiment is initialized.
    pub fn attach(&mut self, domain: &Domain, population: &Population) -> Result<(), CoreError> {
        self.ensure_unsealed()?;

        domain.bind(self.owner)?;
        if let Err(err) = population.bind(self.owner) {
            if !domain.ptr_eq(&self.domain) {
                domain.release(self.owner);
            }
            return Err(err);
        }

        if !domain.ptr_eq(&self.domain) {
            self.domain.release(self.owner);
            self.domain = domain.clone();
        }
        if !population.ptr_eq(&self.population) {
            self.population.release(self.owner);
            self.population = population.clone();
        }

        ExperimentStore::new(&self.db).update_setup(self.id, &self.setup())?;
        tracing::debug!(
            experiment_id = %self.id,
            domain = self.domain.kind(),
            population = self.population.kind(),
            "Attached experiment owners"
        );
        Ok(())
    }

    /// The current setup document.
    pub fn setup(&self) -> ExperimentSetup {
        setup_of(&self.domain, &self.population)
    }

    // -----------------------------------------------------------------------
    // Config sets
    // -----------------------------------------------------------------------

    /// Evolution settings (`max_generations`, recorded payloads, ...).
    pub fn config(&self) -> PropertySet {
        self.config.clone()
    }

    /// Network weight settings shared by every population.
    pub fn core_config(&self) -> PropertySet {
        self.core_config.clone()
    }

    /// The four sets sealed together, in snapshot order.
    fn sets(&self) -> [PropertySet; 4] {
        [
            self.core_config.clone(),
            self.domain.config(),
            self.population.config(),
            self.config.clone(),
        ]
    }

    /// The combined snapshot recorded in a variation.
    pub fn snapshot(&self) -> Value {
        let parts = SNAPSHOT_KEYS
            .iter()
            .zip(self.sets())
            .map(|(key, set)| ((*key).to_owned(), set.to_snapshot()));
        Value::Object(parts.collect())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Whether a run is live.
    pub const fn is_initialized(&self) -> bool {
        self.run.is_some()
    }

    /// The current run's trace.
    pub fn trace(&self) -> Option<Trace> {
        self.run.as_ref().map(|run| run.trace.clone())
    }

    /// Seal the configuration, record it and start a new run.
    ///
    /// On a live experiment the current run is replaced: its trace is
    /// sealed once the new run has started.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if the models cannot be created or the
    /// variation or trace cannot be persisted. Nothing changes in that
    /// case: a live run keeps running and otherwise every set is unsealed
    /// again.
    pub fn initialize_population(&mut self) -> Result<(), CoreError> {
        let was_live = self.run.is_some();
        let sets = self.sets();
        for set in &sets {
            set.seal();
        }

        match self.start_run() {
            Ok((run, members)) => {
                if let Some(previous) = self.run.take() {
                    previous.trace.seal();
                    tracing::info!(
                        experiment_id = %self.id,
                        trace_id = %previous.trace.id(),
                        generations = previous.trace.len(),
                        "Replaced live run"
                    );
                }
                tracing::info!(
                    experiment_id = %self.id,
                    variation_id = %run.trace.variation_id(),
                    trace_id = %run.trace.id(),
                    size = members.len(),
                    "Initialized population"
                );
                self.population.set_members(Some(members));
                self.run = Some(run);
                Ok(())
            }
            Err(err) => {
                if !was_live {
                    for set in &sets {
                        set.unseal();
                    }
                }
                tracing::warn!(experiment_id = %self.id, error = %err, "Population initialization failed");
                Err(err)
            }
        }
    }

    fn start_run(&self) -> Result<(Run, Vec<Genotype>), CoreError> {
        let seed = self.settings.evolution.seed;
        let population_context = ModelContext {
            seed,
            hint: self.population.hint(),
            core: self.core_config.clone(),
        };
        let domain_context = ModelContext {
            seed,
            hint: self.domain.hint(),
            core: self.core_config.clone(),
        };

        let started = Instant::now();
        let population_factory = self.population.kind_entry().factory();
        let domain_factory = self.domain.kind_entry().factory();
        let mut population_model =
            population_factory(&self.population.config(), &population_context)?;
        let domain_model = domain_factory(&self.domain.config(), &domain_context)?;
        let members = population_model.primordial(self.population.size())?;
        let primordial = stage("primordial", started, members.len());

        let variation_id = self.resolve_variation(&self.snapshot())?;
        ExperimentStore::new(&self.db).update_setup(self.id, &self.setup())?;
        let record = TraceStore::new(&self.db).create(variation_id, &self.config.to_snapshot())?;
        let sink: Arc<dyn GenerationSink> = self.db.clone();

        let run = Run {
            trace: Trace::open(record, sink),
            population_model,
            domain_model,
            evaluated: false,
            generation_started: started,
            stages: vec![primordial],
        };
        Ok((run, members))
    }

    /// Reuse the last variation if its content matches, else record a new
    /// one parented to it.
    fn resolve_variation(&self, snapshot: &Value) -> Result<VariationId, CoreError> {
        let variations = VariationStore::new(&self.db);
        let experiment = ExperimentStore::new(&self.db).load(self.id)?;
        if let Some(last_id) = experiment.last_variation_id {
            let last = variations.load(last_id)?;
            if last.config == *snapshot {
                tracing::info!(experiment_id = %self.id, variation_id = %last.id, "Reused variation");
                return Ok(last.id);
            }
        }
        Ok(variations.create(self.id, snapshot)?.id)
    }

    /// Evaluate the current members and rank them best-first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInitialized`] outside a run, or the domain
    /// model's error (members are left unranked).
    pub fn evaluate_population(&mut self) -> Result<(), CoreError> {
        let run = self.run.as_mut().ok_or(CoreError::NotInitialized)?;
        let started = Instant::now();

        let mut members = self.population.take_members()?;
        if let Err(err) = run.domain_model.evaluate(&mut members) {
            self.population.set_members(Some(members));
            return Err(err.into());
        }
        members.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));

        run.stages.push(stage("evaluate", started, members.len()));
        run.evaluated = true;
        tracing::debug!(
            experiment_id = %self.id,
            best_fitness = members.first().map_or(0.0, |g| g.fitness),
            "Evaluated population"
        );
        self.population.set_members(Some(members));
        Ok(())
    }

    /// Record the current (evaluated) generation and breed the next one.
    ///
    /// Members are evaluated first if needed. Returns the appended record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInitialized`] outside a run, or the error of
    /// the failing step. A generation that was appended stays appended.
    pub fn create_next_generation(&mut self) -> Result<Arc<GenerationRecord>, CoreError> {
        if !self.run.as_ref().ok_or(CoreError::NotInitialized)?.evaluated {
            self.evaluate_population()?;
        }
        let options = RecordOptions::read(&self.config)?;
        let members = self.population.members()?;
        let run = self.run.as_mut().ok_or(CoreError::NotInitialized)?;

        let ranked: Vec<f32> = members.iter().map(|g| g.fitness).collect();
        let mut builder = GenerationBuilder::new(run.trace.len(), ranked)
            .fitness_information(options.fitness_information)
            .max_deviation(self.settings.evolution.max_fitness_deviation);
        if options.save_genealogy {
            builder = builder.genealogy(members.iter().map(|g| g.genealogy.clone()).collect());
        }
        if options.save_champion_genotype {
            if let Some(champion) = members.first() {
                builder = builder.champion(champion.payload.clone());
            }
        }
        let stages = std::mem::take(&mut run.stages);
        let profile = GenerationProfile {
            elapsed: run.generation_started.elapsed().as_secs_f64(),
            stages: (options.profile_information == ProfileInfoKind::AllStages).then_some(stages),
        };

        let record = run.trace.append(builder.profile(profile).build()?)?;
        run.evaluated = false;
        tracing::debug!(
            experiment_id = %self.id,
            generation = record.generation,
            best_fitness = record.summary.best_fitness,
            "Recorded generation"
        );
        if options.max_generations.is_some_and(|max| run.trace.len() >= max) {
            tracing::info!(
                experiment_id = %self.id,
                generations = run.trace.len(),
                "Reached max_generations"
            );
        }

        let started = Instant::now();
        let next = run.population_model.next_generation(&members)?;
        run.stages.push(stage("reproduce", started, next.len()));
        run.generation_started = started;
        self.population.set_members(Some(next));

        Ok(record)
    }

    /// End the current run: unseal the config sets, seal the trace for
    /// appends and discard the population's members. Does nothing to a
    /// trace that is already detached.
    pub fn reset(&mut self) {
        for set in self.sets() {
            set.unseal();
        }
        self.population.set_members(None);
        if let Some(run) = self.run.take() {
            run.trace.seal();
            tracing::info!(
                experiment_id = %self.id,
                trace_id = %run.trace.id(),
                generations = run.trace.len(),
                "Reset experiment"
            );
        }
    }

    /// End any run and release the domain and population.
    pub fn dispose(self) {
        drop(self);
    }

    fn ensure_unsealed(&self) -> Result<(), CoreError> {
        if self.config.is_sealed() {
            return Err(CoreError::Sealed {
                set: EXPERIMENT_SET.to_owned(),
            });
        }
        Ok(())
    }
}

impl Drop for Experiment {
    fn drop(&mut self) {
        if self.run.is_some() {
            self.reset();
        }
        self.domain.release(self.owner);
        self.population.release(self.owner);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Claim both owners for a fresh token, or neither.
fn bind_owners(domain: &Domain, population: &Population) -> Result<u64, CoreError> {
    let owner = next_owner();
    domain.bind(owner)?;
    if let Err(err) = population.bind(owner) {
        domain.release(owner);
        return Err(err);
    }
    Ok(owner)
}

/// Keys of a variation snapshot, one per config set, in `sets()` order.
const SNAPSHOT_KEYS: [&str; 4] = ["core", "domain", "population", "experiment"];

fn snapshot_parts<'a>(snapshot: &'a Value, empty: &'a Value) -> [&'a Value; 4] {
    SNAPSHOT_KEYS.map(|key| snapshot.get(key).unwrap_or(empty))
}

/// Load a variation snapshot into scratch copies of `sets`.
fn check_snapshot(sets: &[PropertySet; 4], snapshot: &Value) -> Result<(), PropertyError> {
    let empty = Value::Object(serde_json::Map::new());
    for (set, part) in sets.iter().zip(snapshot_parts(snapshot, &empty)) {
        PropertySet::new(set.schema()).from_snapshot(part)?;
    }
    Ok(())
}

/// Load a variation snapshot into `sets`. Missing parts reset to defaults.
fn apply_snapshot(sets: &[PropertySet; 4], snapshot: &Value) -> Result<(), PropertyError> {
    let empty = Value::Object(serde_json::Map::new());
    for (set, part) in sets.iter().zip(snapshot_parts(snapshot, &empty)) {
        set.from_snapshot(part)?;
    }
    Ok(())
}

fn validate_name(name: Option<&str>) -> Result<(), CoreError> {
    match name {
        Some(name) if name.trim().is_empty() => Err(CoreError::EmptyName),
        _ => Ok(()),
    }
}

fn setup_of(domain: &Domain, population: &Population) -> ExperimentSetup {
    ExperimentSetup {
        population_size: population.size(),
        population_name: population.kind().to_owned(),
        population_hint: population.hint(),
        domain_name: domain.kind().to_owned(),
        domain_hint: domain.hint(),
    }
}

fn stage(name: &str, started: Instant, genotypes: usize) -> ProfileStage {
    ProfileStage {
        name: name.to_owned(),
        elapsed: started.elapsed().as_secs_f64(),
        counters: BTreeMap::from([(
            "genotypes".to_owned(),
            u64::try_from(genotypes).unwrap_or(u64::MAX),
        )]),
    }
}

/// What the `evolution` set asks to record.
struct RecordOptions {
    max_generations: Option<usize>,
    save_champion_genotype: bool,
    fitness_information: FitnessInfoKind,
    save_genealogy: bool,
    profile_information: ProfileInfoKind,
}

impl RecordOptions {
    fn read(config: &PropertySet) -> Result<Self, PropertyError> {
        let max_generations: i64 = config.get_as("max_generations")?;
        Ok(Self {
            max_generations: usize::try_from(max_generations).ok(),
            save_champion_genotype: config.get_as("save_champion_genotype")?,
            fitness_information: read_tag(config, "fitness_information")?,
            save_genealogy: config.get_as("save_genealogy")?,
            profile_information: read_tag(config, "profile_information")?,
        })
    }
}

fn read_tag<T>(config: &PropertySet, name: &str) -> Result<T, PropertyError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let tag = config.get(name)?.format();
    tag.parse().map_err(|err: T::Err| PropertyError::InvalidValue {
        name: name.to_owned(),
        source: ValueError::Format {
            kind: "enum",
            input: tag.clone(),
            reason: err.to_string(),
        },
    })
}
