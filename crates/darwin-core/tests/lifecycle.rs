//! End-to-end scenarios: configure, initialize, evolve, reset, reopen.
//!
//! Every test works on a scratch universe in a temporary directory and
//! drives the reference models.

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::too_many_lines
)]

use darwin_core::model::ModelError;
use darwin_core::{
    CoreError, Domain, FrameworkSettings, ModelContext, Population, PopulationModel, Registry,
    Universe,
};
use darwin_props::{PropertyError, PropertySchema, PropertySet};
use darwin_trace::TraceError;
use darwin_types::{ComplexityHint, ExperimentId, VariationId};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

struct Fixture {
    dir: TempDir,
    universe: Universe,
    registry: Registry,
}

impl Fixture {
    fn path(&self) -> std::path::PathBuf {
        self.dir.path().join("test.darwin")
    }

    fn domain(&self, kind: &str) -> Domain {
        Domain::new(&self.registry, kind).expect("domain")
    }

    fn population(&self, kind: &str, size: usize) -> Population {
        let population = Population::new(&self.registry, kind).expect("population");
        population.set_size(size).expect("size");
        population
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            FrameworkSettings::default().logging.level,
        ))
        .with_test_writer()
        .try_init();
}

fn fixture() -> Fixture {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let universe = Universe::create_with(&dir.path().join("test.darwin"), FrameworkSettings::default())
        .expect("create universe");
    Fixture {
        dir,
        universe,
        registry: Registry::builtin().expect("registry"),
    }
}

// =============================================================================
// Evolution run
// =============================================================================

#[test]
fn unicycle_run_records_five_generations() {
    let fx = fixture();
    let domain = fx.domain("unicycle");
    let population = fx.population("neat", 10);
    let mut experiment = fx.universe.new_experiment(&domain, &population, None).unwrap();

    experiment.initialize_population().unwrap();
    assert_eq!(population.len().unwrap(), 10);

    for _ in 0..5 {
        experiment.evaluate_population().unwrap();
        experiment.create_next_generation().unwrap();
    }

    let trace = experiment.trace().expect("running trace");
    assert_eq!(trace.len(), 5);
    assert_eq!(trace.get(4).unwrap(), trace.get(-1).unwrap());
    assert_eq!(trace.get(0).unwrap().generation, 0);
    assert!(matches!(trace.get(5), Err(TraceError::IndexOutOfRange { index: 5, len: 5 })));
    assert!(matches!(trace.get(-6), Err(TraceError::IndexOutOfRange { .. })));

    let last = trace.get(-1).unwrap();
    assert!(last.summary.best_fitness >= last.summary.median_fitness);
    assert!(last.summary.median_fitness >= last.summary.worst_fitness);
    assert_eq!(last.summary.champion_fitness, last.summary.best_fitness);
    assert!(last.details.compressed_fitness.is_some());
    assert!(last.genotypes.champion.is_some());

    // The elite survives, so the best fitness never drops.
    for index in 1..5 {
        let previous = trace.get(index - 1).unwrap().summary.best_fitness;
        assert!(trace.get(index).unwrap().summary.best_fitness >= previous);
    }

    let stored = fx.universe.load_trace(trace.id()).unwrap();
    assert_eq!(stored.len(), 5);
    assert!(!stored.is_open());
    let reloaded = stored.get(-1).unwrap();
    assert_eq!(reloaded.generation, last.generation);
    assert_eq!(reloaded.timestamp, last.timestamp);
    assert_eq!(
        reloaded.details.compressed_fitness.as_ref().map(Vec::len),
        last.details.compressed_fitness.as_ref().map(Vec::len)
    );
}

#[test]
fn create_next_generation_evaluates_when_needed() {
    let fx = fixture();
    let domain = fx.domain("tic_tac_toe");
    let population = fx.population("cne.lstm", 6);
    let mut experiment = fx.universe.new_experiment(&domain, &population, None).unwrap();

    assert!(matches!(
        experiment.create_next_generation(),
        Err(CoreError::NotInitialized)
    ));

    experiment.initialize_population().unwrap();
    let record = experiment.create_next_generation().unwrap();
    assert_eq!(record.generation, 0);
    assert_eq!(population.len().unwrap(), 6);
}

#[test]
fn recorded_payloads_follow_evolution_config() {
    let fx = fixture();
    let domain = fx.domain("conquest");
    let population = fx.population("neat", 8);
    let mut experiment = fx.universe.new_experiment(&domain, &population, None).unwrap();

    let config = experiment.config();
    config.set("fitness_information", "full_raw").unwrap();
    config.set("save_genealogy", "true").unwrap();
    config.set("save_champion_genotype", "false").unwrap();
    config.set("profile_information", "all_stages").unwrap();

    experiment.initialize_population().unwrap();
    experiment.evaluate_population().unwrap();
    let first = experiment.create_next_generation().unwrap();

    assert_eq!(first.details.full_fitness.as_ref().map(Vec::len), Some(8));
    assert!(first.details.compressed_fitness.is_none());
    let genealogy = first.details.genealogy.as_ref().expect("genealogy");
    assert_eq!(genealogy.len(), 8);
    assert!(genealogy.iter().all(|g| g.genetic_operator == "primordial"));
    assert!(first.genotypes.champion.is_none());

    let stages = first.profile.stages.as_ref().expect("stages");
    let names: Vec<&str> = stages.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["primordial", "evaluate"]);

    let second = experiment.create_next_generation().unwrap();
    let names: Vec<&str> = second
        .profile
        .stages
        .as_ref()
        .expect("stages")
        .iter()
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(names, vec!["reproduce", "evaluate"]);

    experiment.reset();
    experiment.config().set("fitness_information", "samples_only").unwrap();
    experiment.initialize_population().unwrap();
    let sampled = experiment.create_next_generation().unwrap();
    assert!(sampled.details.full_fitness.is_none());
    assert!(sampled.details.compressed_fitness.is_none());
}

// =============================================================================
// Naming and binding
// =============================================================================

#[test]
fn experiment_names_are_unique_per_universe() {
    let fx = fixture();
    let (domain_a, population_a) = (fx.domain("unicycle"), fx.population("neat", 10));
    let (domain_b, population_b) = (fx.domain("unicycle"), fx.population("neat", 10));

    let mut first = fx
        .universe
        .new_experiment(&domain_a, &population_a, Some("final"))
        .unwrap();
    assert_eq!(first.name(), Some("final"));

    assert!(matches!(
        fx.universe.new_experiment(&domain_b, &population_b, Some("final")),
        Err(CoreError::DuplicateName(name)) if name == "final"
    ));
    // A rejected experiment does not keep its owners bound.
    assert!(!domain_b.is_bound());
    assert!(!population_b.is_bound());

    assert!(matches!(
        fx.universe.new_experiment(&domain_b, &population_b, Some("   ")),
        Err(CoreError::EmptyName)
    ));
    assert!(matches!(first.set_name(Some("")), Err(CoreError::EmptyName)));

    first.set_name(Some("final")).unwrap();
    let mut second = fx
        .universe
        .new_experiment(&domain_b, &population_b, None)
        .unwrap();
    assert!(matches!(
        second.set_name(Some("final")),
        Err(CoreError::DuplicateName(_))
    ));
    second.set_name(Some("draft")).unwrap();

    assert_eq!(
        fx.universe.find_experiment("draft").unwrap().map(|e| e.id),
        Some(second.id())
    );
    assert_eq!(fx.universe.experiments_list().unwrap().len(), 2);
}

#[test]
fn owners_bind_to_one_live_experiment() {
    let fx = fixture();
    let population = fx.population("neat", 10);
    let (domain_a, domain_b) = (fx.domain("unicycle"), fx.domain("unicycle"));

    let first = fx.universe.new_experiment(&domain_a, &population, None).unwrap();
    assert!(population.is_bound());

    assert!(matches!(
        fx.universe.new_experiment(&domain_b, &population, None),
        Err(CoreError::AlreadyBound { role: "population", .. })
    ));
    assert!(!domain_b.is_bound());

    first.dispose();
    assert!(!population.is_bound());
    assert!(!domain_a.is_bound());

    let mut second = fx.universe.new_experiment(&domain_b, &population, None).unwrap();

    // Re-attaching the current owners is fine; swapping releases the old ones.
    second.attach(&domain_b, &population).unwrap();
    second.attach(&domain_a, &population).unwrap();
    assert!(domain_a.is_bound());
    assert!(!domain_b.is_bound());
    assert_eq!(second.domain().kind(), "unicycle");
}

// =============================================================================
// Sealing
// =============================================================================

#[test]
fn initialization_seals_every_set_until_reset() {
    let fx = fixture();
    let domain = fx.domain("unicycle");
    let population = fx.population("neat", 10);
    let mut experiment = fx.universe.new_experiment(&domain, &population, None).unwrap();

    domain.config().set("max_steps", "250").unwrap();
    experiment.initialize_population().unwrap();

    let sets: [(PropertySet, &str); 4] = [
        (domain.config(), "max_steps"),
        (population.config(), "elite_percentage"),
        (experiment.config(), "max_generations"),
        (experiment.core_config(), "mutation_std_dev"),
    ];
    for (set, name) in &sets {
        let before = set.get(name).unwrap();
        assert!(matches!(set.set(name, "7"), Err(PropertyError::Sealed { .. })));
        assert_eq!(set.get(name).unwrap(), before);
    }
    assert!(matches!(population.set_size(20), Err(CoreError::Sealed { .. })));
    assert!(matches!(experiment.set_name(Some("late")), Err(CoreError::Sealed { .. })));
    assert_eq!(domain.config().get("max_steps").unwrap().format(), "250");

    experiment.reset();
    for (set, name) in &sets {
        set.set(name, "7").unwrap();
        assert_eq!(set.get(name).unwrap().format(), "7");
    }
    population.set_size(20).unwrap();
}

#[test]
fn reset_detaches_the_trace_and_members() {
    let fx = fixture();
    let domain = fx.domain("unicycle");
    let population = fx.population("dummy", 4);
    let mut experiment = fx.universe.new_experiment(&domain, &population, None).unwrap();

    assert!(matches!(population.get(0), Err(CoreError::NotInitialized)));
    experiment.initialize_population().unwrap();
    experiment.create_next_generation().unwrap();
    let trace = experiment.trace().unwrap();
    assert!(population.get(-1).is_ok());

    experiment.reset();
    experiment.reset();
    assert!(experiment.trace().is_none());
    assert!(!trace.is_open());
    assert_eq!(trace.len(), 1);
    assert!(matches!(population.get(0), Err(CoreError::NotInitialized)));
    assert!(matches!(
        experiment.evaluate_population(),
        Err(CoreError::NotInitialized)
    ));
}

#[test]
fn failed_initialization_leaves_everything_unsealed() {
    fn failing(
        _config: &PropertySet,
        _context: &ModelContext,
    ) -> Result<Box<dyn PopulationModel>, ModelError> {
        Err(ModelError::Internal {
            message: "no genotypes today".to_owned(),
        })
    }

    let fx = fixture();
    let mut registry = Registry::new();
    registry.register_population(
        PropertySchema::builder("broken")
            .int("genes", 3, "Genes per genotype")
            .build()
            .unwrap(),
        failing,
    );
    let population = Population::new(&registry, "broken").unwrap();
    let domain = fx.domain("unicycle");
    let mut experiment = fx.universe.new_experiment(&domain, &population, None).unwrap();

    assert!(matches!(
        experiment.initialize_population(),
        Err(CoreError::Model(ModelError::Internal { .. }))
    ));
    assert!(!experiment.is_initialized());
    assert!(!population.config().is_sealed());
    assert!(!experiment.config().is_sealed());
    population.config().set("genes", "4").unwrap();

    let record = fx.universe.load_experiment(experiment.id()).unwrap();
    assert!(record.last_variation_id.is_none());
}

// =============================================================================
// Property sets through owners
// =============================================================================

#[test]
fn board_survives_snapshot_into_fresh_domain() {
    let fx = fixture();
    let domain = fx.domain("conquest");
    domain.config().set("board", "diamond").unwrap();
    domain.config().set("board", "hexagon").unwrap();
    let blob = domain.config().to_snapshot();

    let fresh = fx.domain("conquest");
    fresh.config().set("board", "triangle").unwrap();
    fresh.config().from_snapshot(&blob).unwrap();
    assert_eq!(fresh.config().get("board").unwrap().format(), "hexagon");
    assert_eq!(fresh.config().entries(), domain.config().entries());
}

#[test]
fn tournament_variant_handles_are_independent() {
    let fx = fixture();
    let domain = fx.domain("conquest");
    let config = domain.config();

    config.set("tournament_type", "swiss").unwrap();
    let swiss = config.variant_of("tournament_type").unwrap();
    assert_eq!(swiss.get_as::<i64>("rounds").unwrap(), 20);

    config.set("tournament_type", "simple").unwrap();
    let simple = config.variant_of("tournament_type").unwrap();
    simple.set("eval_games", "123").unwrap();
    assert_eq!(simple.get_as::<i64>("eval_games").unwrap(), 123);
    assert_eq!(swiss.get_as::<i64>("rounds").unwrap(), 20);

    let snapshot = config.to_snapshot();
    assert_eq!(snapshot["tournament_type"]["tag"], "simple");
    assert_eq!(snapshot["tournament_type"]["simple"]["eval_games"], "123");

    assert!(matches!(
        config.variant_of("board"),
        Err(PropertyError::NoVariant { .. })
    ));
}

#[test]
fn invalid_values_are_rejected_without_change() {
    let fx = fixture();
    let domain = fx.domain("conquest");
    let population = fx.population("neat", 10);

    assert!(domain.config().get_as::<i64>("board").is_err());
    assert!(domain.config().set("max_steps", "#0.15").unwrap_err().is_format_error());
    assert!(domain.config().set("board", "octagon").unwrap_err().is_format_error());
    assert_eq!(domain.config().get("board").unwrap().format(), "hexagon");

    let neat = population.config();
    assert!(neat.set("activation_function", "relu_blah").is_err());
    neat.set("activation_function", "relu").unwrap();
    assert_eq!(neat.get("activation_function").unwrap().format(), "relu");
}

// =============================================================================
// Variations and lineage
// =============================================================================

#[test]
fn unchanged_config_reuses_its_variation() {
    let fx = fixture();
    let domain = fx.domain("unicycle");
    let population = fx.population("neat", 5);
    let mut experiment = fx.universe.new_experiment(&domain, &population, None).unwrap();

    experiment.initialize_population().unwrap();
    let first = experiment.trace().unwrap();
    experiment.reset();

    experiment.initialize_population().unwrap();
    let second = experiment.trace().unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(first.variation_id(), second.variation_id());
    assert_eq!(
        fx.universe.traces_for_variation(first.variation_id()).unwrap().len(),
        2
    );

    experiment.reset();
    domain.config().set("gravity", "3.7").unwrap();
    experiment.initialize_population().unwrap();
    let third = experiment.trace().unwrap();
    assert_ne!(third.variation_id(), first.variation_id());

    let child = fx.universe.load_variation(third.variation_id()).unwrap();
    assert_eq!(child.previous_id, Some(first.variation_id()));
    assert_eq!(child.config["domain"]["gravity"], "3.7");
    assert!(!fx.universe.is_fork(&child).unwrap());

    let lineage = fx.universe.variation_lineage(child.id).unwrap();
    assert_eq!(lineage.len(), 2);
    assert!(lineage[1].is_root());
    assert_eq!(
        fx.universe.variation_children(first.variation_id()).unwrap().len(),
        1
    );
}

#[test]
fn forked_experiment_starts_from_the_base_settings() {
    let fx = fixture();
    let (domain_a, population_a) = (fx.domain("unicycle"), fx.population("neat", 5));
    let mut parent = fx
        .universe
        .new_experiment(&domain_a, &population_a, Some("parent"))
        .unwrap();
    domain_a.config().set("gravity", "3.7").unwrap();
    population_a.config().set("elite_percentage", "0.25").unwrap();
    parent.config().set("max_generations", "50").unwrap();
    parent.core_config().set("mutation_std_dev", "0.5").unwrap();
    parent.initialize_population().unwrap();
    let base = parent.trace().unwrap().variation_id();
    parent.dispose();

    let (domain_b, population_b) = (fx.domain("unicycle"), fx.population("neat", 5));
    let mut fork = fx
        .universe
        .new_experiment_from(&domain_b, &population_b, Some("fork"), base)
        .unwrap();

    assert_eq!(domain_b.config().get("gravity").unwrap().format(), "3.7");
    assert_eq!(
        population_b.config().get("elite_percentage").unwrap().format(),
        "0.25"
    );
    assert_eq!(fork.config().get_as::<i64>("max_generations").unwrap(), 50);
    assert_eq!(fork.core_config().get("mutation_std_dev").unwrap().format(), "0.5");

    let record = fx.universe.load_experiment(fork.id()).unwrap();
    let clone_id = record.last_variation_id.expect("cloned variation");
    let clone = fx.universe.load_variation(clone_id).unwrap();
    assert_eq!(clone.previous_id, Some(base));
    assert_eq!(clone.experiment_id, fork.id());
    assert!(fx.universe.is_fork(&clone).unwrap());

    fork.initialize_population().unwrap();
    assert_eq!(fork.trace().unwrap().variation_id(), clone_id);
    assert!(fx.universe.variation_children(clone_id).unwrap().is_empty());
}

#[test]
fn fork_from_an_unfit_base_records_nothing() {
    let fx = fixture();
    let (domain_a, population_a) = (fx.domain("tic_tac_toe"), fx.population("neat", 5));
    let mut parent = fx
        .universe
        .new_experiment(&domain_a, &population_a, None)
        .unwrap();
    parent.initialize_population().unwrap();
    let base = parent.trace().unwrap().variation_id();
    parent.dispose();

    let (domain_b, population_b) = (fx.domain("unicycle"), fx.population("neat", 5));
    let err = fx
        .universe
        .new_experiment_from(&domain_b, &population_b, Some("mismatch"), base)
        .unwrap_err();
    assert!(matches!(err, CoreError::Property(ref inner) if inner.is_format_error()));
    assert!(!domain_b.is_bound());
    assert!(!population_b.is_bound());
    assert_eq!(domain_b.config().get("gravity").unwrap().format(), "9.8");
    assert!(fx.universe.find_experiment("mismatch").unwrap().is_none());

    assert!(matches!(
        fx.universe.new_experiment_from(
            &domain_b,
            &population_b,
            None,
            VariationId(9_999),
        ),
        Err(CoreError::Db(_))
    ));
    assert!(!domain_b.is_bound());
    assert_eq!(fx.universe.experiments_list().unwrap().len(), 1);
}

// =============================================================================
// Universe handle
// =============================================================================

#[test]
fn closed_universe_rejects_everything() {
    let fx = fixture();
    let domain = fx.domain("unicycle");
    let population = fx.population("neat", 5);
    let mut experiment = fx.universe.new_experiment(&domain, &population, None).unwrap();

    assert!(fx.universe.close());
    assert!(!fx.universe.close());
    assert!(fx.universe.is_closed());

    assert!(matches!(experiment.initialize_population(), Err(CoreError::Closed)));
    assert!(!domain.config().is_sealed());
    assert!(matches!(fx.universe.experiments_list(), Err(CoreError::Closed)));

    let (other_domain, other_population) = (fx.domain("unicycle"), fx.population("neat", 5));
    assert!(matches!(
        fx.universe.new_experiment(&other_domain, &other_population, None),
        Err(CoreError::Closed)
    ));
}

#[test]
fn universe_contents_survive_reopen() {
    let fx = fixture();
    let trace_id = {
        let domain = fx.domain("unicycle");
        let population = fx.population("neat", 5);
        let mut experiment = fx
            .universe
            .new_experiment(&domain, &population, Some("persisted"))
            .unwrap();
        experiment.initialize_population().unwrap();
        experiment.create_next_generation().unwrap();
        experiment.create_next_generation().unwrap();
        experiment.trace().unwrap().id()
    };
    fx.universe.close();

    let reopened = Universe::open_with(&fx.path(), FrameworkSettings::default()).unwrap();
    assert!(matches!(
        Universe::open_with(&fx.path(), FrameworkSettings::default()),
        Err(CoreError::Db(_))
    ));

    let record = reopened.find_experiment("persisted").unwrap().expect("experiment");
    assert_eq!(record.setup.population_size, 5);
    assert_eq!(record.setup.domain_name, "unicycle");

    let trace = reopened.load_trace(trace_id).unwrap();
    assert_eq!(trace.len(), 2);
    assert!(!trace.is_open());
    assert_eq!(trace.variation_id(), record.last_variation_id.unwrap());
    assert_eq!(
        trace.record().evolution_config["fitness_information"],
        "full_compressed"
    );
}

#[test]
fn resumed_experiment_continues_its_lineage() {
    let fx = fixture();
    let (experiment_id, variation_id) = {
        let domain = fx.domain("unicycle");
        let population = fx.population("neat", 7);
        population.set_hint(ComplexityHint::Extra).unwrap();
        let mut experiment = fx
            .universe
            .new_experiment(&domain, &population, Some("long run"))
            .unwrap();
        domain.config().set("gravity", "3.7").unwrap();
        experiment.config().set("save_genealogy", "true").unwrap();
        experiment.initialize_population().unwrap();
        experiment.create_next_generation().unwrap();
        (experiment.id(), experiment.trace().unwrap().variation_id())
    };
    fx.universe.close();

    let reopened = Universe::open_with(&fx.path(), FrameworkSettings::default()).unwrap();
    let mut experiment = reopened.resume_experiment(&fx.registry, experiment_id).unwrap();

    assert_eq!(experiment.name(), Some("long run"));
    assert_eq!(experiment.domain().kind(), "unicycle");
    assert_eq!(experiment.population().size(), 7);
    assert_eq!(
        experiment.population().hint(),
        ComplexityHint::Extra
    );
    assert_eq!(
        experiment.domain().config().get("gravity").unwrap().format(),
        "3.7"
    );
    assert!(experiment.config().get_as::<bool>("save_genealogy").unwrap());
    assert!(!experiment.is_initialized());

    experiment.initialize_population().unwrap();
    assert_eq!(experiment.population().len().unwrap(), 7);
    assert_eq!(experiment.trace().unwrap().variation_id(), variation_id);
    assert_eq!(reopened.traces_for_variation(variation_id).unwrap().len(), 2);

    experiment.reset();
    experiment.domain().config().set("gravity", "1.6").unwrap();
    experiment.initialize_population().unwrap();
    let child = reopened
        .load_variation(experiment.trace().unwrap().variation_id())
        .unwrap();
    assert_eq!(child.previous_id, Some(variation_id));
}

#[test]
fn resume_needs_the_recorded_kinds() {
    let fx = fixture();
    let experiment_id = {
        let domain = fx.domain("conquest");
        let population = fx.population("dummy", 3);
        fx.universe
            .new_experiment(&domain, &population, None)
            .unwrap()
            .id()
    };

    // Never initialized: every set starts from its defaults.
    let experiment = fx.universe.resume_experiment(&fx.registry, experiment_id).unwrap();
    assert_eq!(
        experiment.domain().config().get("board").unwrap().format(),
        "hexagon"
    );
    assert!(experiment.population().is_bound());
    drop(experiment);

    assert!(matches!(
        fx.universe.resume_experiment(&Registry::new(), experiment_id),
        Err(CoreError::UnknownKind { .. })
    ));
    assert!(matches!(
        fx.universe
            .resume_experiment(&fx.registry, ExperimentId(404)),
        Err(CoreError::Db(_))
    ));
}

#[test]
fn reinitializing_a_live_experiment_replaces_its_run() {
    let fx = fixture();
    let domain = fx.domain("unicycle");
    let population = fx.population("neat", 5);
    let mut experiment = fx.universe.new_experiment(&domain, &population, None).unwrap();

    experiment.initialize_population().unwrap();
    experiment.create_next_generation().unwrap();
    let first = experiment.trace().unwrap();

    experiment.initialize_population().unwrap();
    let second = experiment.trace().unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(first.variation_id(), second.variation_id());
    assert!(!first.is_open());
    assert_eq!(first.len(), 1);
    assert!(second.is_open());
    assert!(domain.config().is_sealed());

    // A failed re-initialization leaves the live run untouched.
    assert!(second.is_empty());
    fx.universe.close();
    assert!(matches!(
        experiment.initialize_population(),
        Err(CoreError::Closed)
    ));
    assert!(experiment.is_initialized());
    assert_eq!(experiment.trace().unwrap().id(), second.id());
    assert!(second.is_open());
    assert_eq!(population.len().unwrap(), 5);
    assert!(domain.config().is_sealed());
    assert!(experiment.config().is_sealed());
}
