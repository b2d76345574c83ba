//! The universe handle.
//!
//! A [`Universe`] is the entry point of the framework: it owns the
//! exclusive connection to a universe file, creates experiments and
//! answers the read queries analysis tooling needs (experiments,
//! variation lineage, traces).

use std::path::Path;
use std::sync::Arc;

use darwin_db::{ExperimentStore, TraceStore, UniverseDb, VariationStore};
use darwin_trace::Trace;
use darwin_types::{ExperimentId, ExperimentRecord, TraceId, TraceRecord, VariationId, VariationRecord};

use crate::domain::Domain;
use crate::error::CoreError;
use crate::experiment::Experiment;
use crate::population::Population;
use crate::registry::Registry;
use crate::settings::FrameworkSettings;

/// An exclusive handle to a universe file.
#[derive(Debug)]
pub struct Universe {
    db: Arc<UniverseDb>,
    settings: Arc<FrameworkSettings>,
}

impl Universe {
    /// Create a new universe with default settings.
    ///
    /// # Errors
    ///
    /// Fails if `path` exists or cannot be created.
    pub fn create(path: &Path) -> Result<Self, CoreError> {
        Self::create_with(path, FrameworkSettings::from_env())
    }

    /// Create a new universe with explicit settings.
    pub fn create_with(path: &Path, settings: FrameworkSettings) -> Result<Self, CoreError> {
        let db = UniverseDb::create(path, &settings.universe.universe_config())?;
        Ok(Self::wrap(db, settings))
    }

    /// Open an existing universe with default settings.
    ///
    /// # Errors
    ///
    /// Fails if `path` is missing, is not a universe, or is locked by
    /// another handle.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        Self::open_with(path, FrameworkSettings::from_env())
    }

    /// Open an existing universe with explicit settings.
    pub fn open_with(path: &Path, settings: FrameworkSettings) -> Result<Self, CoreError> {
        let db = UniverseDb::open(path, &settings.universe.universe_config())?;
        Ok(Self::wrap(db, settings))
    }

    fn wrap(db: UniverseDb, settings: FrameworkSettings) -> Self {
        Self {
            db: Arc::new(db),
            settings: Arc::new(settings),
        }
    }

    /// Path of the universe file.
    pub fn path(&self) -> &Path {
        self.db.path()
    }

    /// Settings this universe was opened with.
    pub fn settings(&self) -> &FrameworkSettings {
        &self.settings
    }

    /// Release the file. Idempotent; returns `false` if already closed.
    ///
    /// Experiments created from this universe fail with
    /// [`CoreError::Closed`] afterwards.
    pub fn close(&self) -> bool {
        self.db.close()
    }

    /// Whether [`Universe::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.db.is_closed()
    }

    // -----------------------------------------------------------------------
    // Experiments
    // -----------------------------------------------------------------------

    /// Create an experiment binding `domain` and `population`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::AlreadyBound`] if either is bound to a live experiment
    /// - [`CoreError::EmptyName`] / [`CoreError::DuplicateName`] for a bad name
    /// - [`CoreError::Closed`] if the universe is closed
    pub fn new_experiment(
        &self,
        domain: &Domain,
        population: &Population,
        name: Option<&str>,
    ) -> Result<Experiment, CoreError> {
        Experiment::create(
            Arc::clone(&self.db),
            Arc::clone(&self.settings),
            domain,
            population,
            name,
            None,
        )
    }

    /// Create an experiment whose lineage continues from `base`, a
    /// variation that may belong to another experiment (a fork).
    ///
    /// The base configuration is cloned as the new experiment's first
    /// variation and loaded into all four config sets (the domain's and
    /// population's included), so an unchanged fork reuses the clone on
    /// its first run. Population size is not part of a variation and stays
    /// as given.
    ///
    /// # Errors
    ///
    /// As [`Universe::new_experiment`], plus [`CoreError::Db`] if `base`
    /// does not exist and [`CoreError::Property`] if its configuration
    /// does not fit the given domain and population kinds. Nothing is
    /// recorded or bound in either case.
    pub fn new_experiment_from(
        &self,
        domain: &Domain,
        population: &Population,
        name: Option<&str>,
        base: VariationId,
    ) -> Result<Experiment, CoreError> {
        Experiment::create(
            Arc::clone(&self.db),
            Arc::clone(&self.settings),
            domain,
            population,
            name,
            Some(base),
        )
    }

    /// Bring a persisted experiment back to life.
    ///
    /// A fresh domain and population are created from the recorded setup
    /// (kinds, hints, size) through `registry`, and the config sets are
    /// loaded from the experiment's last variation. The next
    /// `initialize_population` continues that lineage.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Db`] if the experiment or its variation is missing
    /// - [`CoreError::UnknownKind`] if `registry` lacks a recorded kind
    /// - [`CoreError::Property`] if the variation does not fit the schemas
    pub fn resume_experiment(
        &self,
        registry: &Registry,
        id: ExperimentId,
    ) -> Result<Experiment, CoreError> {
        let record = ExperimentStore::new(&self.db).load(id)?;
        Experiment::resume(
            Arc::clone(&self.db),
            Arc::clone(&self.settings),
            registry,
            record,
        )
    }

    // -----------------------------------------------------------------------
    // Read API
    // -----------------------------------------------------------------------

    /// Every experiment, oldest first.
    pub fn experiments_list(&self) -> Result<Vec<ExperimentRecord>, CoreError> {
        Ok(ExperimentStore::new(&self.db).list()?)
    }

    /// Find an experiment by name.
    pub fn find_experiment(&self, name: &str) -> Result<Option<ExperimentRecord>, CoreError> {
        Ok(ExperimentStore::new(&self.db).find_by_name(name)?)
    }

    /// Load an experiment record.
    pub fn load_experiment(&self, id: ExperimentId) -> Result<ExperimentRecord, CoreError> {
        Ok(ExperimentStore::new(&self.db).load(id)?)
    }

    /// Load a variation.
    pub fn load_variation(&self, id: VariationId) -> Result<VariationRecord, CoreError> {
        Ok(VariationStore::new(&self.db).load(id)?)
    }

    /// A variation and its ancestors, newest first.
    pub fn variation_lineage(&self, id: VariationId) -> Result<Vec<VariationRecord>, CoreError> {
        Ok(VariationStore::new(&self.db).lineage(id)?)
    }

    /// Direct children of a variation.
    pub fn variation_children(&self, id: VariationId) -> Result<Vec<VariationRecord>, CoreError> {
        Ok(VariationStore::new(&self.db).children(id)?)
    }

    /// Whether a variation's parent belongs to another experiment.
    pub fn is_fork(&self, variation: &VariationRecord) -> Result<bool, CoreError> {
        Ok(VariationStore::new(&self.db).is_fork(variation)?)
    }

    /// Every trace started from a variation.
    pub fn traces_for_variation(&self, id: VariationId) -> Result<Vec<TraceRecord>, CoreError> {
        Ok(TraceStore::new(&self.db).for_variation(id)?)
    }

    /// Load a trace with all its generations, sealed for appends.
    pub fn load_trace(&self, id: TraceId) -> Result<Trace, CoreError> {
        let store = TraceStore::new(&self.db);
        let record = store.load(id)?;
        let generations = store.generations(id)?;
        Ok(Trace::sealed(record, generations)?)
    }
}
