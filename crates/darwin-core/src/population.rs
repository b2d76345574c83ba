//! Populations: a kind, its config, a size and (while a run is live) the
//! current members.

use std::sync::{Arc, Mutex, MutexGuard};

use darwin_props::PropertySet;
use darwin_trace::signed_index;
use darwin_types::ComplexityHint;

use crate::binding::OwnerSlot;
use crate::error::CoreError;
use crate::model::Genotype;
use crate::registry::{PopulationKind, Registry};

/// Population size of a freshly created population.
pub const DEFAULT_POPULATION_SIZE: usize = 5000;

/// A shared handle to a population.
///
/// Clones share the same population; the config set is shared with every
/// handle read from it and outlives the population itself.
#[derive(Debug, Clone)]
pub struct Population {
    inner: Arc<PopulationInner>,
}

#[derive(Debug)]
struct PopulationInner {
    kind: Arc<PopulationKind>,
    config: PropertySet,
    owner: OwnerSlot,
    state: Mutex<PopulationState>,
}

#[derive(Debug)]
struct PopulationState {
    size: usize,
    hint: ComplexityHint,
    /// Ranked (after evaluation) members; `None` outside a run.
    members: Option<Vec<Genotype>>,
}

impl Population {
    /// Create a population of a registered kind with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownKind`] if `kind` is not registered.
    pub fn new(registry: &Registry, kind: &str) -> Result<Self, CoreError> {
        let kind = registry.population(kind)?;
        let config = PropertySet::new(Arc::clone(kind.schema()));
        Ok(Self {
            inner: Arc::new(PopulationInner {
                kind,
                config,
                owner: OwnerSlot::default(),
                state: Mutex::new(PopulationState {
                    size: DEFAULT_POPULATION_SIZE,
                    hint: ComplexityHint::default(),
                    members: None,
                }),
            }),
        })
    }

    /// Registered kind name.
    pub fn kind(&self) -> &str {
        self.inner.kind.name()
    }

    pub(crate) fn kind_entry(&self) -> &Arc<PopulationKind> {
        &self.inner.kind
    }

    /// The population's config set.
    pub fn config(&self) -> PropertySet {
        self.inner.config.clone()
    }

    /// Number of genotypes created by `initialize_population`.
    pub fn size(&self) -> usize {
        self.lock().size
    }

    /// Change the population size.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSize`] for zero and [`CoreError::Sealed`]
    /// while the population's experiment is initialized.
    pub fn set_size(&self, size: usize) -> Result<(), CoreError> {
        if size < 1 {
            return Err(CoreError::InvalidSize { size });
        }
        self.ensure_unsealed()?;
        self.lock().size = size;
        tracing::debug!(kind = self.kind(), size, "Population size updated");
        Ok(())
    }

    /// Complexity hint recorded in the experiment setup.
    pub fn hint(&self) -> ComplexityHint {
        self.lock().hint
    }

    /// Change the complexity hint.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Sealed`] while the experiment is initialized.
    pub fn set_hint(&self, hint: ComplexityHint) -> Result<(), CoreError> {
        self.ensure_unsealed()?;
        self.lock().hint = hint;
        Ok(())
    }

    /// Whether the population is attached to a live experiment.
    pub fn is_bound(&self) -> bool {
        self.inner.owner.is_bound()
    }

    /// Whether the population currently has members.
    pub fn is_initialized(&self) -> bool {
        self.lock().members.is_some()
    }

    /// Number of current members.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInitialized`] outside a run.
    pub fn len(&self) -> Result<usize, CoreError> {
        self.lock()
            .members
            .as_ref()
            .map(Vec::len)
            .ok_or(CoreError::NotInitialized)
    }

    /// Whether the current generation has no members.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInitialized`] outside a run.
    pub fn is_empty(&self) -> Result<bool, CoreError> {
        self.len().map(|len| len == 0)
    }

    /// Member at a signed index (`-1` is the last, i.e. the worst after
    /// evaluation).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInitialized`] outside a run and
    /// [`CoreError::IndexOutOfRange`] outside `[-len, len)`.
    pub fn get(&self, index: i64) -> Result<Genotype, CoreError> {
        let state = self.lock();
        let members = state.members.as_ref().ok_or(CoreError::NotInitialized)?;
        signed_index(index, members.len())
            .and_then(|i| members.get(i))
            .cloned()
            .ok_or(CoreError::IndexOutOfRange {
                index,
                len: members.len(),
            })
    }

    /// A copy of every current member, in rank order after evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotInitialized`] outside a run.
    pub fn members(&self) -> Result<Vec<Genotype>, CoreError> {
        self.lock().members.clone().ok_or(CoreError::NotInitialized)
    }

    pub(crate) fn take_members(&self) -> Result<Vec<Genotype>, CoreError> {
        self.lock().members.take().ok_or(CoreError::NotInitialized)
    }

    pub(crate) fn set_members(&self, members: Option<Vec<Genotype>>) {
        self.lock().members = members;
    }

    pub(crate) fn bind(&self, owner: u64) -> Result<(), CoreError> {
        if self.inner.owner.acquire(owner) {
            Ok(())
        } else {
            Err(CoreError::AlreadyBound {
                role: "population",
                kind: self.kind().to_owned(),
            })
        }
    }

    pub(crate) fn release(&self, owner: u64) {
        self.inner.owner.release(owner);
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn ensure_unsealed(&self) -> Result<(), CoreError> {
        if self.inner.config.is_sealed() {
            return Err(CoreError::Sealed {
                set: self.kind().to_owned(),
            });
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, PopulationState> {
        self.inner.state.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(kind = self.kind(), "Recovered poisoned population lock");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use darwin_types::Genealogy;

    use super::*;

    fn genotype(fitness: f32) -> Genotype {
        Genotype {
            fitness,
            genealogy: Genealogy {
                genetic_operator: "primordial".to_owned(),
                parents: Vec::new(),
            },
            payload: serde_json::json!({ "weights": [fitness] }),
        }
    }

    #[test]
    fn size_must_be_positive_and_unsealed() {
        let population = Population::new(&Registry::builtin().unwrap(), "neat").unwrap();
        assert_eq!(population.size(), DEFAULT_POPULATION_SIZE);
        assert!(matches!(population.set_size(0), Err(CoreError::InvalidSize { size: 0 })));

        population.set_size(10).unwrap();
        assert_eq!(population.size(), 10);

        population.config().seal();
        assert!(matches!(population.set_size(20), Err(CoreError::Sealed { .. })));
        assert_eq!(population.size(), 10);
    }

    #[test]
    fn members_use_signed_indexing() {
        let population = Population::new(&Registry::builtin().unwrap(), "dummy").unwrap();
        assert!(matches!(population.get(0), Err(CoreError::NotInitialized)));
        assert!(matches!(population.len(), Err(CoreError::NotInitialized)));

        population.set_members(Some(vec![genotype(3.0), genotype(2.0), genotype(1.0)]));
        assert_eq!(population.get(0).unwrap(), genotype(3.0));
        assert_eq!(population.get(-1).unwrap(), genotype(1.0));
        assert_eq!(population.get(-3).unwrap(), genotype(3.0));
        assert!(matches!(
            population.get(3),
            Err(CoreError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(population.get(-4), Err(CoreError::IndexOutOfRange { .. })));

        population.set_members(None);
        assert!(!population.is_initialized());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(matches!(
            Population::new(&Registry::builtin().unwrap(), "cgp"),
            Err(CoreError::UnknownKind { .. })
        ));
    }
}
