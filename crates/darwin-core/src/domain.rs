//! Domains: a registered task kind and its config.

use std::sync::{Arc, Mutex, MutexGuard};

use darwin_props::PropertySet;
use darwin_types::ComplexityHint;

use crate::binding::OwnerSlot;
use crate::error::CoreError;
use crate::registry::{DomainKind, Registry};

/// A shared handle to a domain.
#[derive(Debug, Clone)]
pub struct Domain {
    inner: Arc<DomainInner>,
}

#[derive(Debug)]
struct DomainInner {
    kind: Arc<DomainKind>,
    config: PropertySet,
    owner: OwnerSlot,
    hint: Mutex<ComplexityHint>,
}

impl Domain {
    /// Create a domain of a registered kind with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownKind`] if `kind` is not registered.
    pub fn new(registry: &Registry, kind: &str) -> Result<Self, CoreError> {
        let kind = registry.domain(kind)?;
        let config = PropertySet::new(Arc::clone(kind.schema()));
        Ok(Self {
            inner: Arc::new(DomainInner {
                kind,
                config,
                owner: OwnerSlot::default(),
                hint: Mutex::new(ComplexityHint::default()),
            }),
        })
    }

    /// Registered kind name.
    pub fn kind(&self) -> &str {
        self.inner.kind.name()
    }

    pub(crate) fn kind_entry(&self) -> &Arc<DomainKind> {
        &self.inner.kind
    }

    /// The domain's config set.
    pub fn config(&self) -> PropertySet {
        self.inner.config.clone()
    }

    /// Complexity hint recorded in the experiment setup.
    pub fn hint(&self) -> ComplexityHint {
        *self.lock_hint()
    }

    /// Change the complexity hint.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Sealed`] while the experiment is initialized.
    pub fn set_hint(&self, hint: ComplexityHint) -> Result<(), CoreError> {
        if self.inner.config.is_sealed() {
            return Err(CoreError::Sealed {
                set: self.kind().to_owned(),
            });
        }
        *self.lock_hint() = hint;
        Ok(())
    }

    /// Whether the domain is attached to a live experiment.
    pub fn is_bound(&self) -> bool {
        self.inner.owner.is_bound()
    }

    pub(crate) fn bind(&self, owner: u64) -> Result<(), CoreError> {
        if self.inner.owner.acquire(owner) {
            Ok(())
        } else {
            Err(CoreError::AlreadyBound {
                role: "domain",
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

    fn lock_hint(&self) -> MutexGuard<'_, ComplexityHint> {
        self.inner.hint.lock().unwrap_or_else(|poisoned| {
            tracing::warn!(kind = self.kind(), "Recovered poisoned domain lock");
            poisoned.into_inner()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn config_outlives_the_domain() {
        let domain = Domain::new(&Registry::builtin().unwrap(), "conquest").unwrap();
        let board = domain.config().property("board").unwrap();
        let config = domain.config();
        drop(domain);

        assert_eq!(board.to_string(), "hexagon");
        config.set("board", "diamond").unwrap();
        assert_eq!(board.to_string(), "hexagon");
        assert_eq!(config.get("board").unwrap().format(), "diamond");
    }

    #[test]
    fn hint_is_sealed_with_the_config() {
        let domain = Domain::new(&Registry::builtin().unwrap(), "unicycle").unwrap();
        domain.set_hint(ComplexityHint::Extra).unwrap();
        domain.config().seal();
        assert!(matches!(
            domain.set_hint(ComplexityHint::Minimal),
            Err(CoreError::Sealed { .. })
        ));
        assert_eq!(domain.hint(), ComplexityHint::Extra);
    }
}
