//! Registry of population and domain kinds.
//!
//! A kind pairs a property schema with the factory of the model that
//! reads it. Owners are created from a kind name; the name is recorded
//! in the experiment setup and every variation refers to the kind's
//! property names.

use std::collections::BTreeMap;
use std::sync::Arc;

use darwin_props::PropertySchema;

use crate::error::CoreError;
use crate::model::{DomainFactory, PopulationFactory};
use crate::{reference, schemas};

/// A registered population kind.
#[derive(Debug)]
pub struct PopulationKind {
    schema: Arc<PropertySchema>,
    factory: PopulationFactory,
}

impl PopulationKind {
    /// Registered name.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Schema of the kind's config set.
    pub fn schema(&self) -> &Arc<PropertySchema> {
        &self.schema
    }

    /// Model factory.
    pub const fn factory(&self) -> PopulationFactory {
        self.factory
    }
}

/// A registered domain kind.
#[derive(Debug)]
pub struct DomainKind {
    schema: Arc<PropertySchema>,
    factory: DomainFactory,
}

impl DomainKind {
    /// Registered name.
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Schema of the kind's config set.
    pub fn schema(&self) -> &Arc<PropertySchema> {
        &self.schema
    }

    /// Model factory.
    pub const fn factory(&self) -> DomainFactory {
        self.factory
    }
}

/// Name-indexed population and domain kinds.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    populations: BTreeMap<String, Arc<PopulationKind>>,
    domains: BTreeMap<String, Arc<DomainKind>>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every builtin kind.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Property`] if a builtin schema is inconsistent.
    pub fn builtin() -> Result<Self, CoreError> {
        let mut registry = Self::new();
        registry.register_population(schemas::dummy_population()?, reference::dummy_population);
        registry.register_population(schemas::neat_population()?, reference::neat_population);
        registry.register_population(
            schemas::cne_lstm_population()?,
            reference::cne_lstm_population,
        );
        registry.register_domain(schemas::unicycle_domain()?, reference::unicycle_domain);
        registry.register_domain(schemas::conquest_domain()?, reference::conquest_domain);
        registry.register_domain(schemas::tic_tac_toe_domain()?, reference::tic_tac_toe_domain);
        Ok(registry)
    }

    /// Register a population kind under its schema's name, replacing any
    /// previous kind of that name.
    pub fn register_population(
        &mut self,
        schema: PropertySchema,
        factory: PopulationFactory,
    ) -> Arc<PopulationKind> {
        let kind = Arc::new(PopulationKind {
            schema: Arc::new(schema),
            factory,
        });
        if self
            .populations
            .insert(kind.name().to_owned(), Arc::clone(&kind))
            .is_some()
        {
            tracing::warn!(kind = kind.name(), "Replaced population kind");
        }
        kind
    }

    /// Register a domain kind under its schema's name, replacing any
    /// previous kind of that name.
    pub fn register_domain(&mut self, schema: PropertySchema, factory: DomainFactory) -> Arc<DomainKind> {
        let kind = Arc::new(DomainKind {
            schema: Arc::new(schema),
            factory,
        });
        if self
            .domains
            .insert(kind.name().to_owned(), Arc::clone(&kind))
            .is_some()
        {
            tracing::warn!(kind = kind.name(), "Replaced domain kind");
        }
        kind
    }

    /// Look up a population kind.
    pub fn population(&self, name: &str) -> Result<Arc<PopulationKind>, CoreError> {
        self.populations
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownKind {
                role: "population",
                kind: name.to_owned(),
            })
    }

    /// Look up a domain kind.
    pub fn domain(&self, name: &str) -> Result<Arc<DomainKind>, CoreError> {
        self.domains
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownKind {
                role: "domain",
                kind: name.to_owned(),
            })
    }

    /// Names of the registered population kinds, sorted.
    pub fn population_names(&self) -> Vec<&str> {
        self.populations.keys().map(String::as_str).collect()
    }

    /// Names of the registered domain kinds, sorted.
    pub fn domain_names(&self) -> Vec<&str> {
        self.domains.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_kinds_are_registered() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.population_names(), vec!["cne.lstm", "dummy", "neat"]);
        assert_eq!(registry.domain_names(), vec!["conquest", "tic_tac_toe", "unicycle"]);
        assert_eq!(registry.population("neat").unwrap().name(), "neat");
    }

    #[test]
    fn unknown_kinds_are_reported() {
        let registry = Registry::builtin().unwrap();
        assert!(matches!(
            registry.domain("pong"),
            Err(CoreError::UnknownKind { role: "domain", .. })
        ));
        assert!(matches!(
            registry.population("unicycle"),
            Err(CoreError::UnknownKind { role: "population", .. })
        ));
    }

    #[test]
    fn custom_kinds_can_be_registered() {
        let mut registry = Registry::new();
        let schema = PropertySchema::builder("pong")
            .int("paddles", 2, "Number of paddles")
            .build()
            .unwrap();
        registry.register_domain(schema, reference::unicycle_domain);
        assert_eq!(registry.domain("pong").unwrap().schema().len(), 1);
    }
}
