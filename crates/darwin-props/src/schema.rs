//! Property schemas: the declared shape of a property set.
//!
//! A schema lists properties in declaration order, each with a kind, a
//! default and a description. A property may also be a *variant
//! discriminator*: an enum whose every tag selects a nested schema.
//!
//! Schemas are built once per kind through [`SchemaBuilder`] and shared
//! (`Arc`) by every [`PropertySet`](crate::PropertySet) created from them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::PropertyError;
use crate::value::{PropertyKind, PropertyValue};

/// Declaration of a single property.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    /// Property name, unique within its schema.
    pub name: String,
    /// Declared kind.
    pub kind: PropertyKind,
    /// Default value.
    pub default: PropertyValue,
    /// Human-readable description.
    pub description: String,
    /// Nested schemas by tag, for variant discriminators.
    pub cases: Option<Vec<(String, Arc<PropertySchema>)>>,
}

impl PropertyDef {
    /// Nested schema selected by `tag`, if this property is a discriminator.
    pub fn case(&self, tag: &str) -> Option<&Arc<PropertySchema>> {
        self.cases
            .as_ref()?
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, schema)| schema)
    }
}

/// An ordered, named collection of property declarations.
#[derive(Debug)]
pub struct PropertySchema {
    name: String,
    defs: Vec<PropertyDef>,
    index: HashMap<String, usize>,
}

impl PropertySchema {
    /// Start building a schema.
    pub fn builder(name: &str) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Schema name (usually the owner kind).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declarations in declaration order.
    pub fn defs(&self) -> &[PropertyDef] {
        &self.defs
    }

    /// Position of a property by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Declaration of a property by name.
    pub fn def(&self, name: &str) -> Option<&PropertyDef> {
        self.position(name).and_then(|i| self.defs.get(i))
    }

    /// Number of declared properties.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the schema declares no properties.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Fluent builder for [`PropertySchema`].
///
/// Declaration mistakes (duplicate names, invalid defaults) are recorded
/// and reported once by [`SchemaBuilder::build`].
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    defs: Vec<PropertyDef>,
    error: Option<PropertyError>,
}

impl SchemaBuilder {
    /// Create an empty builder.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            defs: Vec::new(),
            error: None,
        }
    }

    /// Declare a bool property.
    #[must_use]
    pub fn bool(self, name: &str, default: bool, description: &str) -> Self {
        self.push(name, PropertyKind::Bool, PropertyValue::Bool(default), description, None)
    }

    /// Declare an int property.
    #[must_use]
    pub fn int(self, name: &str, default: i64, description: &str) -> Self {
        self.push(name, PropertyKind::Int, PropertyValue::Int(default), description, None)
    }

    /// Declare a float property.
    #[must_use]
    pub fn float(self, name: &str, default: f64, description: &str) -> Self {
        self.push(name, PropertyKind::Float, PropertyValue::Float(default), description, None)
    }

    /// Declare a string property.
    #[must_use]
    pub fn string(self, name: &str, default: &str, description: &str) -> Self {
        self.push(
            name,
            PropertyKind::String,
            PropertyValue::String(default.to_owned()),
            description,
            None,
        )
    }

    /// Declare an enum property with a closed tag set.
    #[must_use]
    pub fn enumeration(self, name: &str, tags: &[&str], default: &str, description: &str) -> Self {
        self.parsed(name, PropertyKind::enumeration(tags), default, description, None)
    }

    /// Declare a list property; `default` is given in `{ ... }` form.
    #[must_use]
    pub fn list(self, name: &str, element: PropertyKind, default: &str, description: &str) -> Self {
        self.parsed(name, PropertyKind::list(element), default, description, None)
    }

    /// Declare a variant discriminator: one nested schema per tag.
    #[must_use]
    pub fn variant(
        self,
        name: &str,
        cases: Vec<(&str, PropertySchema)>,
        default: &str,
        description: &str,
    ) -> Self {
        let tags: Vec<&str> = cases.iter().map(|(tag, _)| *tag).collect();
        let kind = PropertyKind::enumeration(&tags);
        let cases = cases
            .into_iter()
            .map(|(tag, schema)| (tag.to_owned(), Arc::new(schema)))
            .collect();
        self.parsed(name, kind, default, description, Some(cases))
    }

    /// Finish the schema.
    pub fn build(self) -> Result<PropertySchema, PropertyError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let index = self
            .defs
            .iter()
            .enumerate()
            .map(|(i, def)| (def.name.clone(), i))
            .collect();
        Ok(PropertySchema {
            name: self.name,
            defs: self.defs,
            index,
        })
    }

    fn parsed(
        mut self,
        name: &str,
        kind: PropertyKind,
        default: &str,
        description: &str,
        cases: Option<Vec<(String, Arc<PropertySchema>)>>,
    ) -> Self {
        match kind.parse(default) {
            Ok(value) => self.push(name, kind, value, description, cases),
            Err(source) => {
                self.fail(PropertyError::InvalidValue {
                    name: name.to_owned(),
                    source,
                });
                self
            }
        }
    }

    fn push(
        mut self,
        name: &str,
        kind: PropertyKind,
        default: PropertyValue,
        description: &str,
        cases: Option<Vec<(String, Arc<PropertySchema>)>>,
    ) -> Self {
        if self.defs.iter().any(|d| d.name == name) {
            self.fail(PropertyError::Schema {
                schema: self.name.clone(),
                reason: format!("duplicate property '{name}'"),
            });
            return self;
        }
        self.defs.push(PropertyDef {
            name: name.to_owned(),
            kind,
            default,
            description: description.to_owned(),
            cases,
        });
        self
    }

    fn fail(&mut self, err: PropertyError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn declaration_order_is_preserved() {
        let schema = PropertySchema::builder("test")
            .int("b", 1, "second letter")
            .bool("a", true, "first letter")
            .build()
            .unwrap();
        let names: Vec<&str> = schema.defs().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(schema.position("a"), Some(1));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = PropertySchema::builder("test")
            .int("x", 1, "")
            .float("x", 1.0, "")
            .build();
        assert!(matches!(result, Err(PropertyError::Schema { .. })));
    }

    #[test]
    fn default_tag_must_be_declared() {
        let result = PropertySchema::builder("test")
            .enumeration("mode", &["fast", "slow"], "medium", "")
            .build();
        assert!(matches!(result, Err(PropertyError::InvalidValue { .. })));
    }

    #[test]
    fn variant_cases_are_looked_up_by_tag() {
        let simple = PropertySchema::builder("simple").int("games", 10, "").build().unwrap();
        let schema = PropertySchema::builder("test")
            .variant("mode", vec![("simple", simple)], "simple", "")
            .build()
            .unwrap();
        let def = schema.def("mode").unwrap();
        assert_eq!(def.case("simple").map(|s| s.name()), Some("simple"));
        assert!(def.case("swiss").is_none());
    }
}
