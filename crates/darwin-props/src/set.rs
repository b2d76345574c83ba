//! The property set: a reflective, sealable bag of typed values.
//!
//! # Design
//!
//! - **Shared storage**: a [`PropertySet`] is a handle (`Arc<RwLock<..>>`).
//!   Cloning it shares the same data, so a handle handed out to a caller
//!   keeps working after the owner that exposed it is dropped.
//! - **Variants**: a discriminator property owns one nested set per tag,
//!   all created up front. Changing the tag changes which nested set is
//!   active; the others keep their values and any handle to them stays
//!   readable.
//! - **Sealing**: while sealed, every mutation fails with
//!   [`PropertyError::Sealed`]. Sealing cascades to the active variant.
//! - **Atomic snapshots**: [`PropertySet::from_snapshot`] parses the whole
//!   snapshot (nested sets included) before applying any of it.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

use crate::error::PropertyError;
use crate::schema::{PropertyDef, PropertySchema};
use crate::value::{FromPropertyValue, PropertyKind, PropertyValue, ScalarInput, ValueError};

/// Snapshot key holding the selected tag of a variant discriminator.
pub const VARIANT_TAG_KEY: &str = "tag";

/// A shared handle to a set of typed properties.
#[derive(Debug, Clone)]
pub struct PropertySet {
    inner: Arc<RwLock<SetState>>,
}

#[derive(Debug)]
struct SetState {
    schema: Arc<PropertySchema>,
    values: Vec<PropertyValue>,
    /// Per property: the nested set of every case, for discriminators.
    cases: Vec<Option<Vec<(String, PropertySet)>>>,
    sealed: bool,
}

impl SetState {
    fn position(&self, name: &str) -> Result<usize, PropertyError> {
        self.schema.position(name).ok_or_else(|| PropertyError::NotFound {
            name: name.to_owned(),
        })
    }

    fn active_case(&self, index: usize) -> Option<&PropertySet> {
        let tag = self.values.get(index)?.format();
        self.cases
            .get(index)?
            .as_ref()?
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, set)| set)
    }

    fn active_cases(&self) -> Vec<PropertySet> {
        (0..self.values.len())
            .filter_map(|i| self.active_case(i).cloned())
            .collect()
    }

    fn all_cases(&self) -> Vec<PropertySet> {
        self.cases
            .iter()
            .flatten()
            .flat_map(|cases| cases.iter().map(|(_, set)| set.clone()))
            .collect()
    }

    fn sealed_error(&self) -> PropertyError {
        PropertyError::Sealed {
            set: self.schema.name().to_owned(),
        }
    }
}

/// A fully parsed snapshot, ready to be applied without failure.
struct Staged {
    values: Vec<PropertyValue>,
    nested: Vec<(PropertySet, Staged)>,
}

/// Description of a declared property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescription {
    /// Human-readable description.
    pub description: String,
    /// Declared kind.
    pub kind: PropertyKind,
    /// Default value.
    pub default: PropertyValue,
}

/// A property captured from a set at the moment it was requested.
///
/// Later changes to the set are not reflected; the handle keeps reporting
/// the value it was created with.
#[derive(Debug, Clone)]
pub struct Property {
    name: String,
    description: String,
    default: PropertyValue,
    value: PropertyValue,
    variant: Option<PropertySet>,
}

impl Property {
    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared default.
    pub const fn default_value(&self) -> &PropertyValue {
        &self.default
    }

    /// Captured value.
    pub const fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Nested set that was active when captured, for discriminators.
    pub const fn variant(&self) -> Option<&PropertySet> {
        self.variant.as_ref()
    }

    /// Cast the captured value to a native type.
    pub fn cast<T: FromPropertyValue>(&self) -> Result<T, ValueError> {
        self.value.cast()
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

impl PropertySet {
    /// Create a set holding the defaults of `schema`.
    pub fn new(schema: Arc<PropertySchema>) -> Self {
        let values = schema.defs().iter().map(|d| d.default.clone()).collect();
        let cases = schema
            .defs()
            .iter()
            .map(|def| {
                def.cases.as_ref().map(|cases| {
                    cases
                        .iter()
                        .map(|(tag, nested)| (tag.clone(), Self::new(Arc::clone(nested))))
                        .collect()
                })
            })
            .collect();
        Self {
            inner: Arc::new(RwLock::new(SetState {
                schema,
                values,
                cases,
                sealed: false,
            })),
        }
    }

    /// Schema this set was created from.
    pub fn schema(&self) -> Arc<PropertySchema> {
        Arc::clone(&self.read().schema)
    }

    /// Schema name.
    pub fn name(&self) -> String {
        self.read().schema.name().to_owned()
    }

    /// Whether two handles share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // -----------------------------------------------------------------------
    // Reflection
    // -----------------------------------------------------------------------

    /// Property names in declaration order.
    pub fn list_names(&self) -> Vec<String> {
        self.read()
            .schema
            .defs()
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }

    /// `(name, canonical value)` pairs in declaration order.
    pub fn entries(&self) -> Vec<(String, String)> {
        let state = self.read();
        state
            .schema
            .defs()
            .iter()
            .zip(&state.values)
            .map(|(def, value)| (def.name.clone(), value.format()))
            .collect()
    }

    /// Declared description, kind and default of a property.
    pub fn describe(&self, name: &str) -> Result<PropertyDescription, PropertyError> {
        let state = self.read();
        let def = state.schema.def(name).ok_or_else(|| PropertyError::NotFound {
            name: name.to_owned(),
        })?;
        Ok(PropertyDescription {
            description: def.description.clone(),
            kind: def.kind.clone(),
            default: def.default.clone(),
        })
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Current value of a property.
    pub fn get(&self, name: &str) -> Result<PropertyValue, PropertyError> {
        let state = self.read();
        let index = state.position(name)?;
        state
            .values
            .get(index)
            .cloned()
            .ok_or_else(|| PropertyError::NotFound {
                name: name.to_owned(),
            })
    }

    /// Current value of a property, cast to a native type.
    pub fn get_as<T: FromPropertyValue>(&self, name: &str) -> Result<T, PropertyError> {
        self.get(name)?
            .cast()
            .map_err(|source| PropertyError::InvalidValue {
                name: name.to_owned(),
                source,
            })
    }

    /// Capture a property (value, metadata and active variant).
    pub fn property(&self, name: &str) -> Result<Property, PropertyError> {
        let state = self.read();
        let index = state.position(name)?;
        let (def, value) = state
            .schema
            .defs()
            .get(index)
            .zip(state.values.get(index))
            .ok_or_else(|| PropertyError::NotFound {
                name: name.to_owned(),
            })?;
        Ok(Property {
            name: def.name.clone(),
            description: def.description.clone(),
            default: def.default.clone(),
            value: value.clone(),
            variant: state.active_case(index).cloned(),
        })
    }

    /// The active nested set of a variant discriminator.
    pub fn variant_of(&self, name: &str) -> Result<Self, PropertyError> {
        let state = self.read();
        let index = state.position(name)?;
        state
            .active_case(index)
            .cloned()
            .ok_or_else(|| PropertyError::NoVariant {
                name: name.to_owned(),
            })
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Parse `raw` and store it as the new value of `name`.
    ///
    /// On failure the stored value is left untouched.
    pub fn set(&self, name: &str, raw: &str) -> Result<(), PropertyError> {
        let mut state = self.write();
        if state.sealed {
            return Err(state.sealed_error());
        }
        let index = state.position(name)?;
        let schema = Arc::clone(&state.schema);
        let def = schema.defs().get(index).ok_or_else(|| PropertyError::NotFound {
            name: name.to_owned(),
        })?;
        let value = def
            .kind
            .parse(raw)
            .map_err(|source| PropertyError::InvalidValue {
                name: name.to_owned(),
                source,
            })?;

        tracing::debug!(
            set = schema.name(),
            property = name,
            value = %value,
            "Property updated"
        );

        if let Some(slot) = state.values.get_mut(index) {
            *slot = value;
        }
        Ok(())
    }

    /// Assign a native scalar through its canonical string form.
    pub fn assign<T: ScalarInput>(&self, name: &str, value: T) -> Result<(), PropertyError> {
        self.set(name, &value.to_raw())
    }

    /// Assign a value read from another property.
    pub fn set_value(&self, name: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        self.set(name, &value.format())
    }

    /// Restore every property (and the active variant) to its default.
    pub fn reset_to_defaults(&self) -> Result<(), PropertyError> {
        self.from_snapshot(&Value::Object(Map::new()))
    }

    // -----------------------------------------------------------------------
    // Sealing
    // -----------------------------------------------------------------------

    /// Whether mutations are currently rejected.
    pub fn is_sealed(&self) -> bool {
        self.read().sealed
    }

    /// Reject further mutations of this set and its active variants.
    pub fn seal(&self) {
        let active = {
            let mut state = self.write();
            state.sealed = true;
            state.active_cases()
        };
        for nested in active {
            nested.seal();
        }
    }

    /// Allow mutations again, including on every variant case.
    pub fn unseal(&self) {
        let cases = {
            let mut state = self.write();
            state.sealed = false;
            state.all_cases()
        };
        for nested in cases {
            nested.unseal();
        }
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Serialize the set (active variants included) as a JSON object of
    /// canonical strings.
    pub fn to_snapshot(&self) -> Value {
        let state = self.read();
        let mut map = Map::new();
        for (index, (def, value)) in state.schema.defs().iter().zip(&state.values).enumerate() {
            let entry = match state.active_case(index) {
                Some(nested) => {
                    let tag = value.format();
                    let mut variant = Map::new();
                    variant.insert(VARIANT_TAG_KEY.to_owned(), Value::String(tag.clone()));
                    variant.insert(tag, nested.to_snapshot());
                    Value::Object(variant)
                }
                None => Value::String(value.format()),
            };
            map.insert(def.name.clone(), entry);
        }
        Value::Object(map)
    }

    /// Replace the whole set from a snapshot.
    ///
    /// Properties missing from the snapshot take their defaults; unknown
    /// names are rejected. Either everything is applied or nothing is.
    pub fn from_snapshot(&self, snapshot: &Value) -> Result<(), PropertyError> {
        let staged = self.stage(snapshot)?;
        self.apply(staged);
        tracing::debug!(set = %self.name(), "Property set restored from snapshot");
        Ok(())
    }

    fn stage(&self, snapshot: &Value) -> Result<Staged, PropertyError> {
        let state = self.read();
        if state.sealed {
            return Err(state.sealed_error());
        }
        let set = state.schema.name();
        let object = snapshot.as_object().ok_or_else(|| PropertyError::Snapshot {
            set: set.to_owned(),
            reason: "expected a JSON object".to_owned(),
        })?;
        if let Some(unknown) = object.keys().find(|k| state.schema.position(k).is_none()) {
            return Err(PropertyError::Snapshot {
                set: set.to_owned(),
                reason: format!("unknown property '{unknown}'"),
            });
        }

        let mut values = Vec::with_capacity(state.values.len());
        let mut nested = Vec::new();
        for (def, cases) in state.schema.defs().iter().zip(&state.cases) {
            let entry = object.get(&def.name);
            match cases {
                Some(cases) => {
                    let (tag, staged_case) = stage_variant(set, def, cases, entry)?;
                    values.push(tag);
                    nested.push(staged_case);
                }
                None => values.push(match entry {
                    Some(raw) => parse_entry(set, def, raw)?,
                    None => def.default.clone(),
                }),
            }
        }
        Ok(Staged { values, nested })
    }

    fn apply(&self, staged: Staged) {
        self.write().values = staged.values;
        for (set, nested) in staged.nested {
            set.apply(nested);
        }
    }

    // -----------------------------------------------------------------------
    // Locking
    // -----------------------------------------------------------------------

    fn read(&self) -> RwLockReadGuard<'_, SetState> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered poisoned property set lock");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, SetState> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered poisoned property set lock");
            poisoned.into_inner()
        })
    }
}

fn parse_entry(set: &str, def: &PropertyDef, raw: &Value) -> Result<PropertyValue, PropertyError> {
    let text = match raw {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => {
            return Err(PropertyError::Snapshot {
                set: set.to_owned(),
                reason: format!("property '{}' must be a string", def.name),
            });
        }
    };
    def.kind
        .parse(&text)
        .map_err(|source| PropertyError::InvalidValue {
            name: def.name.clone(),
            source,
        })
}

fn stage_variant(
    set: &str,
    def: &PropertyDef,
    cases: &[(String, PropertySet)],
    entry: Option<&Value>,
) -> Result<(PropertyValue, (PropertySet, Staged)), PropertyError> {
    let empty = Value::Object(Map::new());
    let (tag, body) = match entry {
        None => (def.default.clone(), &empty),
        Some(Value::Object(variant)) => {
            let raw = variant.get(VARIANT_TAG_KEY).ok_or_else(|| PropertyError::Snapshot {
                set: set.to_owned(),
                reason: format!("variant '{}' has no '{VARIANT_TAG_KEY}'", def.name),
            })?;
            let tag = parse_entry(set, def, raw)?;
            let body = variant.get(&tag.format()).unwrap_or(&empty);
            (tag, body)
        }
        Some(_) => {
            return Err(PropertyError::Snapshot {
                set: set.to_owned(),
                reason: format!("variant '{}' must be an object", def.name),
            });
        }
    };

    let tag_text = tag.format();
    let case = cases
        .iter()
        .find(|(t, _)| *t == tag_text)
        .map(|(_, nested)| nested.clone())
        .ok_or_else(|| PropertyError::NoVariant {
            name: def.name.clone(),
        })?;
    let staged = case.stage(body)?;
    Ok((tag, (case, staged)))
}
