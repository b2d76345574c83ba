//! Typed, reflective property sets for the Darwin universe.
//!
//! Every configurable entity (population, domain, experiment) exposes its
//! settings as a [`PropertySet`]: a bag of named, typed, described and
//! defaulted values declared by a [`PropertySchema`]. Values travel as
//! canonical strings, which keeps them printable, diffable and stable in
//! persisted snapshots.
//!
//! # Architecture
//!
//! - [`value`] -- [`PropertyValue`], [`PropertyKind`] and the parse/format/cast rules
//! - [`schema`] -- [`PropertySchema`] and its [`SchemaBuilder`]
//! - [`set`] -- [`PropertySet`]: shared storage, variants, sealing, snapshots
//! - [`error`] -- [`PropertyError`]
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use darwin_props::{PropertySchema, PropertySet};
//!
//! let schema = PropertySchema::builder("unicycle")
//!     .float("gravity", 9.8, "Gravitational acceleration")
//!     .int("max_steps", 1000, "Maximum number of steps per episode")
//!     .build()?;
//! let config = PropertySet::new(Arc::new(schema));
//!
//! config.set("max_steps", "250")?;
//! assert_eq!(config.get("max_steps")?.format(), "250");
//!
//! config.seal();
//! assert!(config.set("max_steps", "10").is_err());
//! # Ok::<(), darwin_props::PropertyError>(())
//! ```

pub mod error;
pub mod schema;
pub mod set;
pub mod value;

pub use error::PropertyError;
pub use schema::{PropertyDef, PropertySchema, SchemaBuilder};
pub use set::{Property, PropertyDescription, PropertySet, VARIANT_TAG_KEY};
pub use value::{FromPropertyValue, PropertyKind, PropertyValue, ScalarInput, ValueError};
