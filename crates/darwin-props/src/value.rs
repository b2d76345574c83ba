//! Property values and their canonical string form.
//!
//! A [`PropertyValue`] is always representable as a canonical string,
//! and every mutation of a property goes through that string: parsing is
//! the only way in. [`PropertyKind::parse`] either produces a value or a
//! [`ValueError::Format`], and never touches the stored value.
//!
//! | kind   | canonical form        | accepted input                        |
//! |--------|-----------------------|---------------------------------------|
//! | bool   | `true` / `false`      | exactly `true` or `false`             |
//! | int    | `-12`                 | optional sign and decimal digits      |
//! | float  | `0.25`, `10`          | any finite decimal number             |
//! | string | verbatim              | anything                              |
//! | enum   | the tag               | one of the declared tags              |
//! | list   | `{ 1, 2, 3 }`         | brace-delimited, comma-separated      |

use std::fmt;

/// Errors produced when parsing or casting a property value.
///
/// Both variants are the "invalid value" family: the input was rejected
/// and nothing was truncated or coerced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// The input string is not a valid value of the target kind.
    #[error("invalid {kind} value '{input}': {reason}")]
    Format {
        /// Target kind name.
        kind: &'static str,
        /// The rejected input.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The value cannot be converted to the requested type.
    #[error("cannot cast {from} value '{value}' to {to}")]
    Cast {
        /// Kind of the stored value.
        from: &'static str,
        /// Canonical form of the stored value.
        value: String,
        /// Requested type.
        to: &'static str,
    },
}

impl ValueError {
    fn format(kind: &'static str, input: &str, reason: impl Into<String>) -> Self {
        Self::Format {
            kind,
            input: input.to_owned(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PropertyKind
// ---------------------------------------------------------------------------

/// The declared type of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    /// `true` or `false`.
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// Finite 64-bit float.
    Float,
    /// Free-form string.
    String,
    /// One tag out of a closed set.
    Enum(Vec<String>),
    /// Ordered sequence of scalars of the element kind.
    List(Box<Self>),
}

impl PropertyKind {
    /// Build an enum kind from a tag list.
    pub fn enumeration(tags: &[&str]) -> Self {
        Self::Enum(tags.iter().map(|t| (*t).to_owned()).collect())
    }

    /// Build a list kind with the given element kind.
    pub fn list(element: Self) -> Self {
        Self::List(Box::new(element))
    }

    /// Short name of the kind, used in error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
        }
    }

    /// Declared tags for an enum kind, empty otherwise.
    pub fn tags(&self) -> &[String] {
        match self {
            Self::Enum(tags) => tags,
            _ => &[],
        }
    }

    /// Parse a raw string into a value of this kind.
    pub fn parse(&self, raw: &str) -> Result<PropertyValue, ValueError> {
        let kind = self.name();
        match self {
            Self::Bool => match raw.trim() {
                "true" => Ok(PropertyValue::Bool(true)),
                "false" => Ok(PropertyValue::Bool(false)),
                _ => Err(ValueError::format(kind, raw, "expected 'true' or 'false'")),
            },
            Self::Int => raw
                .trim()
                .parse::<i64>()
                .map(PropertyValue::Int)
                .map_err(|e| ValueError::format(kind, raw, e.to_string())),
            Self::Float => {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| ValueError::format(kind, raw, e.to_string()))?;
                if value.is_finite() {
                    Ok(PropertyValue::Float(value))
                } else {
                    Err(ValueError::format(kind, raw, "value must be finite"))
                }
            }
            Self::String => Ok(PropertyValue::String(raw.to_owned())),
            Self::Enum(tags) => {
                let tag = raw.trim();
                if tags.iter().any(|t| t == tag) {
                    Ok(PropertyValue::Enum(tag.to_owned()))
                } else {
                    Err(ValueError::format(
                        kind,
                        raw,
                        format!("expected one of: {}", tags.join(", ")),
                    ))
                }
            }
            Self::List(element) => parse_list(element, raw),
        }
    }
}

fn parse_list(element: &PropertyKind, raw: &str) -> Result<PropertyValue, ValueError> {
    let inner = raw
        .trim()
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| ValueError::format("list", raw, "expected '{ v1, v2, ... }'"))?
        .trim();

    if inner.is_empty() {
        return Ok(PropertyValue::List(Vec::new()));
    }

    inner
        .split(',')
        .map(|item| {
            if item.trim().is_empty() {
                Err(ValueError::format("list", raw, "empty list element"))
            } else {
                element.parse(item)
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(PropertyValue::List)
}

// ---------------------------------------------------------------------------
// PropertyValue
// ---------------------------------------------------------------------------

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// Enum tag (validated against the declared set when parsed).
    Enum(String),
    /// List of scalars.
    List(Vec<Self>),
}

impl PropertyValue {
    /// Short name of the value's kind.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
        }
    }

    /// The canonical string form.
    pub fn format(&self) -> String {
        self.to_string()
    }

    /// Convert to a native type, see [`FromPropertyValue`].
    pub fn cast<T: FromPropertyValue>(&self) -> Result<T, ValueError> {
        T::from_property_value(self)
    }

    fn cast_error(&self, to: &'static str) -> ValueError {
        ValueError::Cast {
            from: self.kind_name(),
            value: self.format(),
            to,
        }
    }

    /// Numeric casts refuse tags and lists outright, everything else goes
    /// through the canonical string.
    fn numeric_text(&self, to: &'static str) -> Result<String, ValueError> {
        match self {
            Self::Enum(_) | Self::List(_) => Err(self.cast_error(to)),
            _ => Ok(self.format()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) | Self::Enum(v) => f.write_str(v),
            Self::List(items) => {
                if items.is_empty() {
                    return f.write_str("{ }");
                }
                f.write_str("{ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Casting
// ---------------------------------------------------------------------------

/// Native types a [`PropertyValue`] can be cast to.
pub trait FromPropertyValue: Sized {
    /// Perform the cast.
    fn from_property_value(value: &PropertyValue) -> Result<Self, ValueError>;
}

impl FromPropertyValue for bool {
    fn from_property_value(value: &PropertyValue) -> Result<Self, ValueError> {
        match value.format().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(value.cast_error("bool")),
        }
    }
}

impl FromPropertyValue for i64 {
    fn from_property_value(value: &PropertyValue) -> Result<Self, ValueError> {
        value
            .numeric_text("int")?
            .trim()
            .parse()
            .map_err(|_parse_error| value.cast_error("int"))
    }
}

impl FromPropertyValue for f64 {
    fn from_property_value(value: &PropertyValue) -> Result<Self, ValueError> {
        value
            .numeric_text("float")?
            .trim()
            .parse::<Self>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| value.cast_error("float"))
    }
}

impl FromPropertyValue for String {
    fn from_property_value(value: &PropertyValue) -> Result<Self, ValueError> {
        Ok(value.format())
    }
}

impl<T: FromPropertyValue> FromPropertyValue for Vec<T> {
    fn from_property_value(value: &PropertyValue) -> Result<Self, ValueError> {
        match value {
            PropertyValue::List(items) => items.iter().map(T::from_property_value).collect(),
            other => Err(other.cast_error("list")),
        }
    }
}

// ---------------------------------------------------------------------------
// Native assignment
// ---------------------------------------------------------------------------

/// Native scalars that can be assigned to a property.
///
/// The value is rendered to its canonical string and parsed by the target
/// kind. Collections deliberately do not implement this trait: a list
/// property only accepts the `{ ... }` string form.
pub trait ScalarInput {
    /// Canonical string form of the input.
    fn to_raw(&self) -> String;
}

macro_rules! scalar_input {
    ($($ty:ty),+) => {
        $(
            impl ScalarInput for $ty {
                fn to_raw(&self) -> String {
                    self.to_string()
                }
            }
        )+
    };
}

scalar_input!(bool, i32, i64, u32, f64, String);

impl ScalarInput for &str {
    fn to_raw(&self) -> String {
        (*self).to_owned()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn bool_requires_exact_tokens() {
        assert_eq!(PropertyKind::Bool.parse("true"), Ok(PropertyValue::Bool(true)));
        assert!(PropertyKind::Bool.parse("True").is_err());
        assert!(PropertyKind::Bool.parse("1").is_err());
        assert!(PropertyKind::Bool.parse("").is_err());
    }

    #[test]
    fn int_rejects_fractions_and_junk() {
        assert_eq!(PropertyKind::Int.parse(" -12 "), Ok(PropertyValue::Int(-12)));
        assert!(PropertyKind::Int.parse("0.5").is_err());
        assert!(PropertyKind::Int.parse("#0.15").is_err());
        assert!(PropertyKind::Int.parse("10x").is_err());
    }

    #[test]
    fn float_formats_shortest_form() {
        let v = PropertyKind::Float.parse("10.0").unwrap();
        assert_eq!(v.format(), "10");
        assert_eq!(PropertyKind::Float.parse("0.4").unwrap().format(), "0.4");
        assert!(PropertyKind::Float.parse("#0.15").is_err());
        assert!(PropertyKind::Float.parse("inf").is_err());
    }

    #[test]
    fn enum_rejects_unlisted_tag() {
        let kind = PropertyKind::enumeration(&["logistic", "tanh", "relu"]);
        assert_eq!(kind.parse("relu"), Ok(PropertyValue::Enum("relu".into())));
        let err = kind.parse("relu_blah").unwrap_err();
        assert!(matches!(err, ValueError::Format { kind: "enum", .. }));
    }

    #[test]
    fn list_requires_braces() {
        let kind = PropertyKind::list(PropertyKind::Int);
        let v = kind.parse("{10, 20,5}").unwrap();
        assert_eq!(v.format(), "{ 10, 20, 5 }");
        assert_eq!(kind.parse("{ }").unwrap().format(), "{ }");
        assert!(kind.parse("10, 20").is_err());
        assert!(kind.parse("{ 10, , 20 }").is_err());
        assert!(kind.parse("{ 10, x }").is_err());
    }

    #[test]
    fn enum_never_casts_to_numbers() {
        let board = PropertyValue::Enum("hexagon".into());
        assert!(matches!(board.cast::<i64>(), Err(ValueError::Cast { to: "int", .. })));
        assert!(board.cast::<f64>().is_err());
        assert_eq!(board.cast::<String>().unwrap(), "hexagon");
    }

    #[test]
    fn casts_go_through_canonical_text() {
        assert_eq!(PropertyValue::Float(10.0).cast::<i64>().unwrap(), 10);
        assert!(PropertyValue::Float(0.4).cast::<i64>().is_err());
        assert_eq!(PropertyValue::Int(3).cast::<f64>().unwrap(), 3.0);
        assert!(PropertyValue::String("#0.15".into()).cast::<f64>().is_err());
        assert!(PropertyValue::String("yes".into()).cast::<bool>().is_err());
        assert!(PropertyValue::Bool(true).cast::<bool>().unwrap());
        assert!(PropertyValue::Bool(true).cast::<i64>().is_err());
    }

    #[test]
    fn list_casts_element_wise() {
        let v = PropertyKind::list(PropertyKind::Int).parse("{ 1, 2 }").unwrap();
        assert_eq!(v.cast::<Vec<i64>>().unwrap(), vec![1, 2]);
        assert!(PropertyValue::Int(1).cast::<Vec<i64>>().is_err());
    }
}
