//! Closed tag sets shared between configuration properties and records.
//!
//! Each enum here is also exposed as an enum-kind property in the
//! experiment configuration, so its canonical tag (see `as_str`) is the
//! exact string a user types and the exact string persisted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A string did not match any tag of a closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {set} tag '{tag}'")]
pub struct UnknownTagError {
    /// Name of the tag set.
    pub set: &'static str,
    /// The rejected input.
    pub tag: String,
}

/// Generates `as_str`, `TAGS`, `Display` and `FromStr` for a tag enum.
macro_rules! tag_enum {
    ($name:ident, $set:literal, { $($variant:ident => $tag:literal),+ $(,)? }) => {
        impl $name {
            /// Every canonical tag, in declaration order.
            pub const TAGS: &'static [&'static str] = &[$($tag),+];

            /// The canonical tag for this value.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $tag),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownTagError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok(Self::$variant),)+
                    other => Err(UnknownTagError {
                        set: $set,
                        tag: other.to_owned(),
                    }),
                }
            }
        }
    };
}

/// How much fitness information is recorded for each generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessInfoKind {
    /// Summary values only (best, median, worst).
    SamplesOnly,
    /// A piecewise-linear approximation of the ranked fitness curve.
    #[default]
    FullCompressed,
    /// Every ranked fitness value.
    FullRaw,
}

tag_enum!(FitnessInfoKind, "fitness_information", {
    SamplesOnly => "samples_only",
    FullCompressed => "full_compressed",
    FullRaw => "full_raw",
});

/// How much timing information is recorded for each generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileInfoKind {
    /// Total elapsed time only.
    #[default]
    GenerationOnly,
    /// Total elapsed time plus a breakdown per evolution stage.
    AllStages,
}

tag_enum!(ProfileInfoKind, "profile_information", {
    GenerationOnly => "generation_only",
    AllStages => "all_stages",
});

/// A coarse hint recorded with an experiment setup for downstream tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityHint {
    /// Smallest sensible configuration.
    Minimal,
    /// The default trade-off.
    #[default]
    Balanced,
    /// Larger, slower configuration.
    Extra,
}

tag_enum!(ComplexityHint, "complexity_hint", {
    Minimal => "minimal",
    Balanced => "balanced",
    Extra => "extra",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_back_to_their_variant() {
        for tag in FitnessInfoKind::TAGS {
            let kind: FitnessInfoKind = tag.parse().unwrap_or_default();
            assert_eq!(kind.as_str(), *tag);
        }
        assert_eq!("all_stages".parse(), Ok(ProfileInfoKind::AllStages));
    }

    #[test]
    fn unknown_tag_names_its_set() {
        let err = "huge".parse::<ComplexityHint>().err();
        assert_eq!(
            err.map(|e| e.to_string()).as_deref(),
            Some("unknown complexity_hint tag 'huge'")
        );
    }

    #[test]
    fn serde_uses_the_canonical_tag() {
        let json = serde_json::to_string(&FitnessInfoKind::FullRaw).ok();
        assert_eq!(json.as_deref(), Some("\"full_raw\""));
    }
}
