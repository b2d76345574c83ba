//! Framework settings loaded from YAML.
//!
//! Settings cover how the framework itself behaves (universe file
//! handling, seeding, fitness compression, log level). They are not part
//! of an experiment's configuration and never end up in a variation.
//!
//! Every section and field has a default, so an empty document (or no
//! document at all) yields a usable configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use darwin_db::UniverseConfig;

/// Errors that can occur when loading settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse settings YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The log level is not a valid filter directive.
    #[error("invalid log filter: {source}")]
    LogFilter {
        /// The underlying directive parse error.
        #[from]
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber is already installed.
    #[error("failed to install log subscriber: {reason}")]
    Subscriber {
        /// Why installation failed.
        reason: String,
    },
}

impl From<serde_yml::Error> for SettingsError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level framework settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FrameworkSettings {
    /// Universe file handling.
    #[serde(default)]
    pub universe: UniverseSettings,

    /// Evolution run settings.
    #[serde(default)]
    pub evolution: EvolutionSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl FrameworkSettings {
    /// Load settings from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `DARWIN_SEED` overrides `evolution.seed`
    /// - `DARWIN_LOG` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be read, or
    /// [`SettingsError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse settings from a YAML string, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, SettingsError> {
        let mut settings: Self = serde_yml::from_str(yaml)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env_overrides();
        settings
    }

    /// Apply `DARWIN_*` environment variable overrides.
    ///
    /// Unparsable values are ignored (with a warning) rather than
    /// replacing a valid setting.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DARWIN_SEED") {
            match val.trim().parse() {
                Ok(seed) => self.evolution.seed = seed,
                Err(_) => tracing::warn!(value = %val, "Ignored invalid DARWIN_SEED"),
            }
        }
        if let Ok(val) = std::env::var("DARWIN_LOG") {
            self.logging.level = val;
        }
    }
}

/// Universe file handling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UniverseSettings {
    /// How long to wait for a competing lock, in milliseconds.
    #[serde(default)]
    pub busy_timeout_ms: u64,

    /// Run an integrity check when opening a universe.
    #[serde(default = "default_quick_check")]
    pub quick_check: bool,
}

impl Default for UniverseSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 0,
            quick_check: default_quick_check(),
        }
    }
}

impl UniverseSettings {
    /// Connection options for the persistence layer.
    pub const fn universe_config(&self) -> UniverseConfig {
        UniverseConfig::new()
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .with_quick_check(self.quick_check)
    }
}

/// Evolution run settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvolutionSettings {
    /// Seed for the population and domain models.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Maximum relative deviation of compressed fitness curves.
    #[serde(default = "default_max_fitness_deviation")]
    pub max_fitness_deviation: f32,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            max_fitness_deviation: default_max_fitness_deviation(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// `tracing` filter directive (e.g. `"info"`, `"darwin_core=debug"`).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl LoggingSettings {
    /// Install the global `fmt` subscriber filtered by `level`.
    ///
    /// Meant for drivers and tools; the library itself only emits events.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::LogFilter`] for a malformed `level` and
    /// [`SettingsError::Subscriber`] if a subscriber is already installed.
    pub fn init_tracing(&self) -> Result<(), SettingsError> {
        let filter = EnvFilter::try_new(&self.level)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .map_err(|err| SettingsError::Subscriber {
                reason: err.to_string(),
            })
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_quick_check() -> bool {
    true
}

const fn default_seed() -> u64 {
    1
}

const fn default_max_fitness_deviation() -> f32 {
    darwin_trace::MAX_FITNESS_DEVIATION
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let settings: FrameworkSettings = serde_yml::from_str("{}").unwrap();
        assert_eq!(settings, FrameworkSettings::default());
        assert!(settings.universe.quick_check);
        assert_eq!(settings.evolution.max_fitness_deviation, 0.01);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let yaml = r"
universe:
  busy_timeout_ms: 250
evolution:
  seed: 42
";
        let settings: FrameworkSettings = serde_yml::from_str(yaml).unwrap();
        assert_eq!(settings.universe.busy_timeout_ms, 250);
        assert!(settings.universe.quick_check);
        assert_eq!(settings.evolution.seed, 42);
        assert_eq!(settings.evolution.max_fitness_deviation, 0.01);

        let config = settings.universe.universe_config();
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_yaml_is_reported() {
        assert!(matches!(
            FrameworkSettings::parse("universe: [unclosed"),
            Err(SettingsError::Yaml { .. })
        ));
    }

    #[test]
    fn malformed_log_level_is_rejected() {
        let logging = LoggingSettings {
            level: "darwin_core=loud".to_owned(),
        };
        assert!(matches!(
            logging.init_tracing(),
            Err(SettingsError::LogFilter { .. })
        ));
    }

    #[test]
    fn subscriber_is_installed_once() {
        let logging = LoggingSettings::default();
        let _ = logging.init_tracing();
        assert!(matches!(
            logging.init_tracing(),
            Err(SettingsError::Subscriber { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            FrameworkSettings::from_file(&dir.path().join("absent.yaml")),
            Err(SettingsError::Io { .. })
        ));
    }
}
