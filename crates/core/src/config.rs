use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::activity::DEFAULT_RETENTION_DAYS;
use crate::error::{Error, Result};
use crate::logging::LogFormat;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "studylog.toml";

/// Root configuration structure for studylog.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Days of activity kept in the log
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Activity log used when `merge` gets no explicit path
    #[serde(default = "default_activity_log")]
    pub activity_log: PathBuf,

    /// Extraction settings
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the extractor finds the collection and writes its exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractConfig {
    /// Anki profile name
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Explicit profile directory; platform default when absent
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Directory for snapshot and review count exports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive for stderr output
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Stderr format: pretty, json or compact
    #[serde(default = "default_log_format")]
    pub format: String,

    /// `[logging.file]` section
    #[serde(default)]
    pub file: FileLoggingConfig,
}

/// `[logging.file]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileLoggingConfig {
    /// Write JSON logs to a daily rolling file
    #[serde(default)]
    pub enabled: bool,

    /// Filter directive for the file
    #[serde(default = "default_file_log_level")]
    pub level: String,
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_activity_log() -> PathBuf {
    PathBuf::from("activity_log.json")
}

fn default_profile() -> String {
    "User 1".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    LogFormat::Pretty.as_str().to_string()
}

fn default_file_log_level() -> String {
    "debug".to_string()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { profile: default_profile(), data_dir: None, output_dir: default_output_dir() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format(), file: FileLoggingConfig::default() }
    }
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self { enabled: false, level: default_file_log_level() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            retention_days: default_retention_days(),
            activity_log: default_activity_log(),
            extract: ExtractConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).map_err(|e| Error::Config(ConfigError::from(e).to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load from `path` if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() { Self::from_file(path) } else { Ok(Self::default()) }
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.retention_days == 0 {
            return Err(Error::Config(ConfigError::InvalidRetention(self.retention_days).to_string()));
        }

        if LogFormat::parse_str(&self.logging.format).is_none() {
            return Err(Error::Config(
                ConfigError::InvalidLogFormat(self.logging.format.clone()).to_string(),
            ));
        }

        if self.extract.profile.trim().is_empty() {
            return Err(Error::Config(ConfigError::EmptyProfile.to_string()));
        }

        Ok(())
    }

    /// Get example configuration (as a string)
    pub fn example() -> &'static str {
        r#"# studylog configuration

# Days of activity kept in the log
retention_days = 365
# Log file used when `merge` is given no path
activity_log = "activity_log.json"

[extract]
# Anki profile to read
profile = "User 1"
# Profile directory (optional, defaults to the platform's Anki2 directory)
# data_dir = "/home/me/.local/share/Anki2/User 1"
# Where snapshot_<date>.csv and review_counts.json are written
output_dir = "exports"

[logging]
# Filter directive, e.g. "warn" or "studylog=debug"
level = "warn"
# "pretty", "json" or "compact"
format = "pretty"

[logging.file]
enabled = false
level = "debug"
"#
    }
}

/// Configuration-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Retention must keep at least one day
    #[error("retention_days must be positive, got {0}")]
    InvalidRetention(u32),

    /// Unknown log format
    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),

    /// Blank profile name
    #[error("extract.profile cannot be empty")]
    EmptyProfile,

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlParse(err.to_string())
    }
}
