//! Application configuration for `tax-calc`.
//!
//! ```toml
//! [rules]
//! source = "database"          # builtin | file | database
//! path = "rules/2025.toml"     # used when source = "file"
//! tax_year = 2025              # omitted: the latest stored year
//!
//! [database]
//! backend = "sqlite"
//! connection_string = "sqlite://tax-rules.db"
//!
//! [logging]
//! level = "info"               # RUST_LOG wins when set
//! file = "tax-calc.log"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "tax-calc.toml";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {message}")]
    Io { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Parse(String),
}

/// Where the rule table comes from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RulesSource {
    /// The compiled-in Colombia 2025 table.
    #[default]
    Builtin,
    /// A TOML rule-table document.
    File,
    /// A rule-table repository.
    Database,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RulesConfig {
    pub source: RulesSource,
    pub path: Option<PathBuf>,
    pub tax_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: "sqlite://tax-rules.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub rules: RulesConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Values given on the command line. Each `Some` replaces the file value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub rules_source: Option<RulesSource>,
    pub rules_file: Option<PathBuf>,
    pub database: Option<String>,
    pub tax_year: Option<i32>,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads `explicit` if given, else [`DEFAULT_CONFIG_FILE`] from the
    /// working directory if present, else the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_path(path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_path(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Applies command-line values.
    ///
    /// A rules file or database URL given without an explicit source also
    /// selects that source.
    pub fn apply(
        &mut self,
        overrides: &ConfigOverrides,
    ) {
        if let Some(path) = &overrides.rules_file {
            self.rules.path = Some(path.clone());
            self.rules.source = RulesSource::File;
        }
        if let Some(url) = &overrides.database {
            self.database.connection_string = url.clone();
            if overrides.rules_file.is_none() {
                self.rules.source = RulesSource::Database;
            }
        }
        if let Some(source) = overrides.rules_source {
            self.rules.source = source;
        }
        if let Some(year) = overrides.tax_year {
            self.rules.tax_year = Some(year);
        }
        if let Some(path) = &overrides.log_file {
            self.logging.file = Some(path.clone());
        }
    }
}
