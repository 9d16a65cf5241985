use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Settings read from `.gem-lockgraph.yml` in the project directory.
///
/// ```yaml
/// ---
/// ignore:
///   - bundler
/// strict: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    /// Gem names left out of reports.
    pub ignore: HashSet<String>,
    /// Treat parse diagnostics as a failure.
    pub strict: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("failed to read configuration {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid YAML in configuration: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl Configuration {
    pub const DEFAULT_FILE: &str = ".gem-lockgraph.yml";

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::from_yaml(&content)
    }

    /// Like [`Configuration::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound(_)) => {
                tracing::debug!(path = %path.display(), "no configuration file, using defaults");
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Parse configuration from YAML. Both keys are optional; a key set to
    /// `~` counts as absent.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let Value::Mapping(mapping) = serde_yaml::from_str::<Value>(yaml)? else {
            return Err(invalid("expected a YAML mapping, not a scalar or sequence"));
        };
        Ok(Configuration {
            ignore: ignore_list(&mapping)?,
            strict: strict_flag(&mapping)?,
        })
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::InvalidConfiguration(message.to_string())
}

fn ignore_list(mapping: &Mapping) -> Result<HashSet<String>, ConfigError> {
    match mapping.get("ignore") {
        None | Some(Value::Null) => Ok(HashSet::new()),
        Some(Value::Sequence(names)) => names
            .iter()
            .map(|name| {
                name.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid("'ignore' contains a non-String value"))
            })
            .collect(),
        Some(_) => Err(invalid("'ignore' must be an Array")),
    }
}

fn strict_flag(mapping: &Mapping) -> Result<bool, ConfigError> {
    match mapping.get("strict") {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(strict)) => Ok(*strict),
        Some(_) => Err(invalid("'strict' must be a Boolean")),
    }
}
