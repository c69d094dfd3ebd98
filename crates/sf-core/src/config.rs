//! Configuration types and parsing for schemaflow.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file names searched in a project directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["schemaflow.yml", "schemaflow.yaml"];

/// Environment variable overriding [`Config::migrations_dir`].
pub const ENV_MIGRATIONS_DIR: &str = "SF_MIGRATIONS_DIR";
/// Environment variable overriding [`DatabaseConfig::path`].
pub const ENV_DATABASE_PATH: &str = "SF_DATABASE_PATH";
/// Environment variable overriding [`Config::ledger_table`].
pub const ENV_LEDGER_TABLE: &str = "SF_LEDGER_TABLE";

/// Project configuration from schemaflow.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory containing migration scripts, relative to the project root
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: String,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Name of the ledger table recording applied migrations
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,

    /// Cross-process migration lock settings
    #[serde(default)]
    pub lock: LockConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database file path, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

/// Migration lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Take the lease lock before mutating operations
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lease duration; a crashed holder's lock expires after this long
    #[serde(default = "default_lease_seconds")]
    pub lease_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            migrations_dir: default_migrations_dir(),
            database: DatabaseConfig::default(),
            ledger_table: default_ledger_table(),
            lock: LockConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lease_seconds: default_lease_seconds(),
        }
    }
}

fn default_migrations_dir() -> String {
    "migrations".to_string()
}

fn default_ledger_table() -> String {
    "schema_migrations".to_string()
}

fn default_db_path() -> String {
    ":memory:".to_string()
}

fn default_true() -> bool {
    true
}

fn default_lease_seconds() -> u64 {
    300
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                path: path.display().to_string(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory.
    ///
    /// Looks for schemaflow.yml or schemaflow.yaml and falls back to the
    /// defaults when neither exists.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        match CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
        {
            Some(path) => Self::load(&path),
            None => {
                log::debug!(
                    "No {} in {}, using defaults",
                    CONFIG_FILE_NAMES[0],
                    dir.display()
                );
                Ok(Self::default())
            }
        }
    }

    /// Apply `SF_*` overrides from the process environment
    pub fn with_env_overrides(self) -> CoreResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup, then re-validate.
    ///
    /// Empty values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(dir) = get(ENV_MIGRATIONS_DIR) {
            self.migrations_dir = dir;
        }
        if let Some(path) = get(ENV_DATABASE_PATH) {
            self.database.path = path;
        }
        if let Some(table) = get(ENV_LEDGER_TABLE) {
            self.ledger_table = table;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.migrations_dir.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations_dir cannot be empty".to_string(),
            });
        }

        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        if !is_valid_table_name(&self.ledger_table) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "ledger_table '{}' is not a valid table name (expected [schema.]identifier)",
                    self.ledger_table
                ),
            });
        }

        if self.lock.lease_seconds == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "lock.lease_seconds must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Get the absolute migrations directory relative to a project root
    pub fn migrations_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations_dir)
    }

    /// Lock lease as a [`Duration`]
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lock.lease_seconds)
    }
}

/// Check that `name` is a plain or schema-qualified SQL identifier.
///
/// Table names are interpolated into DDL, so only `[A-Za-z_][A-Za-z0-9_]*`
/// segments are accepted.
pub fn is_valid_table_name(name: &str) -> bool {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() > 2 {
        return false;
    }
    segments.iter().all(|seg| {
        let mut chars = seg.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
