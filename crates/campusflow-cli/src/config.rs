//! Application configuration.
//!
//! Read from `config/default.toml` (or `--config`), then overridden by
//! environment variables.  `.env` is loaded before the overrides are applied.
//! A missing file yields the defaults; a malformed one is an error.
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [tracker]
//! history_capacity = 500
//! default_history_limit = 50
//!
//! [workflows]
//! admin_contacts = ["+15550199999"]
//! default_meeting_time = "Tomorrow 10am"
//! min_confidence = 0.5
//!
//! [data]
//! seed_path = "config/seed.json"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use campusflow_intent::ExecutorConfig;
use campusflow_kernel::TrackerConfig;

pub const ENV_LOG: &str = "CAMPUSFLOW_LOG";
pub const ENV_SEED: &str = "CAMPUSFLOW_SEED";
pub const ENV_ADMIN_CONTACTS: &str = "CAMPUSFLOW_ADMIN_CONTACTS";
pub const ENV_HISTORY_CAPACITY: &str = "CAMPUSFLOW_HISTORY_CAPACITY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub tracker: TrackerConfig,
    pub workflows: ExecutorConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// JSON seed for the data store; the demo roster when unset.
    pub seed_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load `path` and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse `path`, or return the defaults if it does not exist.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Apply `CAMPUSFLOW_*` overrides read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(level) = var(ENV_LOG) {
            self.logging.level = level;
        }
        if let Some(seed) = var(ENV_SEED) {
            self.data.seed_path = Some(PathBuf::from(seed));
        }
        if let Some(contacts) = var(ENV_ADMIN_CONTACTS) {
            self.workflows.admin_contacts = contacts
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(capacity) = var(ENV_HISTORY_CAPACITY) {
            let capacity: usize = capacity
                .trim()
                .parse()
                .with_context(|| format!("{ENV_HISTORY_CAPACITY} must be a number, got {capacity:?}"))?;
            anyhow::ensure!(capacity > 0, "{ENV_HISTORY_CAPACITY} must be at least 1");
            self.tracker.history_capacity = capacity;
        }
        Ok(())
    }

    /// Log the effective settings.
    pub fn log_summary(&self) {
        info!(
            level = %self.logging.level,
            history_capacity = self.tracker.history_capacity,
            admin_contacts = self.workflows.admin_contacts.len(),
            seed = ?self.data.seed_path,
            "configuration loaded"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tracker.history_capacity, 500);
        assert_eq!(config.workflows.min_confidence, 0.5);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
            [workflows]
            admin_contacts = ["+15550199999"]

            [tracker]
            history_capacity = 10
            "#,
        );
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.workflows.admin_contacts, vec!["+15550199999"]);
        assert_eq!(config.workflows.default_meeting_time, "Tomorrow 10am");
        assert_eq!(config.tracker.history_capacity, 10);
        assert_eq!(config.tracker.default_history_limit, 50);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = write_config("[tracker\nhistory_capacity = ");
        assert!(AppConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_LOG, "debug"),
            (ENV_SEED, "/tmp/seed.json"),
            (ENV_ADMIN_CONTACTS, "+1555, ,+1666"),
            (ENV_HISTORY_CAPACITY, "42"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.data.seed_path, Some(PathBuf::from("/tmp/seed.json")));
        assert_eq!(config.workflows.admin_contacts, vec!["+1555", "+1666"]);
        assert_eq!(config.tracker.history_capacity, 42);
    }

    #[test]
    fn bad_capacity_is_an_error() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|name| {
            (name == ENV_HISTORY_CAPACITY).then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn zero_capacity_is_an_error() {
        let mut config = AppConfig::default();
        let result =
            config.apply_env(|name| (name == ENV_HISTORY_CAPACITY).then(|| "0".to_string()));
        assert!(result.is_err());
        assert_eq!(config.tracker.history_capacity, 500);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(|_| Some("  ".to_string())).unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
