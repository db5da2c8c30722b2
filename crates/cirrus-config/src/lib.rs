//! Cirrus configuration
//!
//! Settings live in `<workspace root>/config.yaml`, where the workspace
//! root is `$CIRRUS_HOME` when set and `~/.cirrus` otherwise. The same root
//! holds the blueprint documents, the resource tracker and the scan cache.

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the workspace root.
pub const ENV_HOME: &str = "CIRRUS_HOME";

const CONFIG_FILE: &str = "config.yaml";
const PROJECTS_DIR: &str = "projects";
const CACHE_DIR: &str = "cache";
const TRACKER_FILE: &str = "resources.json";

/// The workspace root directory.
pub fn workspace_root() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_HOME) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".cirrus"))
        .ok_or(ConfigError::HomeDirNotFound)
}

/// Directory holding one blueprint document per project.
pub fn blueprints_dir() -> Result<PathBuf> {
    Ok(workspace_root()?.join(PROJECTS_DIR))
}

/// Directory holding per-region scan results.
pub fn cache_dir() -> Result<PathBuf> {
    Ok(workspace_root()?.join(CACHE_DIR))
}

/// Path of the durable resource tracker file.
pub fn tracker_path() -> Result<PathBuf> {
    Ok(workspace_root()?.join(TRACKER_FILE))
}

/// Operator-tunable settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_region: String,

    /// Size of the listener worker pool.
    pub workers: usize,

    /// Bounded wait for a single provider call, in seconds.
    pub step_timeout_secs: u64,

    pub retry: RetrySettings,
    pub provider: ProviderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_region: "us-east-1".to_string(),
            workers: 4,
            step_timeout_secs: 300,
            retry: RetrySettings::default(),
            provider: ProviderSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the workspace root, falling back to defaults when
    /// no config file exists yet.
    pub fn load() -> Result<Self> {
        let path = workspace_root()?.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

/// In-step retry tuning for transient provider errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Named credentials profile handed to the provider.
    pub profile: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_workspace_root_env_override() {
        temp_env::with_var(ENV_HOME, Some("/tmp/cirrus-test"), || {
            assert_eq!(workspace_root().unwrap(), PathBuf::from("/tmp/cirrus-test"));
            assert_eq!(
                blueprints_dir().unwrap(),
                PathBuf::from("/tmp/cirrus-test/projects")
            );
            assert_eq!(
                tracker_path().unwrap(),
                PathBuf::from("/tmp/cirrus-test/resources.json")
            );
        });
    }

    #[test]
    fn test_defaults_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_var(ENV_HOME, Some(dir.path().as_os_str()), || {
            let settings = Settings::load().unwrap();
            assert_eq!(settings.workers, 4);
            assert_eq!(settings.default_region, "us-east-1");
            assert_eq!(settings.retry.max_attempts, 3);
        });
    }

    #[test]
    fn test_partial_config_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "default_region: eu-west-1\nworkers: 2\n",
        )
        .unwrap();
        temp_env::with_var(ENV_HOME, Some(dir.path().as_os_str()), || {
            let settings = Settings::load().unwrap();
            assert_eq!(settings.default_region, "eu-west-1");
            assert_eq!(settings.workers, 2);
            // Untouched sections keep their defaults.
            assert_eq!(settings.step_timeout_secs, 300);
            assert_eq!(settings.retry.backoff_multiplier, 2.0);
        });
    }
}
