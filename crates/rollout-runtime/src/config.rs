use crate::{Error, Result};
use rollout_index::DEFAULT_SCAN_CAP;
use rollout_types::TtlConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "ROLLOUT_HOME";

/// Database file name inside the data directory
pub const DB_FILE_NAME: &str = "rollout.db";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve the data directory based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. ROLLOUT_HOME environment variable (with tilde expansion)
/// 3. XDG data directory
/// 4. ~/.rollout (fallback for systems without XDG)
pub fn resolve_data_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var(DATA_DIR_ENV) {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("rollout"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".rollout"));
    }

    Err(Error::Config(
        "Could not determine data directory: no HOME directory or XDG data directory found"
            .to_string(),
    ))
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Raw session rows one listing call may inspect
    #[serde(default = "default_scan_cap")]
    pub scan_cap: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            scan_cap: default_scan_cap(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Bounded command queue between recorder and writer task
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Upper bound on items coalesced into one transaction
    #[serde(default = "default_max_batch_items")]
    pub max_batch_items: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_batch_items: default_max_batch_items(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Retention for new sessions: a day count or "permanent"
    #[serde(default)]
    pub ttl_days: TtlConfig,
    /// Recorded as the session originator
    #[serde(default = "default_originator")]
    pub originator: String,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub writer: WriterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl_days: TtlConfig::default(),
            originator: default_originator(),
            listing: ListingConfig::default(),
            writer: WriterConfig::default(),
        }
    }
}

fn default_scan_cap() -> usize {
    DEFAULT_SCAN_CAP
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_batch_items() -> usize {
    512
}

fn default_originator() -> String {
    "rollout".to_string()
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `config.toml` inside a data directory
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.ttl_days, TtlConfig::Days(60));
        assert_eq!(config.listing.scan_cap, 100);
        assert_eq!(config.writer.queue_capacity, 256);
    }

    #[test]
    fn test_config_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = Config::path_in(temp_dir.path());

        let config = Config {
            ttl_days: TtlConfig::Permanent,
            originator: "ci".to_string(),
            ..Default::default()
        };

        config.save_to(&config_path)?;
        assert!(config_path.exists());

        let loaded = Config::load_from(&config_path)?;
        assert_eq!(loaded, config);

        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = Config::path_in(temp_dir.path());
        std::fs::write(&config_path, "ttl_days = 7\n\n[writer]\nmax_batch_items = 8\n")?;

        let loaded = Config::load_from(&config_path)?;
        assert_eq!(loaded.ttl_days, TtlConfig::Days(7));
        assert_eq!(loaded.writer.max_batch_items, 8);
        assert_eq!(loaded.writer.queue_capacity, 256);
        assert_eq!(loaded.originator, "rollout");

        Ok(())
    }

    #[test]
    fn test_load_nonexistent_returns_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path)?;
        assert_eq!(config, Config::default());

        Ok(())
    }

    #[test]
    fn test_explicit_data_dir_wins() -> Result<()> {
        let dir = resolve_data_dir(Some("/tmp/rollout-explicit"))?;
        assert_eq!(dir, PathBuf::from("/tmp/rollout-explicit"));
        Ok(())
    }
}
