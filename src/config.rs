/// Configuration module for the ingestion core.
///
/// Handles loading, validating, and providing default limits for crawling,
/// segmentation, and orchestration.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ── Default value functions ──────────────────────────────────────────

fn default_batch_size() -> usize {
    50
}

fn default_fallback_chunk_chars() -> usize {
    1500
}

fn default_max_files() -> usize {
    10_000
}

fn default_max_repo_bytes() -> u64 {
    1 << 30 // 1 GiB
}

fn default_clone_timeout_secs() -> u64 {
    300
}

fn default_task_timeout_secs() -> u64 {
    1800
}

fn default_allowed_base_dir() -> PathBuf {
    PathBuf::from(".")
}

// ── Config struct ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Files handed to persistence per commit unit.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Character window for non-syntactic fallback segmentation.
    #[serde(default = "default_fallback_chunk_chars")]
    pub fallback_chunk_chars: usize,

    /// Crawl aborts when the repository holds more files than this.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Crawl aborts when candidate files sum to more bytes than this.
    #[serde(default = "default_max_repo_bytes")]
    pub max_repo_bytes: u64,

    #[serde(default = "default_clone_timeout_secs")]
    pub clone_timeout_secs: u64,

    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Local ingestion paths must resolve beneath this directory.
    #[serde(default = "default_allowed_base_dir")]
    pub allowed_base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            fallback_chunk_chars: default_fallback_chunk_chars(),
            max_files: default_max_files(),
            max_repo_bytes: default_max_repo_bytes(),
            clone_timeout_secs: default_clone_timeout_secs(),
            task_timeout_secs: default_task_timeout_secs(),
            allowed_base_dir: default_allowed_base_dir(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If the file does not exist, returns a default config. Invalid JSON
    /// also falls back to defaults with a warning, so a broken config file
    /// never blocks ingestion.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "ingest.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.batch_size > 0, "batch_size must be positive");
        anyhow::ensure!(
            self.fallback_chunk_chars > 0,
            "fallback_chunk_chars must be positive"
        );
        anyhow::ensure!(self.max_files > 0, "max_files must be positive");
        anyhow::ensure!(self.max_repo_bytes > 0, "max_repo_bytes must be positive");
        anyhow::ensure!(
            self.clone_timeout_secs > 0,
            "clone_timeout_secs must be positive"
        );
        anyhow::ensure!(
            self.task_timeout_secs > 0,
            "task_timeout_secs must be positive"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.fallback_chunk_chars, 1500);
        assert_eq!(config.max_files, 10_000);
        assert_eq!(config.max_repo_bytes, 1 << 30);
        assert_eq!(config.clone_timeout_secs, 300);
        assert_eq!(config.task_timeout_secs, 1800);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"batch_size": 10, "fallback_chunk_chars": 800}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.fallback_chunk_chars, 800);
        // Other fields should have defaults
        assert_eq!(config.max_files, 10_000);
        assert_eq!(config.clone_timeout_secs, 300);
    }

    #[test]
    fn test_validate_ok() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bad_batch_size() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_window() {
        let config = Config {
            fallback_chunk_chars: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.batch_size, config.batch_size);
        assert_eq!(parsed.max_repo_bytes, config.max_repo_bytes);
    }
}
