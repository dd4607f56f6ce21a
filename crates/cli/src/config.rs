//! Configuration management for the CLI
//!
//! Optional defaults live in `~/.config/podmon/config.json`; command-line flags win over them.

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Record log used when neither a flag nor the config file names one
pub const DEFAULT_LOG_PATH: &str = "/data/output.csv";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Record log to collect into and report from
    pub file: Option<PathBuf>,
    /// Price of one CPU core per hour
    pub cpu_price: Option<f64>,
    /// Price of one GiB of memory per hour
    pub mem_price: Option<f64>,
    /// Safety margin for recommendations, in percent
    pub margin: Option<u32>,
    /// Default output format
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Load configuration from the default location; a missing file yields defaults
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Record log path: explicit flag, then config file, then the built-in default
    pub fn log_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH))
    }

    /// Get the configuration file path
    fn config_path() -> Option<PathBuf> {
        let home = dirs_next::home_dir()?;
        Some(home.join(".config").join("podmon").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log_path(None), PathBuf::from(DEFAULT_LOG_PATH));
    }

    #[test]
    fn test_file_values_and_flag_precedence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"file": "/var/lib/podmon/usage.csv", "cpu_price": 0.03, "format": "json"}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.cpu_price, Some(0.03));
        assert_eq!(config.format, Some(OutputFormat::Json));
        assert_eq!(config.margin, None);
        assert_eq!(
            config.log_path(None),
            PathBuf::from("/var/lib/podmon/usage.csv")
        );
        assert_eq!(
            config.log_path(Some(PathBuf::from("other.csv"))),
            PathBuf::from("other.csv")
        );
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
