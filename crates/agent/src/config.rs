//! Daemon configuration
//!
//! Read from `POD_MONITOR_*` environment variables, e.g. `POD_MONITOR_INTERVAL_SECS=30` or
//! `POD_MONITOR_NAMESPACES=default,payments`.

use anyhow::{Context, Result};
use monitor_lib::LabelSelector;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "POD_MONITOR";

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Seconds between collection ticks
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Record log location
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Comma-separated namespaces; empty means all namespaces
    #[serde(default)]
    pub namespaces: String,

    /// Label filter in `k=v,k2=v2` form
    #[serde(default)]
    pub labels: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Explicit kubeconfig; in-cluster configuration is used otherwise
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Wait before the second usage query attempt
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_interval() -> u64 {
    10
}

fn default_output_path() -> PathBuf {
    PathBuf::from("/data/output.csv")
}

fn default_api_port() -> u16 {
    8080
}

fn default_retry_delay() -> u64 {
    1000
}

impl AgentConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an explicit variable map instead of the process environment
    pub fn load_from(vars: Option<HashMap<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(vars),
            )
            .build()
            .context("reading environment")?;

        let agent: AgentConfig = config
            .try_deserialize()
            .context("invalid POD_MONITOR_* configuration")?;
        agent.validate()?;
        Ok(agent)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            anyhow::bail!("POD_MONITOR_INTERVAL_SECS must be at least 1");
        }
        self.label_selector()?;
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn namespace_list(&self) -> Vec<String> {
        self.namespaces
            .split(',')
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(String::from)
            .collect()
    }

    pub fn label_selector(&self) -> Result<LabelSelector> {
        Ok(self.labels.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::load_from(vars(&[])).unwrap();
        assert_eq!(config.interval_secs, 10);
        assert_eq!(config.output_path, PathBuf::from("/data/output.csv"));
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        assert!(config.namespace_list().is_empty());
        assert!(config.label_selector().unwrap().is_empty());
        assert!(config.kubeconfig.is_none());
    }

    #[test]
    fn test_reads_prefixed_variables() {
        let config = AgentConfig::load_from(vars(&[
            ("POD_MONITOR_INTERVAL_SECS", "30"),
            ("POD_MONITOR_OUTPUT_PATH", "/tmp/usage.csv"),
            ("POD_MONITOR_NAMESPACES", "default, payments,"),
            ("POD_MONITOR_LABELS", "app=api,tier=backend"),
            ("POD_MONITOR_API_PORT", "9100"),
        ]))
        .unwrap();

        assert_eq!(config.interval(), Duration::from_secs(30));
        assert_eq!(config.output_path, PathBuf::from("/tmp/usage.csv"));
        assert_eq!(config.namespace_list(), vec!["default", "payments"]);
        assert_eq!(config.label_selector().unwrap().to_string(), "app=api,tier=backend");
        assert_eq!(config.api_port, 9100);
    }

    #[test]
    fn test_rejects_bad_labels() {
        assert!(AgentConfig::load_from(vars(&[("POD_MONITOR_LABELS", "app")])).is_err());
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(AgentConfig::load_from(vars(&[("POD_MONITOR_INTERVAL_SECS", "0")])).is_err());
    }
}
