//! Core data models for the pod usage monitor

use crate::error::MonitorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Phase reported for pods that are actively running
pub const RUNNING_PHASE: &str = "Running";

/// Identity of a workload: `(namespace, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadKey {
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Why a sample does or does not carry usage values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "lowercase")]
pub enum SampleStatus {
    Ok,
    /// Workload was not running; carries its phase
    Skip(String),
    /// Usage could not be fetched; carries the last failure reason
    Error(String),
}

impl SampleStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, SampleStatus::Ok)
    }
}

impl fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleStatus::Ok => f.write_str("OK"),
            SampleStatus::Skip(phase) => write!(f, "SKIP: status={}", phase),
            SampleStatus::Error(reason) => write!(f, "ERROR: {}", reason),
        }
    }
}

impl FromStr for SampleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "OK" {
            return Ok(SampleStatus::Ok);
        }
        if let Some(rest) = s.strip_prefix("SKIP:") {
            let rest = rest.trim();
            let phase = rest.strip_prefix("status=").unwrap_or(rest);
            return Ok(SampleStatus::Skip(phase.to_string()));
        }
        if let Some(reason) = s.strip_prefix("ERROR:") {
            return Ok(SampleStatus::Error(reason.trim().to_string()));
        }
        Err(format!("unknown status {:?}", s))
    }
}

/// Instantaneous usage of one workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub cpu_milli: u64,
    pub memory_mi: u64,
}

/// One observation of a workload at a polling tick
///
/// Usage values are present exactly when the status is `OK`; the constructors are the only
/// way to build a sample so the pairing cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub namespace: String,
    pub workload_name: String,
    usage: Option<Usage>,
    status: SampleStatus,
}

impl Sample {
    /// Sample with observed usage
    pub fn ok(timestamp: DateTime<Utc>, key: &WorkloadKey, usage: Usage) -> Self {
        Self {
            timestamp,
            namespace: key.namespace.clone(),
            workload_name: key.name.clone(),
            usage: Some(usage),
            status: SampleStatus::Ok,
        }
    }

    /// Sample for a workload that was not running
    pub fn skipped(timestamp: DateTime<Utc>, key: &WorkloadKey, phase: impl Into<String>) -> Self {
        Self {
            timestamp,
            namespace: key.namespace.clone(),
            workload_name: key.name.clone(),
            usage: None,
            status: SampleStatus::Skip(phase.into()),
        }
    }

    /// Sample for a workload whose usage could not be fetched
    pub fn failed(timestamp: DateTime<Utc>, key: &WorkloadKey, reason: impl Into<String>) -> Self {
        Self {
            timestamp,
            namespace: key.namespace.clone(),
            workload_name: key.name.clone(),
            usage: None,
            status: SampleStatus::Error(reason.into()),
        }
    }

    pub fn key(&self) -> WorkloadKey {
        WorkloadKey::new(&self.namespace, &self.workload_name)
    }

    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    pub fn cpu_milli(&self) -> Option<u64> {
        self.usage.map(|u| u.cpu_milli)
    }

    pub fn memory_mi(&self) -> Option<u64> {
        self.usage.map(|u| u.memory_mi)
    }

    pub fn status(&self) -> &SampleStatus {
        &self.status
    }
}

/// A workload as listed by the inventory source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub key: WorkloadKey,
    pub phase: String,
}

impl WorkloadRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, phase: impl Into<String>) -> Self {
        Self {
            key: WorkloadKey::new(namespace, name),
            phase: phase.into(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == RUNNING_PHASE
    }
}

/// CPU and memory amounts summed over a pod's containers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuantities {
    pub cpu_milli: u64,
    pub memory_mi: u64,
}

/// Declared requests and limits of a workload at query time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub requests: ResourceQuantities,
    pub limits: ResourceQuantities,
}

/// Equality-based label filter, rendered as `k=v,k2=v2`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0.iter().all(|(k, v)| labels.get(k) == Some(v))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for LabelSelector {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut selector = LabelSelector::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| MonitorError::InvalidSelector {
                input: s.to_string(),
                reason: format!("expected key=value, got {:?}", pair),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(MonitorError::InvalidSelector {
                    input: s.to_string(),
                    reason: "empty label key".to_string(),
                });
            }
            selector.0.insert(key.to_string(), value.trim().to_string());
        }
        Ok(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_matches_log_format() {
        assert_eq!(SampleStatus::Ok.to_string(), "OK");
        assert_eq!(
            SampleStatus::Skip("Pending".into()).to_string(),
            "SKIP: status=Pending"
        );
        assert_eq!(
            SampleStatus::Error("connection refused".into()).to_string(),
            "ERROR: connection refused"
        );
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("OK".parse::<SampleStatus>().unwrap(), SampleStatus::Ok);
        assert_eq!(
            "SKIP: status=Succeeded".parse::<SampleStatus>().unwrap(),
            SampleStatus::Skip("Succeeded".into())
        );
        assert_eq!(
            "ERROR: pods \"x\" not found".parse::<SampleStatus>().unwrap(),
            SampleStatus::Error("pods \"x\" not found".into())
        );
        assert!("WAT".parse::<SampleStatus>().is_err());
    }

    #[test]
    fn test_sample_constructors_keep_usage_and_status_paired() {
        let key = WorkloadKey::new("ns1", "app");
        let now = Utc::now();

        let ok = Sample::ok(now, &key, Usage { cpu_milli: 10, memory_mi: 20 });
        assert!(ok.status().is_ok());
        assert_eq!(ok.cpu_milli(), Some(10));

        let skipped = Sample::skipped(now, &key, "Pending");
        assert_eq!(skipped.usage(), None);

        let failed = Sample::failed(now, &key, "boom");
        assert_eq!(failed.memory_mi(), None);
        assert_eq!(failed.key(), key);
    }

    #[test]
    fn test_label_selector_round_trip() {
        let selector: LabelSelector = "app=web, tier=frontend".parse().unwrap();
        assert_eq!(selector.to_string(), "app=web,tier=frontend");

        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "web".to_string());
        assert!(!selector.matches(&labels));
        labels.insert("tier".to_string(), "frontend".to_string());
        assert!(selector.matches(&labels));
    }

    #[test]
    fn test_label_selector_rejects_bare_key() {
        assert!("app".parse::<LabelSelector>().is_err());
        assert!("=web".parse::<LabelSelector>().is_err());
        assert!("".parse::<LabelSelector>().unwrap().is_empty());
    }
}
