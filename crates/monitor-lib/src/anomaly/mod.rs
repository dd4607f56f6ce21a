//! Anomaly detection over aggregated usage
//!
//! Flags workloads whose peak CPU or memory is far above their mean. A run that flags
//! nothing yields [`AnomalyReport::Clear`], which callers render differently from an empty
//! result set.

mod spike_detector;

pub use spike_detector::{Resource, Spike, SpikeDetector, MIN_SAMPLES_FOR_DETECTION};

use crate::aggregate::WorkloadStats;
use crate::models::WorkloadKey;
use serde::Serialize;

/// A workload with at least one spiking resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadAnomaly {
    pub key: WorkloadKey,
    pub spikes: Vec<Spike>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "workloads", rename_all = "lowercase")]
pub enum AnomalyReport {
    /// No workload was flagged
    Clear,
    /// Flagged workloads sorted by key
    Flagged(Vec<WorkloadAnomaly>),
}

impl AnomalyReport {
    pub fn is_clear(&self) -> bool {
        matches!(self, AnomalyReport::Clear)
    }

    pub fn workloads(&self) -> &[WorkloadAnomaly] {
        match self {
            AnomalyReport::Clear => &[],
            AnomalyReport::Flagged(workloads) => workloads,
        }
    }
}

impl SpikeDetector {
    /// Run detection over every workload
    pub fn scan(&self, stats: &[WorkloadStats]) -> AnomalyReport {
        let mut flagged: Vec<WorkloadAnomaly> = stats
            .iter()
            .filter_map(|s| {
                let spikes = self.detect(s);
                (!spikes.is_empty()).then(|| WorkloadAnomaly {
                    key: s.key.clone(),
                    spikes,
                })
            })
            .collect();

        if flagged.is_empty() {
            return AnomalyReport::Clear;
        }
        flagged.sort_by(|a, b| a.key.cmp(&b.key));
        AnomalyReport::Flagged(flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::GroupStats;

    fn stats(name: &str, count: usize, cpu_mean: f64, cpu_max: u64) -> WorkloadStats {
        GroupStats {
            key: WorkloadKey::new("ns1", name),
            count,
            observed: count,
            cpu_mean,
            cpu_max,
            memory_mean: 100.0,
            memory_max: 100,
        }
    }

    #[test]
    fn test_clear_when_nothing_flagged() {
        let report = SpikeDetector::default().scan(&[stats("api", 20, 100.0, 150)]);
        assert!(report.is_clear());
        assert!(report.workloads().is_empty());
    }

    #[test]
    fn test_clear_on_empty_input() {
        assert_eq!(SpikeDetector::default().scan(&[]), AnomalyReport::Clear);
    }

    #[test]
    fn test_flagged_sorted_by_key() {
        let report = SpikeDetector::default().scan(&[
            stats("web", 11, 100.0, 900),
            stats("quiet", 11, 100.0, 120),
            stats("api", 11, 150.0, 1000),
            stats("young", 9, 100.0, 900),
        ]);

        let names: Vec<&str> = report.workloads().iter().map(|w| w.key.name.as_str()).collect();
        assert_eq!(names, vec!["api", "web"]);
        assert!(!report.is_clear());
    }
}
