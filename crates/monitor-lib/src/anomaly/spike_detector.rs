//! Peak-to-mean spike detection
//!
//! A resource spikes when its peak is both large in absolute terms and more than a fixed
//! multiple of its mean over the analysed samples.

use crate::aggregate::WorkloadStats;
use serde::Serialize;
use std::fmt;

/// Samples a workload needs before it is considered at all, whatever their status
pub const MIN_SAMPLES_FOR_DETECTION: usize = 10;

const DEFAULT_RATIO_THRESHOLD: f64 = 3.0;
const DEFAULT_CPU_FLOOR_MILLI: u64 = 500;
const DEFAULT_MEMORY_FLOOR_MI: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Cpu,
    Memory,
}

impl Resource {
    pub fn unit(&self) -> &'static str {
        match self {
            Resource::Cpu => "m",
            Resource::Memory => "Mi",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Cpu => f.write_str("CPU"),
            Resource::Memory => f.write_str("Memory"),
        }
    }
}

/// One flagged resource of a workload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spike {
    pub resource: Resource,
    pub mean: f64,
    pub max: u64,
    /// `max / mean`
    pub ratio: f64,
}

impl fmt::Display for Spike {
    /// `CPU: 127m -> 900m (x7.1)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.resource.unit();
        write!(
            f,
            "{}: {:.0}{} -> {}{} (x{:.1})",
            self.resource, self.mean, unit, self.max, unit, self.ratio
        )
    }
}

/// Detects peak-to-mean spikes in per-workload statistics
#[derive(Debug, Clone)]
pub struct SpikeDetector {
    /// Peak must exceed this multiple of the mean
    pub ratio_threshold: f64,
    /// Peak CPU must exceed this many millicores
    pub cpu_floor_milli: u64,
    /// Peak memory must exceed this many MiB
    pub memory_floor_mi: u64,
    pub min_samples: usize,
}

impl Default for SpikeDetector {
    fn default() -> Self {
        Self {
            ratio_threshold: DEFAULT_RATIO_THRESHOLD,
            cpu_floor_milli: DEFAULT_CPU_FLOOR_MILLI,
            memory_floor_mi: DEFAULT_MEMORY_FLOOR_MI,
            min_samples: MIN_SAMPLES_FOR_DETECTION,
        }
    }
}

impl SpikeDetector {
    /// Spikes of one workload, CPU before memory
    ///
    /// Empty when the workload has too few samples.
    pub fn detect(&self, stats: &WorkloadStats) -> Vec<Spike> {
        if stats.count < self.min_samples {
            return Vec::new();
        }

        [
            self.check(Resource::Cpu, stats.cpu_mean, stats.cpu_max, self.cpu_floor_milli),
            self.check(
                Resource::Memory,
                stats.memory_mean,
                stats.memory_max,
                self.memory_floor_mi,
            ),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn check(&self, resource: Resource, mean: f64, max: u64, floor: u64) -> Option<Spike> {
        if max <= floor || mean <= 0.0 {
            return None;
        }

        let ratio = max as f64 / mean;
        (ratio > self.ratio_threshold).then_some(Spike {
            resource,
            mean,
            max,
            ratio,
        })
    }
}
