//! Grouping of record-log samples into per-workload and per-namespace statistics

use crate::models::{Sample, WorkloadKey};
use crate::window::Window;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Mean of the present values; `0.0` when none are present
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = Option<u64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0f64, 0u64), |(sum, count), v| (sum + v as f64, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Largest present value; `0` when none are present
pub fn max<I>(values: I) -> u64
where
    I: IntoIterator<Item = Option<u64>>,
{
    values.into_iter().flatten().max().unwrap_or(0)
}

/// Usage statistics over one partition of samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats<K> {
    pub key: K,
    /// All samples in the partition, whatever their status
    pub count: usize,
    /// Samples that carried usage values
    pub observed: usize,
    pub cpu_mean: f64,
    pub cpu_max: u64,
    pub memory_mean: f64,
    pub memory_max: u64,
}

pub type WorkloadStats = GroupStats<WorkloadKey>;
pub type NamespaceStats = GroupStats<String>;

impl<K> GroupStats<K> {
    fn from_samples(key: K, samples: &[&Sample]) -> Self {
        Self {
            key,
            count: samples.len(),
            observed: samples.iter().filter(|s| s.usage().is_some()).count(),
            cpu_mean: mean(samples.iter().map(|s| s.cpu_milli())),
            cpu_max: max(samples.iter().map(|s| s.cpu_milli())),
            memory_mean: mean(samples.iter().map(|s| s.memory_mi())),
            memory_max: max(samples.iter().map(|s| s.memory_mi())),
        }
    }
}

/// Groups samples, optionally restricted to a trailing window ending at `now`
#[derive(Debug, Clone)]
pub struct Aggregator {
    window: Option<Window>,
    now: DateTime<Utc>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            window: None,
            now: Utc::now(),
        }
    }

    pub fn with_window(mut self, window: Option<Window>) -> Self {
        self.window = window;
        self
    }

    /// Evaluate the window relative to a fixed instant instead of the current time
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn window(&self) -> Option<Window> {
        self.window
    }

    /// Whether a sample falls inside the window (`timestamp >= now - window`)
    pub fn includes(&self, sample: &Sample) -> bool {
        match self.window {
            Some(window) => sample.timestamp >= window.cutoff(self.now),
            None => true,
        }
    }

    /// Statistics per `(namespace, name)`, in first-seen order
    pub fn group_by_workload(&self, samples: &[Sample]) -> Vec<WorkloadStats> {
        self.group_by(samples, Sample::key)
    }

    /// Statistics per namespace over all of its samples, in first-seen order
    pub fn group_by_namespace(&self, samples: &[Sample]) -> Vec<NamespaceStats> {
        self.group_by(samples, |s| s.namespace.clone())
    }

    fn group_by<K, F>(&self, samples: &[Sample], key_of: F) -> Vec<GroupStats<K>>
    where
        K: Eq + Hash + Clone,
        F: Fn(&Sample) -> K,
    {
        let mut index: HashMap<K, usize> = HashMap::new();
        let mut partitions: Vec<(K, Vec<&Sample>)> = Vec::new();

        for sample in samples.iter().filter(|s| self.includes(s)) {
            let key = key_of(sample);
            match index.get(&key) {
                Some(&i) => partitions[i].1.push(sample),
                None => {
                    index.insert(key.clone(), partitions.len());
                    partitions.push((key, vec![sample]));
                }
            }
        }

        partitions
            .into_iter()
            .map(|(key, members)| GroupStats::from_samples(key, &members))
            .collect()
    }
}
