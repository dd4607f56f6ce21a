//! Right-sizing recommendations
//!
//! Requests are derived from mean usage and limits from peak usage, each padded by a safety
//! margin. The currently declared configuration is looked up per workload for comparison.

use crate::aggregate::WorkloadStats;
use crate::models::{ResourceConfig, ResourceQuantities, WorkloadKey};
use crate::sources::InventorySource;
use serde::Serialize;
use tracing::warn;

pub const DEFAULT_MARGIN_PERCENT: u32 = 20;

/// `floor(value * (1 + margin/100)) + 1`, never below 1
pub fn recommend(value: f64, margin_percent: u32) -> u64 {
    let padded = value.max(0.0) * (1.0 + f64::from(margin_percent) / 100.0);
    padded.floor() as u64 + 1
}

/// Declared configuration of a workload, if it could be read
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CurrentConfig {
    Available(ResourceConfig),
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub key: WorkloadKey,
    pub cpu_mean: f64,
    pub cpu_max: u64,
    pub memory_mean: f64,
    pub memory_max: u64,
    pub requests: ResourceQuantities,
    pub limits: ResourceQuantities,
    pub current: CurrentConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct Optimizer {
    margin_percent: u32,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(DEFAULT_MARGIN_PERCENT)
    }
}

impl Optimizer {
    pub fn new(margin_percent: u32) -> Self {
        Self { margin_percent }
    }

    pub fn margin_percent(&self) -> u32 {
        self.margin_percent
    }

    /// Recommendation for one workload given its current configuration
    pub fn recommend(&self, stats: &WorkloadStats, current: CurrentConfig) -> Recommendation {
        Recommendation {
            key: stats.key.clone(),
            cpu_mean: stats.cpu_mean,
            cpu_max: stats.cpu_max,
            memory_mean: stats.memory_mean,
            memory_max: stats.memory_max,
            requests: ResourceQuantities {
                cpu_milli: recommend(stats.cpu_mean, self.margin_percent),
                memory_mi: recommend(stats.memory_mean, self.margin_percent),
            },
            limits: ResourceQuantities {
                cpu_milli: recommend(stats.cpu_max as f64, self.margin_percent),
                memory_mi: recommend(stats.memory_max as f64, self.margin_percent),
            },
            current,
        }
    }

    /// Recommendations for every workload, sorted by key
    ///
    /// Without an inventory source every workload reports its configuration as unavailable.
    /// A failed lookup affects only that workload.
    pub async fn plan(
        &self,
        stats: &[WorkloadStats],
        inventory: Option<&dyn InventorySource>,
    ) -> Vec<Recommendation> {
        let mut ordered: Vec<&WorkloadStats> = stats.iter().collect();
        ordered.sort_by(|a, b| a.key.cmp(&b.key));

        let mut recommendations = Vec::with_capacity(ordered.len());
        for stats in ordered {
            let current = match inventory {
                Some(inventory) => {
                    match inventory
                        .get_resource_config(&stats.key.namespace, &stats.key.name)
                        .await
                    {
                        Ok(config) => CurrentConfig::Available(config),
                        Err(e) => {
                            warn!(workload = %stats.key, error = %e, "Failed to read declared resources");
                            CurrentConfig::Unavailable {
                                reason: e.to_string(),
                            }
                        }
                    }
                }
                None => CurrentConfig::Unavailable {
                    reason: "cluster not reachable".to_string(),
                },
            };
            recommendations.push(self.recommend(stats, current));
        }
        recommendations
    }
}
