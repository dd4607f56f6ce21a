//! Cluster utilization report
//!
//! Summarises per-workload statistics into cluster and namespace averages, ranks the heaviest
//! consumers and attaches the anomaly scan. When an inventory source is available the top
//! consumers are annotated with their declared limits.

use crate::aggregate::WorkloadStats;
use crate::anomaly::{AnomalyReport, SpikeDetector};
use crate::models::{ResourceConfig, WorkloadKey};
use crate::sources::InventorySource;
use crate::window::Window;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// Entries in each top-consumer ranking
pub const TOP_CONSUMERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub workloads: usize,
    /// Mean of the per-workload CPU means
    pub cpu_mean: f64,
    /// Mean of the per-workload memory means
    pub memory_mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceUtilization {
    pub namespace: String,
    pub workloads: usize,
    pub cpu_mean: f64,
    pub memory_mean: f64,
}

/// A workload ranked by its peak usage of one resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopConsumer {
    pub key: WorkloadKey,
    pub peak: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization_percent: Option<f64>,
}

impl TopConsumer {
    fn annotate(&mut self, limit: u64) {
        if limit > 0 {
            self.limit = Some(limit);
            self.utilization_percent = Some(100.0 * self.peak as f64 / limit as f64);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilizationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<String>,
    pub summary: ClusterSummary,
    pub namespaces: Vec<NamespaceUtilization>,
    pub top_cpu: Vec<TopConsumer>,
    pub top_memory: Vec<TopConsumer>,
    pub anomalies: AnomalyReport,
    /// Whether declared limits could be looked up
    pub limits_annotated: bool,
}

impl UtilizationReport {
    /// Build the report without contacting the cluster
    pub fn from_stats(stats: &[WorkloadStats], window: Option<Window>) -> Self {
        Self {
            window: window.map(|w| w.to_string()),
            summary: summarize(stats),
            namespaces: by_namespace(stats),
            top_cpu: rank(stats, |s| s.cpu_max),
            top_memory: rank(stats, |s| s.memory_max),
            anomalies: SpikeDetector::default().scan(stats),
            limits_annotated: false,
        }
    }

    /// Build the report and annotate the top consumers with their declared limits
    pub async fn build(
        stats: &[WorkloadStats],
        window: Option<Window>,
        inventory: Option<&dyn InventorySource>,
    ) -> Self {
        let mut report = Self::from_stats(stats, window);
        if let Some(inventory) = inventory {
            report.annotate_limits(inventory).await;
        }
        report
    }

    async fn annotate_limits(&mut self, inventory: &dyn InventorySource) {
        let mut configs: HashMap<WorkloadKey, Option<ResourceConfig>> = HashMap::new();

        for key in self.top_cpu.iter().chain(&self.top_memory).map(|c| &c.key) {
            if configs.contains_key(key) {
                continue;
            }
            let config = match inventory.get_resource_config(&key.namespace, &key.name).await {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!(workload = %key, error = %e, "Failed to read declared limits");
                    None
                }
            };
            configs.insert(key.clone(), config);
        }

        for consumer in &mut self.top_cpu {
            if let Some(Some(config)) = configs.get(&consumer.key) {
                consumer.annotate(config.limits.cpu_milli);
            }
        }
        for consumer in &mut self.top_memory {
            if let Some(Some(config)) = configs.get(&consumer.key) {
                consumer.annotate(config.limits.memory_mi);
            }
        }
        self.limits_annotated = true;
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn summarize(stats: &[WorkloadStats]) -> ClusterSummary {
    ClusterSummary {
        workloads: stats.len(),
        cpu_mean: average(stats.iter().map(|s| s.cpu_mean)),
        memory_mean: average(stats.iter().map(|s| s.memory_mean)),
    }
}

fn by_namespace(stats: &[WorkloadStats]) -> Vec<NamespaceUtilization> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&WorkloadStats>)> = Vec::new();
    for s in stats {
        let ns = s.key.namespace.as_str();
        match index.get(ns) {
            Some(&i) => groups[i].1.push(s),
            None => {
                index.insert(ns, groups.len());
                groups.push((ns, vec![s]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(ns, members)| NamespaceUtilization {
            namespace: ns.to_string(),
            workloads: members.len(),
            cpu_mean: average(members.iter().map(|s| s.cpu_mean)),
            memory_mean: average(members.iter().map(|s| s.memory_mean)),
        })
        .collect()
}

/// Top consumers by descending peak; ties keep input order
fn rank(stats: &[WorkloadStats], peak: impl Fn(&WorkloadStats) -> u64) -> Vec<TopConsumer> {
    let mut ranked: Vec<TopConsumer> = stats
        .iter()
        .map(|s| TopConsumer {
            key: s.key.clone(),
            peak: peak(s),
            limit: None,
            utilization_percent: None,
        })
        .collect();
    ranked.sort_by(|a, b| b.peak.cmp(&a.peak));
    ranked.truncate(TOP_CONSUMERS);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::GroupStats;
    use crate::models::{ResourceQuantities, WorkloadRef};
    use crate::sources::scripted::StaticInventory;

    fn stats(ns: &str, name: &str, cpu: (f64, u64), memory: (f64, u64)) -> WorkloadStats {
        GroupStats {
            key: WorkloadKey::new(ns, name),
            count: 3,
            observed: 3,
            cpu_mean: cpu.0,
            cpu_max: cpu.1,
            memory_mean: memory.0,
            memory_max: memory.1,
        }
    }

    fn sample_stats() -> Vec<WorkloadStats> {
        vec![
            stats("ns1", "api", (100.0, 200), (256.0, 300)),
            stats("ns2", "db", (300.0, 900), (1024.0, 2000)),
            stats("ns1", "web", (50.0, 80), (128.0, 150)),
        ]
    }

    #[test]
    fn test_summary_is_mean_of_workload_means() {
        let report = UtilizationReport::from_stats(&sample_stats(), None);
        assert_eq!(report.summary.workloads, 3);
        assert_eq!(report.summary.cpu_mean, 150.0);
        assert_eq!(report.summary.memory_mean, 1408.0 / 3.0);
    }

    #[test]
    fn test_namespace_rollup() {
        let report = UtilizationReport::from_stats(&sample_stats(), None);
        assert_eq!(report.namespaces.len(), 2);
        assert_eq!(report.namespaces[0].namespace, "ns1");
        assert_eq!(report.namespaces[0].workloads, 2);
        assert_eq!(report.namespaces[0].cpu_mean, 75.0);
    }

    #[test]
    fn test_rankings_by_peak() {
        let report = UtilizationReport::from_stats(&sample_stats(), None);
        let cpu: Vec<String> = report.top_cpu.iter().map(|c| c.key.to_string()).collect();
        assert_eq!(cpu, vec!["ns2/db", "ns1/api", "ns1/web"]);
        assert_eq!(report.top_memory[0].peak, 2000);
        assert!(!report.limits_annotated);
    }

    #[test]
    fn test_rankings_capped_at_five() {
        let many: Vec<WorkloadStats> = (0..8)
            .map(|i| stats("ns", &format!("w{i}"), (1.0, i), (1.0, i)))
            .collect();
        let report = UtilizationReport::from_stats(&many, None);
        assert_eq!(report.top_cpu.len(), TOP_CONSUMERS);
        assert_eq!(report.top_cpu[0].peak, 7);
    }

    #[test]
    fn test_empty_report() {
        let report = UtilizationReport::from_stats(&[], None);
        assert_eq!(report.summary.workloads, 0);
        assert_eq!(report.summary.cpu_mean, 0.0);
        assert!(report.anomalies.is_clear());
    }

    #[tokio::test]
    async fn test_limits_annotation() {
        let inventory = StaticInventory::new(vec![WorkloadRef::new("ns2", "db", "Running")])
            .with_config(
                "ns2",
                "db",
                ResourceConfig {
                    requests: ResourceQuantities::default(),
                    limits: ResourceQuantities {
                        cpu_milli: 1800,
                        memory_mi: 0,
                    },
                },
            );

        let report = UtilizationReport::build(&sample_stats(), None, Some(&inventory)).await;
        assert!(report.limits_annotated);

        let db = &report.top_cpu[0];
        assert_eq!(db.limit, Some(1800));
        assert_eq!(db.utilization_percent, Some(50.0));

        // no memory limit declared, no config for the other workloads
        assert_eq!(report.top_memory[0].limit, None);
        assert_eq!(report.top_cpu[1].limit, None);
    }
}
