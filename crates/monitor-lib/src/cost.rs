//! Cost model
//!
//! Prices mean usage: CPU per core-hour on `mean_cpu_milli / 1000` and memory per GiB-hour on
//! `mean_memory_mi / 1024`. Monthly figures assume 720 hours.

use crate::aggregate::WorkloadStats;
use crate::models::WorkloadKey;
use serde::Serialize;
use std::collections::HashMap;

pub const HOURS_PER_MONTH: f64 = 720.0;

const MILLI_PER_CORE: f64 = 1000.0;
const MI_PER_GI: f64 = 1024.0;

/// Default price of one CPU core for one hour, in dollars
pub const DEFAULT_CPU_PRICE: f64 = 0.02;

/// Default price of one GiB of memory for one hour, in dollars
pub const DEFAULT_MEMORY_PRICE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostModel {
    pub cpu_price_per_core_hour: f64,
    pub memory_price_per_gib_hour: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self::new(DEFAULT_CPU_PRICE, DEFAULT_MEMORY_PRICE)
    }
}

/// Hourly cost split into its CPU and memory parts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HourlyCost {
    pub cpu: f64,
    pub memory: f64,
}

impl HourlyCost {
    pub fn total(&self) -> f64 {
        self.cpu + self.memory
    }

    pub fn monthly(&self) -> f64 {
        monthly(self.total())
    }

    fn add(&mut self, other: HourlyCost) {
        self.cpu += other.cpu;
        self.memory += other.memory;
    }
}

/// Scale an hourly figure to a month
pub fn monthly(hourly: f64) -> f64 {
    hourly * HOURS_PER_MONTH
}

impl CostModel {
    pub fn new(cpu_price_per_core_hour: f64, memory_price_per_gib_hour: f64) -> Self {
        Self {
            cpu_price_per_core_hour,
            memory_price_per_gib_hour,
        }
    }

    /// Hourly cost of a workload running at the given mean usage
    pub fn hourly(&self, cpu_mean_milli: f64, memory_mean_mi: f64) -> HourlyCost {
        HourlyCost {
            cpu: cpu_mean_milli / MILLI_PER_CORE * self.cpu_price_per_core_hour,
            memory: memory_mean_mi / MI_PER_GI * self.memory_price_per_gib_hour,
        }
    }

    /// Price every workload and roll the results up per namespace and for the cluster
    pub fn evaluate(&self, stats: &[WorkloadStats]) -> CostReport {
        let workloads: Vec<WorkloadCost> = stats
            .iter()
            .map(|s| WorkloadCost {
                key: s.key.clone(),
                cost: self.hourly(s.cpu_mean, s.memory_mean),
            })
            .collect();

        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut namespaces: Vec<NamespaceCost> = Vec::new();
        for workload in &workloads {
            let ns = workload.key.namespace.as_str();
            let i = *index.entry(ns).or_insert_with(|| {
                namespaces.push(NamespaceCost {
                    namespace: ns.to_string(),
                    workloads: 0,
                    cost: HourlyCost::default(),
                });
                namespaces.len() - 1
            });
            namespaces[i].workloads += 1;
            namespaces[i].cost.add(workload.cost);
        }

        let mut total = HourlyCost::default();
        for workload in &workloads {
            total.add(workload.cost);
        }

        CostReport {
            model: *self,
            workloads,
            namespaces,
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadCost {
    pub key: WorkloadKey,
    pub cost: HourlyCost,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceCost {
    pub namespace: String,
    pub workloads: usize,
    /// Sum of the namespace's workload costs
    pub cost: HourlyCost,
}

/// Costs of every workload, namespace and the whole cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostReport {
    pub model: CostModel,
    pub workloads: Vec<WorkloadCost>,
    pub namespaces: Vec<NamespaceCost>,
    pub total: HourlyCost,
}

impl CostReport {
    /// The `n` most expensive workloads by hourly cost; ties keep their original order
    pub fn top(&self, n: usize) -> Vec<&WorkloadCost> {
        let mut ranked: Vec<&WorkloadCost> = self.workloads.iter().collect();
        ranked.sort_by(|a, b| b.cost.total().total_cmp(&a.cost.total()));
        ranked.truncate(n);
        ranked
    }
}
