//! In-memory sources with scripted answers, for tests

use super::{async_trait, InventorySource, NamespaceScope, UsageSource};
use crate::error::SourceError;
use crate::models::{LabelSelector, ResourceConfig, Usage, WorkloadKey, WorkloadRef};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// Usage source answering from per-workload queues of scripted results
///
/// Once a queue holds a single entry that entry keeps being returned. Unknown workloads
/// answer `NotFound`.
#[derive(Default)]
pub struct ScriptedUsage {
    reachable: bool,
    answers: Mutex<HashMap<WorkloadKey, VecDeque<Result<Usage, SourceError>>>>,
    calls: Mutex<Vec<WorkloadKey>>,
}

impl ScriptedUsage {
    pub fn reachable() -> Self {
        Self {
            reachable: true,
            ..Default::default()
        }
    }

    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn answer(self, namespace: &str, name: &str, results: Vec<Result<Usage, SourceError>>) -> Self {
        self.answers
            .lock()
            .unwrap()
            .insert(WorkloadKey::new(namespace, name), results.into());
        self
    }

    /// Workloads queried so far, one entry per call
    pub fn calls(&self) -> Vec<WorkloadKey> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageSource for ScriptedUsage {
    async fn probe(&self) -> Result<(), SourceError> {
        if self.reachable {
            Ok(())
        } else {
            Err(SourceError::Unreachable("metrics API not installed".into()))
        }
    }

    async fn get_usage(&self, namespace: &str, name: &str) -> Result<Usage, SourceError> {
        let key = WorkloadKey::new(namespace, name);
        self.calls.lock().unwrap().push(key.clone());

        let mut answers = self.answers.lock().unwrap();
        match answers.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| {
                Err(SourceError::NotFound(key.to_string()))
            }),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(SourceError::NotFound(key.to_string()))),
            None => Err(SourceError::NotFound(key.to_string())),
        }
    }
}

/// Inventory source over a fixed set of workloads
#[derive(Default)]
pub struct StaticInventory {
    workloads: Vec<WorkloadRef>,
    failing_scopes: Vec<NamespaceScope>,
    configs: HashMap<WorkloadKey, ResourceConfig>,
    labels: HashMap<WorkloadKey, BTreeMap<String, String>>,
}

impl StaticInventory {
    pub fn new(workloads: Vec<WorkloadRef>) -> Self {
        Self {
            workloads,
            ..Default::default()
        }
    }

    /// Make listings of `scope` fail
    pub fn failing(mut self, scope: NamespaceScope) -> Self {
        self.failing_scopes.push(scope);
        self
    }

    pub fn with_config(mut self, namespace: &str, name: &str, config: ResourceConfig) -> Self {
        self.configs.insert(WorkloadKey::new(namespace, name), config);
        self
    }

    /// Attach labels to a workload; unlabelled workloads match only an empty selector
    pub fn with_labels(mut self, namespace: &str, name: &str, labels: &[(&str, &str)]) -> Self {
        self.labels.insert(
            WorkloadKey::new(namespace, name),
            labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }
}

#[async_trait]
impl InventorySource for StaticInventory {
    async fn list_workloads(
        &self,
        scope: &NamespaceScope,
        labels: &LabelSelector,
    ) -> Result<Vec<WorkloadRef>, SourceError> {
        let unlabelled = BTreeMap::new();
        if self.failing_scopes.contains(scope) {
            return Err(SourceError::Transient(format!("listing {} timed out", scope)));
        }
        Ok(self
            .workloads
            .iter()
            .filter(|w| match scope {
                NamespaceScope::All => true,
                NamespaceScope::Namespace(ns) => &w.key.namespace == ns,
            })
            .filter(|w| labels.matches(self.labels.get(&w.key).unwrap_or(&unlabelled)))
            .cloned()
            .collect())
    }

    async fn get_resource_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceConfig, SourceError> {
        self.configs
            .get(&WorkloadKey::new(namespace, name))
            .copied()
            .ok_or_else(|| SourceError::NotFound(format!("{}/{}", namespace, name)))
    }
}
