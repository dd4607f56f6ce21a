//! Kubernetes-backed usage and inventory sources
//!
//! Usage comes from the `metrics.k8s.io/v1beta1` pod metrics API; inventory and declared
//! resources come from the core pod API. Both share one client built from a
//! [`ConnectionContext`].

use super::quantity;
use super::{async_trait, InventorySource, NamespaceScope, UsageSource};
use crate::error::{MonitorError, SourceError};
use crate::models::{LabelSelector, ResourceConfig, ResourceQuantities, Usage, WorkloadRef};
use k8s_openapi::api::core::v1::{Pod, PodSpec};
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Client, Config};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

const UNKNOWN_PHASE: &str = "Unknown";

/// How to reach the cluster
#[derive(Debug, Clone, Default)]
pub struct ConnectionContext {
    /// Explicit kubeconfig; when unset, in-cluster config is tried before the default file
    pub kubeconfig: Option<PathBuf>,
}

impl ConnectionContext {
    pub fn new(kubeconfig: Option<PathBuf>) -> Self {
        Self { kubeconfig }
    }

    /// Build a client for the configured cluster
    pub async fn connect(&self) -> Result<Client, MonitorError> {
        let config = match &self.kubeconfig {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    MonitorError::Connection(format!("reading {}: {}", path.display(), e))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| MonitorError::Connection(e.to_string()))?
            }
            None => match Config::incluster() {
                Ok(config) => {
                    info!("Using in-cluster configuration");
                    config
                }
                Err(e) => {
                    debug!(error = %e, "Not running in-cluster, inferring configuration");
                    Config::infer()
                        .await
                        .map_err(|e| MonitorError::Connection(e.to_string()))?
                }
            },
        };

        Client::try_from(config).map_err(|e| MonitorError::Connection(e.to_string()))
    }

    /// Connect and build both sources on one shared client
    pub async fn sources(&self) -> Result<(KubeUsageSource, KubeInventorySource), MonitorError> {
        let client = self.connect().await?;
        Ok((
            KubeUsageSource::new(client.clone()),
            KubeInventorySource::new(client),
        ))
    }
}

/// Usage source backed by the metrics API
#[derive(Clone)]
pub struct KubeUsageSource {
    client: Client,
    resource: ApiResource,
}

impl KubeUsageSource {
    pub fn new(client: Client) -> Self {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        Self {
            client,
            resource: ApiResource::from_gvk_with_plural(&gvk, "pods"),
        }
    }
}

#[async_trait]
impl UsageSource for KubeUsageSource {
    async fn probe(&self) -> Result<(), SourceError> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &self.resource);
        api.list(&ListParams::default().limit(1))
            .await
            .map(|_| ())
            .map_err(|e| SourceError::Unreachable(classify(e).to_string()))
    }

    async fn get_usage(&self, namespace: &str, name: &str) -> Result<Usage, SourceError> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &self.resource);
        let metrics = api.get(name).await.map_err(classify)?;
        sum_container_usage(&metrics.data)
    }
}

/// Inventory source backed by the core pod API
#[derive(Clone)]
pub struct KubeInventorySource {
    client: Client,
}

impl KubeInventorySource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InventorySource for KubeInventorySource {
    async fn list_workloads(
        &self,
        scope: &NamespaceScope,
        labels: &LabelSelector,
    ) -> Result<Vec<WorkloadRef>, SourceError> {
        let api: Api<Pod> = match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Namespace(ns) => Api::namespaced(self.client.clone(), ns),
        };

        let mut params = ListParams::default();
        if !labels.is_empty() {
            params = params.labels(&labels.to_string());
        }

        let pods = api.list(&params).await.map_err(classify)?;
        let fallback_ns = match scope {
            NamespaceScope::All => "",
            NamespaceScope::Namespace(ns) => ns.as_str(),
        };

        Ok(pods
            .items
            .into_iter()
            .filter_map(|pod| {
                let name = pod.metadata.name?;
                let namespace = pod
                    .metadata
                    .namespace
                    .unwrap_or_else(|| fallback_ns.to_string());
                let phase = pod
                    .status
                    .and_then(|s| s.phase)
                    .unwrap_or_else(|| UNKNOWN_PHASE.to_string());
                Some(WorkloadRef::new(namespace, name, phase))
            })
            .collect())
    }

    async fn get_resource_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceConfig, SourceError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = api.get(name).await.map_err(classify)?;
        Ok(pod.spec.as_ref().map(sum_declared_resources).unwrap_or_default())
    }
}

/// Map a client error onto the collaborator failure model
fn classify(err: kube::Error) -> SourceError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => SourceError::NotFound(resp.message),
        kube::Error::Api(resp) => {
            SourceError::Transient(format!("{} (HTTP {})", resp.message, resp.code))
        }
        other => SourceError::Transient(other.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct ContainerUsage {
    #[serde(default)]
    usage: BTreeMap<String, String>,
}

/// Sum the `containers[].usage` block of a pod metrics object
fn sum_container_usage(data: &serde_json::Value) -> Result<Usage, SourceError> {
    let containers: Vec<ContainerUsage> = match data.get("containers") {
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| SourceError::Transient(format!("malformed pod metrics: {}", e)))?,
        None => Vec::new(),
    };

    let mut cpu_milli = 0u64;
    let mut memory_bytes = 0f64;
    for container in &containers {
        if let Some(cpu) = container.usage.get("cpu") {
            cpu_milli += quantity::cpu_milli(cpu)
                .ok_or_else(|| SourceError::Transient(format!("bad cpu quantity {:?}", cpu)))?;
        }
        if let Some(memory) = container.usage.get("memory") {
            memory_bytes += quantity::parse_quantity(memory).ok_or_else(|| {
                SourceError::Transient(format!("bad memory quantity {:?}", memory))
            })?;
        }
    }

    Ok(Usage {
        cpu_milli,
        memory_mi: (memory_bytes / (1024.0 * 1024.0)).floor() as u64,
    })
}

/// Sum declared requests and limits over a pod's containers
fn sum_declared_resources(spec: &PodSpec) -> ResourceConfig {
    let mut config = ResourceConfig::default();
    for container in &spec.containers {
        if let Some(resources) = &container.resources {
            add_quantities(&mut config.requests, resources.requests.as_ref());
            add_quantities(&mut config.limits, resources.limits.as_ref());
        }
    }
    config
}

fn add_quantities(
    total: &mut ResourceQuantities,
    values: Option<&BTreeMap<String, k8s_openapi::apimachinery::pkg::api::resource::Quantity>>,
) {
    let Some(values) = values else {
        return;
    };
    if let Some(cpu) = values.get("cpu").and_then(|q| quantity::cpu_milli(&q.0)) {
        total.cpu_milli += cpu;
    }
    if let Some(memory) = values.get("memory").and_then(|q| quantity::memory_mi(&q.0)) {
        total.memory_mi += memory;
    }
}
