//! External collaborators: usage and inventory sources
//!
//! The collector and the report commands only see the two traits below. The Kubernetes
//! implementation lives in [`cluster`]; tests provide scripted in-memory implementations.

pub mod cluster;
pub mod quantity;

#[cfg(test)]
pub(crate) mod scripted;

pub use cluster::{ConnectionContext, KubeInventorySource, KubeUsageSource};

use crate::error::SourceError;
use crate::models::{LabelSelector, ResourceConfig, Usage, WorkloadRef};

pub use async_trait::async_trait;

/// Which namespaces an inventory listing covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceScope {
    All,
    Namespace(String),
}

impl std::fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamespaceScope::All => f.write_str("<all>"),
            NamespaceScope::Namespace(ns) => f.write_str(ns),
        }
    }
}

/// Source of instantaneous per-workload usage
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Single cheap call verifying the source answers at all
    async fn probe(&self) -> Result<(), SourceError>;

    /// Current usage of one workload, summed over its containers
    async fn get_usage(&self, namespace: &str, name: &str) -> Result<Usage, SourceError>;
}

/// Source of workload identities, phases and declared resources
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Workloads in scope that match the label filter
    async fn list_workloads(
        &self,
        scope: &NamespaceScope,
        labels: &LabelSelector,
    ) -> Result<Vec<WorkloadRef>, SourceError>;

    /// Declared requests and limits of one workload
    async fn get_resource_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceConfig, SourceError>;
}
