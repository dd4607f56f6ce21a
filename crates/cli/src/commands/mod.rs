//! Subcommand implementations

pub mod collect;
pub mod cost;
pub mod optimize;
pub mod report;
pub mod reset;

use crate::output::print_warning;
use anyhow::{Context, Result};
use monitor_lib::sources::{ConnectionContext, KubeInventorySource};
use monitor_lib::{Aggregator, RecordLog, Window, WorkloadStats};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read the record log and aggregate it per workload
pub fn load_workload_stats(path: &Path, window: Option<Window>) -> Result<Vec<WorkloadStats>> {
    let loaded = RecordLog::new(path)
        .read_all()
        .with_context(|| format!("Failed to read record log {}", path.display()))?;

    if loaded.skipped > 0 {
        print_warning(&format!(
            "Skipped {} malformed rows in {}",
            loaded.skipped,
            path.display()
        ));
    }
    debug!(samples = loaded.samples.len(), "Loaded record log");

    Ok(Aggregator::new()
        .with_window(window)
        .group_by_workload(&loaded.samples))
}

/// Connect to the cluster for declared-resource lookups
///
/// Connection failures are reported as a warning; callers continue without annotations.
pub async fn connect_inventory(kubeconfig: Option<PathBuf>) -> Option<KubeInventorySource> {
    match ConnectionContext::new(kubeconfig).sources().await {
        Ok((_, inventory)) => Some(inventory),
        Err(e) => {
            print_warning(&format!(
                "Kubernetes API unavailable, declared resources not shown: {}",
                e
            ));
            None
        }
    }
}
