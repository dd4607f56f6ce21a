//! Collection loop
//!
//! One sequential task: probe the usage source once, then on every tick resolve the workload
//! set, sample each workload, append the tick's samples to the record log and sleep for the
//! configured interval. Ticks never overlap.

use super::retry::{fetch_with_retry, RetryPolicy};
use crate::error::{MonitorError, Result};
use crate::health::{components, HealthRegistry};
use crate::models::{LabelSelector, Sample, SampleStatus, WorkloadRef};
use crate::observability::{CollectorMetrics, StructuredLogger};
use crate::record_log::RecordLog;
use crate::sources::{InventorySource, NamespaceScope, UsageSource};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Configuration for the collection loop
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Pause between ticks (default: 10 seconds)
    pub interval: Duration,
    /// Usage query attempts per workload and the wait between them
    pub retry: RetryPolicy,
    /// Namespaces to list; empty means all namespaces
    pub namespaces: Vec<String>,
    /// Label filter applied to every listing
    pub labels: LabelSelector,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            namespaces: Vec::new(),
            labels: LabelSelector::new(),
        }
    }
}

/// Outcome of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Workloads considered
    pub total: usize,
    pub successes: usize,
    pub errors: usize,
    /// Workloads that were not running
    pub skipped: usize,
    /// Namespaces (or the all-namespace listing) that failed to list
    pub list_failures: usize,
    pub elapsed: Duration,
}

/// Periodic sampler writing into the record log
pub struct CollectionLoop {
    usage: Arc<dyn UsageSource>,
    inventory: Arc<dyn InventorySource>,
    log: RecordLog,
    config: CollectionConfig,
    metrics: CollectorMetrics,
    health: HealthRegistry,
    logger: StructuredLogger,
}

impl CollectionLoop {
    pub fn new(
        usage: Arc<dyn UsageSource>,
        inventory: Arc<dyn InventorySource>,
        log: RecordLog,
        config: CollectionConfig,
    ) -> Self {
        let logger = StructuredLogger::new(log.path().display().to_string());
        Self {
            usage,
            inventory,
            log,
            config,
            metrics: CollectorMetrics::new(),
            health: HealthRegistry::new(),
            logger,
        }
    }

    /// Report component health into a shared registry
    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Probe the usage source, then tick forever
    ///
    /// Returns only on a fatal error: an unreachable usage source at startup (zero ticks are
    /// run) or a record log that can no longer be written.
    pub async fn run(self) -> Result<()> {
        self.run_with(|_| {}).await
    }

    /// Like [`run`](Self::run), handing every tick's summary to `on_tick`
    pub async fn run_with<F>(self, mut on_tick: F) -> Result<()>
    where
        F: FnMut(&TickSummary) + Send,
    {
        self.preflight().await?;

        self.logger.log_startup(
            env!("CARGO_PKG_VERSION"),
            self.config.interval.as_secs(),
            &self.config.namespaces,
            &self.config.labels.to_string(),
        );

        loop {
            match self.tick().await {
                Ok(summary) => on_tick(&summary),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!(error = %e, "Tick failed, retrying after the interval"),
            }
            tokio::time::sleep(self.config.interval).await;
        }
    }

    /// Single probing call against the usage source
    pub async fn preflight(&self) -> Result<()> {
        self.health.register(components::USAGE_SOURCE).await;
        self.health.register(components::RECORD_LOG).await;

        match self.usage.probe().await {
            Ok(()) => {
                info!("Usage source reachable");
                self.health.register(components::COLLECTOR).await;
                self.health.set_ready(true).await;
                Ok(())
            }
            Err(e) => {
                self.health
                    .set_unhealthy(components::USAGE_SOURCE, e.to_string())
                    .await;
                Err(MonitorError::MetricsUnavailable(e.to_string()))
            }
        }
    }

    /// Run one polling cycle and append its samples
    pub async fn tick(&self) -> Result<TickSummary> {
        let start = Instant::now();
        let mut summary = TickSummary::default();

        let (workloads, list_failures) = self.resolve_workloads().await;
        summary.total = workloads.len();
        summary.list_failures = list_failures;

        let mut samples = Vec::with_capacity(workloads.len());
        for workload in &workloads {
            let sample = self.sample_workload(workload).await;
            match sample.status() {
                SampleStatus::Ok => summary.successes += 1,
                SampleStatus::Skip(_) => summary.skipped += 1,
                SampleStatus::Error(_) => summary.errors += 1,
            }
            samples.push(sample);
        }

        if let Err(e) = self.log.append_all(&samples) {
            self.health
                .set_unhealthy(components::RECORD_LOG, e.to_string())
                .await;
            return Err(e);
        }

        summary.elapsed = start.elapsed();
        self.report(&summary).await;
        Ok(summary)
    }

    /// List workloads for this tick; failed listings are logged and counted, not fatal
    async fn resolve_workloads(&self) -> (Vec<WorkloadRef>, usize) {
        let scopes: Vec<NamespaceScope> = if self.config.namespaces.is_empty() {
            vec![NamespaceScope::All]
        } else {
            self.config
                .namespaces
                .iter()
                .map(|ns| NamespaceScope::Namespace(ns.clone()))
                .collect()
        };

        let mut seen = HashSet::new();
        let mut workloads = Vec::new();
        let mut failures = 0;

        for scope in &scopes {
            match self
                .inventory
                .list_workloads(scope, &self.config.labels)
                .await
            {
                Ok(listed) => {
                    workloads.extend(listed.into_iter().filter(|w| seen.insert(w.key.clone())))
                }
                Err(e) => {
                    failures += 1;
                    let err = MonitorError::PartialListFailure {
                        namespace: scope.to_string(),
                        reason: e.to_string(),
                    };
                    self.logger.log_list_failure(&scope.to_string(), &err.to_string());
                    self.metrics.inc_list_failures();
                }
            }
        }

        (workloads, failures)
    }

    async fn sample_workload(&self, workload: &WorkloadRef) -> Sample {
        let key = &workload.key;

        if !workload.is_running() {
            return Sample::skipped(Utc::now(), key, &workload.phase);
        }

        let result = fetch_with_retry(
            self.usage.as_ref(),
            &key.namespace,
            &key.name,
            self.config.retry,
            |attempt, e| {
                self.metrics.inc_fetch_retries();
                self.logger
                    .log_fetch_retry(&key.namespace, &key.name, attempt, &e.to_string());
            },
        )
        .await;

        match result {
            Ok(usage) => {
                self.logger
                    .log_sample(&key.namespace, &key.name, usage.cpu_milli, usage.memory_mi);
                Sample::ok(Utc::now(), key, usage)
            }
            Err(MonitorError::TransientFetch { reason, .. }) => {
                self.logger.log_fetch_failed(&key.namespace, &key.name, &reason);
                Sample::failed(Utc::now(), key, reason)
            }
            Err(other) => Sample::failed(Utc::now(), key, other.to_string()),
        }
    }

    async fn report(&self, summary: &TickSummary) {
        self.logger.log_tick(
            summary.total,
            summary.successes,
            summary.errors,
            summary.skipped,
            summary.elapsed.as_millis(),
        );

        self.metrics
            .observe_tick(summary.elapsed.as_secs_f64(), summary.total);
        self.metrics.add_samples("ok", summary.successes as u64);
        self.metrics.add_samples("skip", summary.skipped as u64);
        self.metrics.add_samples("error", summary.errors as u64);

        self.health.set_healthy(components::RECORD_LOG).await;
        if summary.errors > 0 || summary.list_failures > 0 {
            self.health
                .set_degraded(
                    components::COLLECTOR,
                    format!(
                        "{} usage queries and {} listings failed in the last tick",
                        summary.errors, summary.list_failures
                    ),
                )
                .await;
        } else {
            self.health.set_healthy(components::COLLECTOR).await;
        }
    }
}

/// Builder for the collection loop
pub struct CollectionLoopBuilder {
    usage: Option<Arc<dyn UsageSource>>,
    inventory: Option<Arc<dyn InventorySource>>,
    log: Option<RecordLog>,
    health: Option<HealthRegistry>,
    config: CollectionConfig,
}

impl CollectionLoopBuilder {
    pub fn new() -> Self {
        Self {
            usage: None,
            inventory: None,
            log: None,
            health: None,
            config: CollectionConfig::default(),
        }
    }

    pub fn usage_source(mut self, usage: Arc<dyn UsageSource>) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn inventory_source(mut self, inventory: Arc<dyn InventorySource>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn record_log(mut self, log: RecordLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry.delay = delay;
        self
    }

    pub fn namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.config.namespaces = namespaces;
        self
    }

    pub fn labels(mut self, labels: LabelSelector) -> Self {
        self.config.labels = labels;
        self
    }

    pub fn build(self) -> anyhow::Result<CollectionLoop> {
        let usage = self
            .usage
            .ok_or_else(|| anyhow::anyhow!("Usage source is required"))?;
        let inventory = self
            .inventory
            .ok_or_else(|| anyhow::anyhow!("Inventory source is required"))?;
        let log = self
            .log
            .ok_or_else(|| anyhow::anyhow!("Record log is required"))?;

        let collection_loop = CollectionLoop::new(usage, inventory, log, self.config);
        Ok(match self.health {
            Some(health) => collection_loop.with_health(health),
            None => collection_loop,
        })
    }
}

impl Default for CollectionLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
