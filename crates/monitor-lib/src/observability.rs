//! Observability infrastructure for the collector
//!
//! Provides:
//! - Prometheus metrics (tick latency, samples by status, retries, list failures)
//! - Structured logging of collector events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for tick latency (in seconds)
const TICK_LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<CollectorMetricsInner> = OnceLock::new();

struct CollectorMetricsInner {
    tick_latency_seconds: Histogram,
    ticks_total: IntCounter,
    samples_total: IntCounterVec,
    fetch_retries_total: IntCounter,
    list_failures_total: IntCounter,
    workloads_last_tick: IntGauge,
    last_tick_timestamp_seconds: IntGauge,
}

impl CollectorMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "pod_monitor_tick_latency_seconds",
                "Time spent on one collection tick",
                TICK_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            ticks_total: register_int_counter!(
                "pod_monitor_ticks_total",
                "Number of completed collection ticks"
            )
            .expect("Failed to register ticks_total"),

            samples_total: register_int_counter_vec!(
                "pod_monitor_samples_total",
                "Samples appended to the record log by status",
                &["status"]
            )
            .expect("Failed to register samples_total"),

            fetch_retries_total: register_int_counter!(
                "pod_monitor_fetch_retries_total",
                "Usage queries that needed a second attempt"
            )
            .expect("Failed to register fetch_retries_total"),

            list_failures_total: register_int_counter!(
                "pod_monitor_list_failures_total",
                "Namespace listings that failed during a tick"
            )
            .expect("Failed to register list_failures_total"),

            workloads_last_tick: register_int_gauge!(
                "pod_monitor_workloads_last_tick",
                "Workloads considered during the last tick"
            )
            .expect("Failed to register workloads_last_tick"),

            last_tick_timestamp_seconds: register_int_gauge!(
                "pod_monitor_last_tick_timestamp_seconds",
                "Unix time at which the last tick completed"
            )
            .expect("Failed to register last_tick_timestamp_seconds"),
        }
    }
}

/// Collector metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same metrics.
#[derive(Clone)]
pub struct CollectorMetrics {
    _private: (),
}

impl Default for CollectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(CollectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &CollectorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record the outcome of one tick
    pub fn observe_tick(&self, duration_secs: f64, workloads: usize) {
        let inner = self.inner();
        inner.tick_latency_seconds.observe(duration_secs);
        inner.ticks_total.inc();
        inner.workloads_last_tick.set(workloads as i64);
        inner
            .last_tick_timestamp_seconds
            .set(chrono::Utc::now().timestamp());
    }

    /// Count appended samples for a status label (`ok`, `skip`, `error`)
    pub fn add_samples(&self, status: &str, count: u64) {
        self.inner()
            .samples_total
            .with_label_values(&[status])
            .inc_by(count);
    }

    pub fn inc_fetch_retries(&self) {
        self.inner().fetch_retries_total.inc();
    }

    pub fn inc_list_failures(&self) {
        self.inner().list_failures_total.inc();
    }
}

/// Structured logger for collector events
///
/// Emits consistently named events so log pipelines can filter on `event`.
#[derive(Clone)]
pub struct StructuredLogger {
    output: String,
}

impl StructuredLogger {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64, namespaces: &[String], labels: &str) {
        info!(
            event = "collector_started",
            output = %self.output,
            version = %version,
            interval_secs = interval_secs,
            namespaces = ?namespaces,
            labels = %labels,
            "Pod usage collector started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "collector_shutdown",
            output = %self.output,
            reason = %reason,
            "Pod usage collector shutting down"
        );
    }

    pub fn log_sample(&self, namespace: &str, name: &str, cpu_milli: u64, memory_mi: u64) {
        info!(
            event = "sample_collected",
            namespace = %namespace,
            pod = %name,
            cpu_milli = cpu_milli,
            memory_mi = memory_mi,
            "Sampled pod usage"
        );
    }

    pub fn log_fetch_retry(&self, namespace: &str, name: &str, attempt: u32, error: &str) {
        warn!(
            event = "usage_fetch_retry",
            namespace = %namespace,
            pod = %name,
            attempt = attempt,
            error = %error,
            "Usage query failed, retrying"
        );
    }

    pub fn log_fetch_failed(&self, namespace: &str, name: &str, error: &str) {
        warn!(
            event = "usage_fetch_failed",
            namespace = %namespace,
            pod = %name,
            error = %error,
            "Usage query failed on every attempt"
        );
    }

    pub fn log_list_failure(&self, namespace: &str, error: &str) {
        warn!(
            event = "namespace_list_failed",
            namespace = %namespace,
            error = %error,
            "Failed to list pods, namespace omitted from this tick"
        );
    }

    pub fn log_tick(&self, total: usize, successes: usize, errors: usize, skipped: usize, elapsed_ms: u128) {
        info!(
            event = "tick_completed",
            output = %self.output,
            total = total,
            successes = successes,
            errors = errors,
            skipped = skipped,
            elapsed_ms = elapsed_ms,
            "Collection tick complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_metrics_creation() {
        let metrics = CollectorMetrics::new();
        metrics.observe_tick(0.2, 4);
        metrics.add_samples("ok", 3);
        metrics.add_samples("error", 1);
        metrics.inc_fetch_retries();
        metrics.inc_list_failures();

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "pod_monitor_samples_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("/data/output.csv");
        assert_eq!(logger.output, "/data/output.csv");
    }
}
