//! Pod Monitor Agent - periodic pod usage collector
//!
//! Runs the collection loop against the cluster's metrics API, appending samples to the
//! record log, and serves health and Prometheus metrics endpoints alongside it.

use anyhow::{Context, Result};
use monitor_lib::{
    collector::CollectionLoopBuilder,
    health::{components, HealthRegistry},
    observability::{CollectorMetrics, StructuredLogger},
    sources::ConnectionContext,
    RecordLog,
};
use pod_monitor_agent::{api, config};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting pod-monitor-agent");

    let config = config::AgentConfig::load()?;
    info!(
        output = %config.output_path.display(),
        interval_secs = config.interval_secs,
        namespaces = %config.namespaces,
        labels = %config.labels,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    let metrics = CollectorMetrics::new();
    let logger = StructuredLogger::new(config.output_path.display().to_string());

    // Health endpoints come up before the cluster connection so probes see the failure
    let app_state = Arc::new(api::AppState::new(health_registry.clone(), metrics));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    let context = ConnectionContext::new(config.kubeconfig.clone());
    let (usage, inventory) = context
        .sources()
        .await
        .context("connecting to the Kubernetes API")?;

    let collector = CollectionLoopBuilder::new()
        .usage_source(Arc::new(usage))
        .inventory_source(Arc::new(inventory))
        .record_log(RecordLog::new(&config.output_path))
        .health(health_registry.clone())
        .interval(config.interval())
        .retry_delay(config.retry_delay())
        .namespaces(config.namespace_list())
        .labels(config.label_selector()?)
        .build()?;

    let outcome = tokio::select! {
        result = collector.run() => result.context("collector stopped"),
        signal = tokio::signal::ctrl_c() => {
            logger.log_shutdown("SIGINT received");
            signal.context("waiting for shutdown signal")
        }
    };

    if let Err(e) = &outcome {
        error!(error = %format!("{e:#}"), "Collector terminated");
        health_registry
            .set_unhealthy(components::COLLECTOR, e.to_string())
            .await;
        logger.log_shutdown("fatal error");
    }

    api_handle.abort();
    info!("Shutting down");
    outcome
}
