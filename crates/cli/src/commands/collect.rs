//! Foreground collection loop

use crate::output::{color_count, print_info};
use anyhow::{Context, Result};
use chrono::Utc;
use monitor_lib::collector::{CollectionLoopBuilder, TickSummary};
use monitor_lib::sources::ConnectionContext;
use monitor_lib::{LabelSelector, RecordLog};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct CollectOptions {
    pub interval: Duration,
    pub output: PathBuf,
    pub namespaces: Vec<String>,
    pub labels: LabelSelector,
    pub retry_delay: Duration,
    pub kubeconfig: Option<PathBuf>,
}

/// Sample until interrupted; returns early only on a fatal error
pub async fn collect(options: CollectOptions) -> Result<()> {
    let (usage, inventory) = ConnectionContext::new(options.kubeconfig)
        .sources()
        .await
        .context("Failed to connect to the Kubernetes API")?;

    let collector = CollectionLoopBuilder::new()
        .usage_source(Arc::new(usage))
        .inventory_source(Arc::new(inventory))
        .record_log(RecordLog::new(&options.output))
        .interval(options.interval)
        .retry_delay(options.retry_delay)
        .namespaces(options.namespaces.clone())
        .labels(options.labels.clone())
        .build()?;

    let scope = if options.namespaces.is_empty() {
        "all namespaces".to_string()
    } else {
        options.namespaces.join(", ")
    };
    print_info(&format!(
        "Collecting from {} every {}s into {}",
        scope,
        options.interval.as_secs(),
        options.output.display()
    ));

    tokio::select! {
        result = collector.run_with(print_tick) => {
            result.context("Collection stopped")
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to wait for Ctrl-C")?;
            print_info("Interrupted, stopping collection");
            Ok(())
        }
    }
}

fn print_tick(summary: &TickSummary) {
    let mut line = format!(
        "[{}] {} pods: {}, {}, {} ({} ms)",
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        summary.total,
        color_count(summary.successes, "ok"),
        color_count(summary.skipped, "skipped"),
        color_count(summary.errors, "errors"),
        summary.elapsed.as_millis()
    );
    if summary.list_failures > 0 {
        line.push_str(&format!(", {} listings failed", summary.list_failures));
    }
    println!("{}", line);
}
