//! Utilization report command

use super::{connect_inventory, load_workload_stats};
use crate::output::{
    format_cpu, format_memory, print_heading, print_json, print_table, print_warning, OutputFormat,
};
use anyhow::Result;
use colored::Colorize;
use monitor_lib::anomaly::AnomalyReport;
use monitor_lib::report::{TopConsumer, UtilizationReport, TOP_CONSUMERS};
use monitor_lib::sources::InventorySource;
use monitor_lib::Window;
use std::path::{Path, PathBuf};
use tabled::Tabled;

#[derive(Tabled)]
struct NamespaceRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pods")]
    workloads: usize,
    #[tabled(rename = "Avg CPU")]
    cpu: String,
    #[tabled(rename = "Avg Memory")]
    memory: String,
}

#[derive(Tabled)]
struct ConsumerRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Pod")]
    workload: String,
    #[tabled(rename = "Peak")]
    peak: String,
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Utilization")]
    utilization: String,
}

fn consumer_rows(consumers: &[TopConsumer], unit: &str) -> Vec<ConsumerRow> {
    consumers
        .iter()
        .enumerate()
        .map(|(i, c)| ConsumerRow {
            rank: i + 1,
            workload: c.key.to_string(),
            peak: format!("{}{}", c.peak, unit),
            limit: c
                .limit
                .map(|l| format!("{}{}", l, unit))
                .unwrap_or_else(|| "-".to_string()),
            utilization: c
                .utilization_percent
                .map(|p| format!("{:.0}%", p))
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect()
}

pub async fn show_report(
    path: &Path,
    window: Window,
    kubeconfig: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let stats = load_workload_stats(path, Some(window))?;
    let inventory = connect_inventory(kubeconfig).await;
    let report = UtilizationReport::build(
        &stats,
        Some(window),
        inventory.as_ref().map(|i| i as &dyn InventorySource),
    )
    .await;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report, window),
    }
    Ok(())
}

fn print_report(report: &UtilizationReport, window: Window) {
    print_heading("Cluster Summary");
    println!("Window:                 last {}", window);
    println!("Pods analysed:          {}", report.summary.workloads);
    println!(
        "Average per pod:        CPU {} | Memory {}",
        format_cpu(report.summary.cpu_mean).cyan(),
        format_memory(report.summary.memory_mean).cyan()
    );

    print_heading("By Namespace");
    let rows: Vec<NamespaceRow> = report
        .namespaces
        .iter()
        .map(|ns| NamespaceRow {
            namespace: ns.namespace.clone(),
            workloads: ns.workloads,
            cpu: format_cpu(ns.cpu_mean),
            memory: format_memory(ns.memory_mean),
        })
        .collect();
    print_table(rows, "No samples in range");

    print_heading(&format!("Top {} by CPU", TOP_CONSUMERS));
    print_table(consumer_rows(&report.top_cpu, "m"), "No samples in range");

    print_heading(&format!("Top {} by Memory", TOP_CONSUMERS));
    print_table(consumer_rows(&report.top_memory, "Mi"), "No samples in range");

    if !report.limits_annotated && report.summary.workloads > 0 {
        print_warning("Limits not shown: Kubernetes API unavailable");
    }

    print_heading("Anomalies");
    match &report.anomalies {
        AnomalyReport::Clear => println!("{}", "No critical anomalies detected".green()),
        AnomalyReport::Flagged(workloads) => {
            for workload in workloads {
                println!("{}", workload.key.to_string().yellow().bold());
                for spike in &workload.spikes {
                    println!("  - {}", spike);
                }
            }
        }
    }
}
