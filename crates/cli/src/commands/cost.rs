//! Cost estimation command

use super::load_workload_stats;
use crate::output::{
    format_currency, format_hourly, print_heading, print_json, print_table, OutputFormat,
};
use anyhow::Result;
use colored::Colorize;
use monitor_lib::cost::{monthly, CostModel, CostReport};
use monitor_lib::Window;
use std::path::Path;
use tabled::Tabled;

const TOP_WORKLOADS: usize = 5;

/// Row for the per-namespace table
#[derive(Tabled)]
struct NamespaceRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pods")]
    workloads: usize,
    #[tabled(rename = "CPU / month")]
    cpu: String,
    #[tabled(rename = "Memory / month")]
    memory: String,
    #[tabled(rename = "Total / month")]
    total: String,
}

/// Row for the most expensive workloads
#[derive(Tabled)]
struct WorkloadRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "Pod")]
    workload: String,
    #[tabled(rename = "Hourly")]
    hourly: String,
    #[tabled(rename = "CPU / month")]
    cpu: String,
    #[tabled(rename = "Memory / month")]
    memory: String,
    #[tabled(rename = "Total / month")]
    total: String,
}

pub fn show_costs(
    path: &Path,
    model: CostModel,
    window: Option<Window>,
    format: OutputFormat,
) -> Result<()> {
    let stats = load_workload_stats(path, window)?;
    let report = model.evaluate(&stats);

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_cost_tables(&report, window),
    }
    Ok(())
}

fn print_cost_tables(report: &CostReport, window: Option<Window>) {
    let usd = |amount: f64| format_currency(amount, "USD");

    print_heading("Cluster Cost");
    if let Some(window) = window {
        println!("Window:                 last {}", window);
    }
    println!(
        "Prices:                 {} per core-hour, {} per GiB-hour",
        format_hourly(report.model.cpu_price_per_core_hour),
        format_hourly(report.model.memory_price_per_gib_hour)
    );
    println!("Hourly:                 {}", format_hourly(report.total.total()));
    println!(
        "{}  {}",
        "Monthly:".bold(),
        usd(report.total.monthly()).green().bold()
    );

    print_heading("By Namespace");
    let rows: Vec<NamespaceRow> = report
        .namespaces
        .iter()
        .map(|ns| NamespaceRow {
            namespace: ns.namespace.clone(),
            workloads: ns.workloads,
            cpu: usd(monthly(ns.cost.cpu)),
            memory: usd(monthly(ns.cost.memory)),
            total: usd(ns.cost.monthly()),
        })
        .collect();
    print_table(rows, "No samples in range");

    print_heading(&format!("Top {} Most Expensive Pods", TOP_WORKLOADS));
    let rows: Vec<WorkloadRow> = report
        .top(TOP_WORKLOADS)
        .into_iter()
        .enumerate()
        .map(|(i, w)| WorkloadRow {
            rank: i + 1,
            workload: w.key.to_string(),
            hourly: format_hourly(w.cost.total()),
            cpu: usd(monthly(w.cost.cpu)),
            memory: usd(monthly(w.cost.memory)),
            total: usd(w.cost.monthly()),
        })
        .collect();
    print_table(rows, "No samples in range");
}
