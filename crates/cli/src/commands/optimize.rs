//! Right-sizing recommendations command

use super::{connect_inventory, load_workload_stats};
use crate::output::{
    format_cpu, format_memory, print_heading, print_json, print_table, print_warning, OutputFormat,
};
use anyhow::Result;
use monitor_lib::optimizer::{CurrentConfig, Optimizer, Recommendation};
use monitor_lib::sources::InventorySource;
use monitor_lib::Window;
use std::path::{Path, PathBuf};
use tabled::Tabled;

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Pod")]
    workload: String,
    #[tabled(rename = "CPU avg/max")]
    cpu_observed: String,
    #[tabled(rename = "CPU current req/lim")]
    cpu_current: String,
    #[tabled(rename = "CPU recommended req/lim")]
    cpu_recommended: String,
    #[tabled(rename = "Mem avg/max")]
    memory_observed: String,
    #[tabled(rename = "Mem current req/lim")]
    memory_current: String,
    #[tabled(rename = "Mem recommended req/lim")]
    memory_recommended: String,
}

impl From<&Recommendation> for RecommendationRow {
    fn from(rec: &Recommendation) -> Self {
        let (cpu_current, memory_current) = match &rec.current {
            CurrentConfig::Available(config) => (
                format!("{}m / {}m", config.requests.cpu_milli, config.limits.cpu_milli),
                format!("{}Mi / {}Mi", config.requests.memory_mi, config.limits.memory_mi),
            ),
            CurrentConfig::Unavailable { .. } => ("-".to_string(), "-".to_string()),
        };

        Self {
            workload: rec.key.to_string(),
            cpu_observed: format!(
                "{} / {}",
                format_cpu(rec.cpu_mean),
                format_cpu(rec.cpu_max as f64)
            ),
            cpu_current,
            cpu_recommended: format!("{}m / {}m", rec.requests.cpu_milli, rec.limits.cpu_milli),
            memory_observed: format!(
                "{} / {}",
                format_memory(rec.memory_mean),
                format_memory(rec.memory_max as f64)
            ),
            memory_current,
            memory_recommended: format!(
                "{}Mi / {}Mi",
                rec.requests.memory_mi, rec.limits.memory_mi
            ),
        }
    }
}

pub async fn show_recommendations(
    path: &Path,
    optimizer: Optimizer,
    window: Option<Window>,
    kubeconfig: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let stats = load_workload_stats(path, window)?;
    let inventory = connect_inventory(kubeconfig).await;
    let plan = optimizer
        .plan(
            &stats,
            inventory.as_ref().map(|i| i as &dyn InventorySource),
        )
        .await;

    match format {
        OutputFormat::Json => print_json(&plan)?,
        OutputFormat::Table => {
            print_heading(&format!(
                "Resource Recommendations ({}% margin)",
                optimizer.margin_percent()
            ));
            let rows: Vec<RecommendationRow> = plan.iter().map(RecommendationRow::from).collect();
            print_table(rows, "No samples in range");

            if inventory.is_some() {
                for rec in &plan {
                    if let CurrentConfig::Unavailable { reason } = &rec.current {
                        print_warning(&format!(
                            "Failed to read configuration for {}: {}",
                            rec.key, reason
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}
