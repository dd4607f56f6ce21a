//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a rounded table, or a placeholder line when there are no rows
pub fn print_table<T: Tabled>(rows: Vec<T>, empty: &str) {
    if rows.is_empty() {
        println!("{}", empty.dimmed());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format millicores, switching to cores from 1000m up
pub fn format_cpu(millicores: f64) -> String {
    if millicores >= 1000.0 {
        format!("{:.2}", millicores / 1000.0)
    } else {
        format!("{:.0}m", millicores)
    }
}

/// Format MiB, switching to GiB from 1024Mi up
pub fn format_memory(mebibytes: f64) -> String {
    if mebibytes >= 1024.0 {
        format!("{:.2}Gi", mebibytes / 1024.0)
    } else {
        format!("{:.0}Mi", mebibytes)
    }
}

/// Format currency
pub fn format_currency(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        "GBP" => format!("£{:.2}", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}

/// Format an hourly figure, keeping precision for sub-cent amounts
pub fn format_hourly(amount: f64) -> String {
    format!("${:.4}", amount)
}

/// Color a tick count: errors red, skips yellow, successes green
pub fn color_count(count: usize, status: &str) -> String {
    let text = format!("{} {}", count, status);
    match (status, count) {
        (_, 0) => text.dimmed().to_string(),
        ("ok", _) => text.green().to_string(),
        ("skipped", _) => text.yellow().to_string(),
        ("errors", _) => text.red().to_string(),
        _ => text,
    }
}
