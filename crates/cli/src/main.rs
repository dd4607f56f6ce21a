//! Pod Usage Monitor CLI
//!
//! Collects pod CPU and memory usage into a CSV record log and analyses it: utilization
//! reports, cost estimates, right-sizing recommendations and log maintenance.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{collect, cost, optimize, report, reset};
use monitor_lib::cost::{CostModel, DEFAULT_CPU_PRICE, DEFAULT_MEMORY_PRICE};
use monitor_lib::optimizer::{Optimizer, DEFAULT_MARGIN_PERCENT};
use monitor_lib::{LabelSelector, Window};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Pod Usage Monitor CLI
#[derive(Parser)]
#[command(name = "podmon")]
#[command(author, version, about = "Pod Usage Monitor: sample pod usage and analyse it", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (in-cluster or default config if not specified)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Output format [default: table]
    #[arg(long, value_enum, global = true)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sample pod usage periodically into the record log
    Collect {
        /// Seconds between samples
        #[arg(long, short, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        /// Record log to append to [default: /data/output.csv]
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Comma-separated namespaces to watch (all namespaces if not specified)
        #[arg(long, short, value_delimiter = ',')]
        namespaces: Vec<String>,

        /// Label filter, e.g. app=api,tier=backend
        #[arg(long, short)]
        labels: Option<LabelSelector>,

        /// Wait before retrying a failed usage query, in milliseconds
        #[arg(long, default_value_t = 1000)]
        retry_delay_ms: u64,
    },

    /// Utilization report: summary, namespaces, top consumers, anomalies
    Report {
        /// Record log to analyse [default: /data/output.csv]
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Only analyse this trailing period (e.g. 1h, 24h, 7d)
        #[arg(long, short, default_value = "24h")]
        last: Window,
    },

    /// Estimated resource cost per cluster, namespace and pod
    Cost {
        /// Record log to analyse [default: /data/output.csv]
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Price of one CPU core per hour, in dollars [default: 0.02]
        #[arg(long)]
        cpu_price: Option<f64>,

        /// Price of one GiB of memory per hour, in dollars [default: 0.01]
        #[arg(long)]
        mem_price: Option<f64>,

        /// Only analyse this trailing period (e.g. 1h, 24h, 7d)
        #[arg(long)]
        last: Option<Window>,
    },

    /// Right-sizing recommendations for requests and limits
    Optimize {
        /// Record log to analyse [default: /data/output.csv]
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Safety margin in percent [default: 20]
        #[arg(long, short)]
        margin: Option<u32>,

        /// Only analyse this trailing period (e.g. 1h, 24h, 7d)
        #[arg(long)]
        last: Option<Window>,
    },

    /// Discard all samples in the record log
    Reset {
        /// Record log to clear [default: /data/output.csv]
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = config::Config::load()?;
    let format = cli.format.or(config.format).unwrap_or_default();

    match cli.command {
        Commands::Collect {
            interval,
            output,
            namespaces,
            labels,
            retry_delay_ms,
        } => {
            collect::collect(collect::CollectOptions {
                interval: Duration::from_secs(interval),
                output: config.log_path(output),
                namespaces,
                labels: labels.unwrap_or_default(),
                retry_delay: Duration::from_millis(retry_delay_ms),
                kubeconfig: cli.kubeconfig,
            })
            .await?;
        }
        Commands::Report { file, last } => {
            report::show_report(&config.log_path(file), last, cli.kubeconfig, format).await?;
        }
        Commands::Cost {
            file,
            cpu_price,
            mem_price,
            last,
        } => {
            let model = CostModel::new(
                cpu_price.or(config.cpu_price).unwrap_or(DEFAULT_CPU_PRICE),
                mem_price.or(config.mem_price).unwrap_or(DEFAULT_MEMORY_PRICE),
            );
            cost::show_costs(&config.log_path(file), model, last, format)?;
        }
        Commands::Optimize { file, margin, last } => {
            let optimizer =
                Optimizer::new(margin.or(config.margin).unwrap_or(DEFAULT_MARGIN_PERCENT));
            optimize::show_recommendations(
                &config.log_path(file),
                optimizer,
                last,
                cli.kubeconfig,
                format,
            )
            .await?;
        }
        Commands::Reset { file } => {
            reset::reset(&config.log_path(file))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_collect_flags() {
        let cli = Cli::try_parse_from([
            "podmon", "collect", "-i", "30", "-o", "/tmp/u.csv", "-n", "a,b", "-l", "app=api",
        ])
        .unwrap();

        match cli.command {
            Commands::Collect {
                interval,
                output,
                namespaces,
                labels,
                retry_delay_ms,
            } => {
                assert_eq!(interval, 30);
                assert_eq!(output, Some(PathBuf::from("/tmp/u.csv")));
                assert_eq!(namespaces, vec!["a", "b"]);
                assert_eq!(labels.unwrap().to_string(), "app=api");
                assert_eq!(retry_delay_ms, 1000);
            }
            _ => panic!("expected collect"),
        }
    }

    #[test]
    fn test_report_window_is_validated() {
        assert!(Cli::try_parse_from(["podmon", "report", "--last", "soon"]).is_err());
        assert!(Cli::try_parse_from(["podmon", "report", "-l", "7d"]).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Cli::try_parse_from(["podmon", "collect", "-i", "0"]).is_err());
    }

    #[test]
    fn test_bad_labels_rejected() {
        assert!(Cli::try_parse_from(["podmon", "collect", "-l", "app"]).is_err());
    }
}
