//! Pod usage monitor library
//!
//! This crate provides the core functionality for:
//! - Sampling pod CPU and memory usage into an append-only record log
//! - Aggregating samples per workload and per namespace
//! - Cost estimation, right-sizing recommendations and spike detection
//! - Health checks and observability for the collector

pub mod aggregate;
pub mod anomaly;
pub mod collector;
pub mod cost;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod optimizer;
pub mod record_log;
pub mod report;
pub mod sources;
pub mod window;

pub use aggregate::{Aggregator, GroupStats, NamespaceStats, WorkloadStats};
pub use error::{MonitorError, Result, SourceError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{CollectorMetrics, StructuredLogger};
pub use record_log::{LoadedSamples, RecordLog, TruncateOutcome};
pub use window::Window;
