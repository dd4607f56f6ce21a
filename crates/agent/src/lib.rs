//! Pod Monitor Agent library: environment configuration and the health/metrics HTTP API

pub mod api;
pub mod config;
