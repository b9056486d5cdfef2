/// sensorwatch - CPU temperature and power exporter
///
/// Periodically runs `sensors`, extracts the CPU temperature and package power
/// from its output, and exposes them as gauges on a Prometheus endpoint.
pub mod app;
pub mod cli;
pub mod command;
pub mod config;
pub mod core;
pub mod exporter;
pub mod extraction;
pub mod internal_metrics;
pub mod registry;
pub mod sampler;
pub mod task_manager;

// Re-export core types for convenience
pub use crate::core::*;
