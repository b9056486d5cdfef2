//! # Exporter
//!
//! Turns the registry into an HTTP response body.
//!
//! - **`Exporter`**: renders the registry snapshot, followed by the internal
//!   operational metrics when they are enabled. Nothing is cached: every call
//!   reads the registry as it is at that moment.
//! - **`MetricsServer`**: (Defined in `server.rs`) the `axum` server exposing
//!   the exporter on the configured path.

pub mod exposition;
pub mod server;

use crate::registry::MetricRegistry;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

pub use server::MetricsServer;

#[derive(Clone)]
pub struct Exporter {
    registry: Arc<MetricRegistry>,
    internal: Option<PrometheusHandle>,
}

impl Exporter {
    pub fn new(registry: Arc<MetricRegistry>, internal: Option<PrometheusHandle>) -> Self {
        Self { registry, internal }
    }

    /// Renders the current state of every metric.
    pub fn render(&self) -> String {
        let mut body = exposition::render(&self.registry.snapshot());
        if let Some(handle) = &self.internal {
            body.push_str(&handle.render());
        }
        body
    }
}
