//! # Metrics Server
//!
//! This module defines the `MetricsServer`, which runs an `axum` web server
//! exposing the `Exporter` to a Prometheus scraper.
//!
//! The server provides a single endpoint (`/metrics` by default) which, when
//! scraped, returns the current state of all registered metrics in the
//! Prometheus exposition format. Every other path answers 404.
//!
//! The server listens to the shutdown signal from the main application, stops
//! accepting connections and lets in-flight requests complete.

use super::{exposition::CONTENT_TYPE, Exporter};
use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, trace};

/// A server that exposes metrics to a Prometheus scraper.
pub struct MetricsServer {
    listener: TcpListener,
    path: String,
    exporter: Arc<Exporter>,
    shutdown_rx: watch::Receiver<bool>,
}

impl MetricsServer {
    /// Creates a new `MetricsServer` but does not spawn it.
    ///
    /// # Arguments
    ///
    /// * `listener` - A `TcpListener` that has already been bound to an address.
    /// * `path` - The route serving the metrics, starting with `/`.
    /// * `exporter` - Renders the response body.
    /// * `shutdown_rx` - A watch channel receiver for graceful shutdown.
    pub fn new(
        listener: TcpListener,
        path: impl Into<String>,
        exporter: Exporter,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            listener,
            path: path.into(),
            exporter: Arc::new(exporter),
            shutdown_rx,
        }
    }

    /// The address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Builds the router serving the exporter.
    pub fn router(path: &str, exporter: Arc<Exporter>) -> Router {
        Router::new()
            .route(path, get(render_metrics))
            .with_state(exporter)
    }

    /// Returns a future that runs the server until a shutdown signal is received.
    pub fn run(self) -> impl Future<Output = ()> {
        let app = Self::router(&self.path, self.exporter);
        let mut shutdown_rx = self.shutdown_rx;
        let listener = self.listener;
        let path = self.path;

        async move {
            if let Ok(addr) = listener.local_addr() {
                info!("Serving metrics on http://{}{}", addr, path);
            }
            let shutdown = async move {
                // An error means the sender is gone, which is also a shutdown.
                let _ = shutdown_rx.changed().await;
                trace!("Metrics server received shutdown signal.");
            };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("Metrics server error: {}", e);
            }
            trace!("Metrics server task finished.");
        }
    }
}

async fn render_metrics(State(exporter): State<Arc<Exporter>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], exporter.render())
}
