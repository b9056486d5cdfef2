//! The main application logic, decoupled from the entry point.

use crate::{
    command::ShellCommandRunner,
    config::Config,
    core::CommandRunner,
    exporter::{Exporter, MetricsServer},
    extraction::{TrackedField, TRACKED_FIELDS},
    internal_metrics::InternalMetricsBuilder,
    registry::{MetricKind, MetricRegistry},
    sampler::Sampler,
    task_manager::TaskManager,
};
use anyhow::{Context, Result};
use std::{future::Future, io, net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, instrument};

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    metrics_addr: SocketAddr,
    registry: Arc<MetricRegistry>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The address the metrics server is bound to.
    pub fn metrics_addr(&self) -> SocketAddr {
        self.metrics_addr
    }

    /// The registry shared by the sampler and the exporter.
    pub fn registry(&self) -> Arc<MetricRegistry> {
        self.registry.clone()
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        // `wait_for` also returns when the signal was sent before we got here.
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
        info!("Shutdown signal received. Waiting for tasks to complete...");

        self.task_manager.shutdown().await
    }
}

/// Sends the shutdown signal once `signal` resolves.
///
/// If the signal cannot be listened for, the app keeps running: the sender
/// is held forever, since dropping it would also stop every task.
pub async fn forward_shutdown_signal<F>(signal: F, shutdown_tx: watch::Sender<bool>)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!("Failed to listen for the shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received. Shutting down gracefully...");
    let _ = shutdown_tx.send(true);
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets tests
/// replace the parts that touch the outside world.
pub struct AppBuilder {
    config: Config,
    command_runner_override: Option<Arc<dyn CommandRunner>>,
    sampling_interval_override: Option<Duration>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            command_runner_override: None,
            sampling_interval_override: None,
        }
    }

    /// Replaces the shell command runner, for testing.
    pub fn command_runner_override(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.command_runner_override = Some(runner);
        self
    }

    /// Replaces the fixed sampling interval, for testing.
    pub fn sampling_interval_override(mut self, interval: Duration) -> Self {
        self.sampling_interval_override = Some(interval);
        self
    }

    /// Builds the registry, binds the listener and spawns the sampler and the
    /// metrics server.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let config = self.config;
        config.validate().context("Invalid configuration")?;
        let task_manager = TaskManager::new(shutdown_rx);

        // =========================================================================
        // 1. Registry and extraction patterns
        // =========================================================================
        let fields = TrackedField::compile_all(&TRACKED_FIELDS)?;
        let mut registry = MetricRegistry::new();
        for field in &fields {
            registry.register(field.spec.metric, field.spec.help, MetricKind::Gauge)?;
        }
        let registry = Arc::new(registry);

        // =========================================================================
        // 2. Internal metrics
        // =========================================================================
        let field_names: Vec<&'static str> = fields.iter().map(|f| f.spec.field).collect();
        let (sampler_metrics, internal_handle) =
            InternalMetricsBuilder::new(config.internal_metrics.enabled)
                .build(&field_names)
                .context("Failed to build internal metrics recorder")?;

        // =========================================================================
        // 3. Metrics server
        // =========================================================================
        let bind_address = config.server.bind_address();
        let listener = TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("Failed to bind metrics server to {}", bind_address))?;
        let metrics_addr = listener.local_addr()?;
        let server = MetricsServer::new(
            listener,
            config.server.metrics_path.clone(),
            Exporter::new(registry.clone(), internal_handle),
            task_manager.get_shutdown_rx(),
        );
        task_manager.spawn("MetricsServer", server.run());

        // =========================================================================
        // 4. Sampler
        // =========================================================================
        let runner = match self.command_runner_override {
            Some(runner) => runner,
            None => Arc::new(
                ShellCommandRunner::new().with_timeout(config.sampler.command_timeout()),
            ) as Arc<dyn CommandRunner>,
        };
        let mut sampler = Sampler::new(runner, fields, registry.clone(), sampler_metrics);
        if let Some(interval) = self.sampling_interval_override {
            sampler = sampler.with_interval(interval);
        }
        task_manager.spawn("Sampler", sampler.run(task_manager.get_shutdown_rx()));

        info!("sensorwatch initialized, metrics available on {}", metrics_addr);

        Ok(App {
            task_manager,
            metrics_addr,
            registry,
        })
    }
}
