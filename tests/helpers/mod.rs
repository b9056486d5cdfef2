#![allow(dead_code)]
//! Test helpers for running a full application instance.

use anyhow::Result;
use sensorwatch::{
    app::App, command::test_utils::FakeCommandRunner, config::Config, registry::MetricRegistry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::timeout};

/// Output of `sensors` on a Ryzen machine with `zenpower` loaded.
pub const SENSORS_OUTPUT: &str = "\
k10temp-pci-00c3
Adapter: PCI adapter
Tctl:         +45.1°C
Tdie:         +45.1°C

zenpower-pci-00c3
Adapter: PCI adapter
SVI2_Core:     1.10 V
SVI2_P_Core:  17.18 W
PPT:          65.432 W
";

/// Represents a running instance of the application for testing purposes.
pub struct TestApp {
    pub runner: FakeCommandRunner,
    pub registry: Arc<MetricRegistry>,
    shutdown_tx: watch::Sender<bool>,
    app_handle: JoinHandle<Result<()>>,
    metrics_addr: SocketAddr,
}

impl TestApp {
    pub fn metrics_url(&self) -> String {
        format!("http://{}/metrics", self.metrics_addr)
    }

    pub fn metrics_addr(&self) -> SocketAddr {
        self.metrics_addr
    }

    /// Fetches the metrics endpoint and returns the body.
    pub async fn scrape(&self) -> Result<String> {
        let response = reqwest::get(self.metrics_url()).await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Polls the registry until `metric` equals `value`.
    pub async fn wait_for_value(&self, metric: &str, value: f64, within: Duration) {
        let start = std::time::Instant::now();
        while start.elapsed() < within {
            if self.registry.get(metric).unwrap() == value {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Timeout waiting for '{}' to become {}", metric, value);
    }

    /// Shuts down the application and waits for it to terminate.
    pub async fn shutdown(self, timeout_duration: Duration) -> Result<()> {
        self.shutdown_tx.send(true)?;
        match timeout(timeout_duration, self.app_handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(anyhow::anyhow!("App failed to shut down within the timeout")),
        }
    }
}

/// A builder for creating `TestApp` instances.
pub struct TestAppBuilder {
    pub config: Config,
    runner: FakeCommandRunner,
    interval: Duration,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        let mut config = Config::default();
        config.server.listen_address = "127.0.0.1:0".to_string();
        Self {
            config,
            runner: FakeCommandRunner::new(),
            interval: Duration::from_millis(20),
        }
    }

    /// Queue outputs (or failures) on the fake runner before the app starts.
    pub fn with_runner(mut self, runner: FakeCommandRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_internal_metrics(mut self, enabled: bool) -> Self {
        self.config.internal_metrics.enabled = enabled;
        self
    }

    pub async fn start(self) -> Result<TestApp> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = App::builder(self.config)
            .command_runner_override(Arc::new(self.runner.clone()))
            .sampling_interval_override(self.interval)
            .build(shutdown_rx)
            .await?;

        let metrics_addr = app.metrics_addr();
        let registry = app.registry();
        let app_handle = tokio::spawn(app.run());

        Ok(TestApp {
            runner: self.runner,
            registry,
            shutdown_tx,
            app_handle,
            metrics_addr,
        })
    }
}
