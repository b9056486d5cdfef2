//! Configuration management for sensorwatch
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer built-in defaults, an optional TOML file,
//! `SENSORWATCH_`-prefixed environment variables and command-line flags, in
//! increasing order of precedence.
//!
//! The sampling interval, the diagnostics command and the extraction patterns
//! are deliberately absent: they are fixed at build time.

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use crate::cli::Cli;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Configuration for the HTTP endpoint.
    pub server: ServerConfig,
    /// Configuration for the sampling loop.
    pub sampler: SamplerConfig,
    /// Configuration for the exporter's own operational metrics.
    pub internal_metrics: InternalMetricsConfig,
}

/// Configuration for the HTTP endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to listen on. A leading `:` (e.g. `:9010`) binds all IPv4 interfaces.
    pub listen_address: String,
    /// The path serving the metrics.
    pub metrics_path: String,
}

/// Configuration for the sampling loop.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Upper bound on a single run of the diagnostics command. 0 disables it.
    pub command_timeout_seconds: u64,
}

/// Configuration for the exporter's own operational metrics.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InternalMetricsConfig {
    /// Append sampler counters and timings to the metrics endpoint.
    pub enabled: bool,
}

impl ServerConfig {
    /// The address in a form accepted by `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }
}

impl SamplerConfig {
    pub fn command_timeout(&self) -> Option<Duration> {
        match self.command_timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Config {
    /// Loads the configuration from the layered sources.
    ///
    /// A config file given on the command line must exist.
    pub fn load_from_cli(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &cli.config {
            if !path.exists() {
                bail!("Config file not found at specified path: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Config = figment
            // Allow overriding with environment variables, e.g., SENSORWATCH_SERVER__LISTEN_ADDRESS=:9100
            .merge(Env::prefixed("SENSORWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Checks constraints that deserialization alone cannot express.
    pub fn validate(&self) -> Result<()> {
        let path = &self.server.metrics_path;
        if !path.starts_with('/') {
            bail!("metrics_path must start with '/', got {:?}", path);
        }
        // The path is routed literally; captures and wildcards are not allowed.
        if path.contains(['{', '}'])
            || path.split('/').any(|segment| segment.starts_with([':', '*']))
        {
            bail!("metrics_path must be a literal path, got {:?}", path);
        }
        match self.server.listen_address.rsplit_once(':') {
            Some((_, port)) if port.parse::<u16>().is_ok() => Ok(()),
            _ => bail!(
                "listen_address must include a port, got {:?}",
                self.server.listen_address
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig {
                listen_address: ":9010".to_string(),
                metrics_path: "/metrics".to_string(),
            },
            sampler: SamplerConfig {
                command_timeout_seconds: 30,
            },
            internal_metrics: InternalMetricsConfig { enabled: true },
        }
    }
}
