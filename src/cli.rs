//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration file and environment variables, taking precedence over both.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Exports CPU temperature and power draw reported by `sensors` as Prometheus gauges.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// The address to listen on for HTTP requests (e.g. ":9010" or "127.0.0.1:9010").
    #[arg(long, value_name = "ADDR")]
    pub listen_address: Option<String>,

    /// The path serving the metrics.
    #[arg(long, value_name = "PATH")]
    pub metrics_path: Option<String>,

    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Timeout for the diagnostics command in seconds (0 disables it).
    #[arg(long, value_name = "SECONDS")]
    pub command_timeout: Option<u64>,

    /// Do not expose the exporter's own operational metrics.
    #[arg(long)]
    pub no_internal_metrics: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut server = Dict::new();
        if let Some(addr) = &self.listen_address {
            server.insert("listen_address".into(), Value::from(addr.clone()));
        }
        if let Some(path) = &self.metrics_path {
            server.insert("metrics_path".into(), Value::from(path.clone()));
        }
        if !server.is_empty() {
            dict.insert("server".into(), Value::Dict(Tag::Default, server));
        }

        if let Some(timeout) = self.command_timeout {
            let mut sampler = Dict::new();
            sampler.insert("command_timeout_seconds".into(), Value::from(timeout));
            dict.insert("sampler".into(), Value::Dict(Tag::Default, sampler));
        }

        // Only an explicit flag overrides the file; absence keeps it untouched.
        if self.no_internal_metrics {
            let mut internal = Dict::new();
            internal.insert("enabled".into(), Value::from(false));
            dict.insert("internal_metrics".into(), Value::Dict(Tag::Default, internal));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
