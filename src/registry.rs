//! The in-memory gauge registry shared by the sampler and the exporter.
//!
//! Metrics are registered while the registry is still exclusively owned
//! (`register` takes `&mut self`). Once it is wrapped in an `Arc` the set of
//! metrics is frozen and only values change. Each value is an `AtomicU64`
//! holding the bits of an `f64`, so readers never observe a partial write.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// The type of a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("metric `{0}` is already registered")]
    Duplicate(String),

    #[error("`{0}` is not a valid metric name")]
    InvalidName(String),

    #[error("metric `{0}` is not registered")]
    UnknownMetric(String),
}

/// A point-in-time copy of one metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub value: f64,
}

#[derive(Debug)]
struct Entry {
    name: String,
    help: String,
    kind: MetricKind,
    bits: AtomicU64,
}

impl Entry {
    fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

/// A fixed set of named gauges.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a metric with an initial value of 0.
    pub fn register(
        &mut self,
        name: &str,
        help: &str,
        kind: MetricKind,
    ) -> Result<(), RegistryError> {
        if !is_valid_metric_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.index.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_string()));
        }

        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(Entry {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            bits: AtomicU64::new(0.0_f64.to_bits()),
        });
        Ok(())
    }

    /// Overwrites the current value of `name`.
    pub fn set(&self, name: &str, value: f64) -> Result<(), RegistryError> {
        let entry = self.entry(name)?;
        entry.bits.store(value.to_bits(), Ordering::Release);
        Ok(())
    }

    /// Returns the current value of `name`.
    pub fn get(&self, name: &str) -> Result<f64, RegistryError> {
        Ok(self.entry(name)?.load())
    }

    /// Copies every metric, in registration order.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        self.entries
            .iter()
            .map(|entry| MetricSample {
                name: entry.name.clone(),
                help: entry.help.clone(),
                kind: entry.kind,
                value: entry.load(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Result<&Entry, RegistryError> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| RegistryError::UnknownMetric(name.to_string()))
    }
}

/// Checks `name` against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
