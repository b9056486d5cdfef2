//! Core domain types and service traits for sensorwatch
//!
//! This module defines the data that flows through one sampling cycle and the
//! trait contract for the component that talks to the outside world.

use crate::command::ExecError;
use async_trait::async_trait;

/// A single reading produced by one sampling cycle.
///
/// Readings are transient: they live for the duration of the cycle that
/// produced them and are never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// The tracked field this reading belongs to (e.g. "temperature").
    pub field: &'static str,
    /// The substring captured from the raw command output.
    pub raw: String,
    /// The converted numeric value.
    pub value: f64,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Executes an external command and captures its standard output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command` to completion.
    ///
    /// # Returns
    /// * `Ok(stdout)` when the command exits successfully
    /// * `Err(ExecError)` when it cannot be started, exits non-zero, or times out
    async fn run(&self, command: &str) -> Result<String, ExecError>;
}
