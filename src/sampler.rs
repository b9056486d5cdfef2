//! The sampling loop
//!
//! On every tick the sampler runs the diagnostics command once, extracts each
//! tracked field independently, converts it to `f64`, and writes it into the
//! registry. Every failure is local to the cycle (and, for extraction and
//! conversion, local to the field): it is logged and counted, the affected
//! metric keeps its last good value, and the next tick acts as the retry.

use crate::{
    command::ExecError,
    core::{CommandRunner, SensorReading},
    extraction::{NotFoundError, TrackedField},
    internal_metrics::{FailureReason, SamplerMetrics},
    registry::{MetricRegistry, RegistryError},
};
use std::num::ParseFloatError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// The diagnostics command run on every cycle.
pub const DIAGNOSTICS_COMMAND: &str = "sensors";

/// Time between the start of two consecutive cycles.
pub const SAMPLING_INTERVAL: Duration = Duration::from_secs(10);

/// The extracted text is not a floating-point literal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert `{raw}` to a number: {source}")]
pub struct ConversionError {
    pub raw: String,
    #[source]
    pub source: ParseFloatError,
}

/// Why a single field was not updated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The reading could not be written to the registry.
    #[error(transparent)]
    Store(#[from] RegistryError),
}

impl FieldError {
    fn reason(&self) -> FailureReason {
        match self {
            FieldError::NotFound(_) => FailureReason::NotFound,
            FieldError::Conversion(_) => FailureReason::Conversion,
            FieldError::Store(_) => FailureReason::Store,
        }
    }
}

/// The result of one field within a cycle.
#[derive(Debug)]
pub struct FieldOutcome {
    pub field: &'static str,
    pub metric: &'static str,
    pub result: Result<SensorReading, FieldError>,
}

/// What happened during one sampling cycle.
#[derive(Debug)]
pub enum CycleReport {
    /// The command failed; no field was extracted or updated.
    CommandFailed(ExecError),
    /// The command succeeded; one outcome per tracked field, in order.
    Completed(Vec<FieldOutcome>),
}

impl CycleReport {
    /// The readings committed to the registry during this cycle.
    pub fn readings(&self) -> Vec<&SensorReading> {
        match self {
            CycleReport::CommandFailed(_) => Vec::new(),
            CycleReport::Completed(outcomes) => outcomes
                .iter()
                .filter_map(|outcome| outcome.result.as_ref().ok())
                .collect(),
        }
    }

    /// Number of fields that could not be updated.
    pub fn failed_fields(&self) -> usize {
        match self {
            CycleReport::CommandFailed(_) => 0,
            CycleReport::Completed(outcomes) => {
                outcomes.iter().filter(|outcome| outcome.result.is_err()).count()
            }
        }
    }
}

/// Converts an extracted value to `f64`.
pub fn convert(raw: &str) -> Result<f64, ConversionError> {
    raw.parse::<f64>().map_err(|source| ConversionError {
        raw: raw.to_string(),
        source,
    })
}

/// Periodically samples the diagnostics command into the registry.
pub struct Sampler {
    runner: Arc<dyn CommandRunner>,
    command: String,
    fields: Vec<TrackedField>,
    registry: Arc<MetricRegistry>,
    metrics: SamplerMetrics,
    interval: Duration,
}

impl Sampler {
    /// Creates a sampler running `sensors` every `SAMPLING_INTERVAL`.
    ///
    /// Every field's metric must already be registered in `registry`.
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        fields: Vec<TrackedField>,
        registry: Arc<MetricRegistry>,
        metrics: SamplerMetrics,
    ) -> Self {
        Self {
            runner,
            command: DIAGNOSTICS_COMMAND.to_string(),
            fields,
            registry,
            metrics,
            interval: SAMPLING_INTERVAL,
        }
    }

    /// Overrides the interval between cycles.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs a single sampling cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        self.metrics.cycles_total.increment(1);

        let start = Instant::now();
        let result = self.runner.run(&self.command).await;
        self.metrics
            .command_duration_seconds
            .record(start.elapsed().as_secs_f64());

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                self.metrics.command_failures_total.increment(1);
                warn!("Sampling skipped, diagnostics command failed: {}", e);
                return CycleReport::CommandFailed(e);
            }
        };

        let outcomes = self
            .fields
            .iter()
            .map(|field| {
                let result = self.sample_field(field, &output);
                if let Err(e) = &result {
                    self.metrics.increment_field_failure(field.spec.field, e.reason());
                    warn!(
                        field = field.spec.field,
                        metric = field.spec.metric,
                        "Field not updated this cycle: {}",
                        e
                    );
                }
                FieldOutcome {
                    field: field.spec.field,
                    metric: field.spec.metric,
                    result,
                }
            })
            .collect();

        CycleReport::Completed(outcomes)
    }

    fn sample_field(
        &self,
        field: &TrackedField,
        output: &str,
    ) -> Result<SensorReading, FieldError> {
        let raw = field.extractor.extract(output)?;
        let value = convert(raw)?;

        if let Err(e) = self.registry.set(field.spec.metric, value) {
            // Metrics are registered at startup, so this is a wiring bug.
            error!(field = field.spec.field, "Failed to store reading: {}", e);
            return Err(e.into());
        }
        debug!(field = field.spec.field, value, "Reading stored");

        Ok(SensorReading {
            field: field.spec.field,
            raw: raw.to_string(),
            value,
        })
    }

    /// Runs cycles until the shutdown signal is received.
    ///
    /// The first cycle starts immediately. A cycle in progress is abandoned
    /// on shutdown, which kills a still-running command.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            command = %self.command,
            interval = ?self.interval,
            fields = self.fields.len(),
            "Sampler started."
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Sampler received shutdown signal.");
                    break;
                }
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Sampler received shutdown signal during a cycle, aborting it.");
                    break;
                }
                report = self.run_cycle() => {
                    debug!(
                        stored = report.readings().len(),
                        failed = report.failed_fields(),
                        "Sampling cycle finished."
                    );
                }
            }
        }
        info!("Sampler finished.");
    }
}
