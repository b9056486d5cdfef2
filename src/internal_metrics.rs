//! # Internal Metrics
//!
//! Operational metrics about the exporter itself: how many sampling cycles
//! ran, how often the diagnostics command failed, and which fields could not
//! be read.
//!
//! The Prometheus recorder is owned by the app instance and used through
//! `metrics::with_local_recorder`, so no global recorder is installed and
//! every app (including every test) gets independent counters.
//!
//! - **`SamplerMetrics`**: cloneable handles used by the sampler.
//! - **`InternalMetricsBuilder`**: builds the recorder and returns the handles
//!   together with the `PrometheusHandle` used by the exporter to render them.

use metrics::{Counter, Histogram, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::sync::Arc;

const COMMAND_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Why a field could not be updated in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    NotFound,
    Conversion,
    Store,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::NotFound => "not_found",
            FailureReason::Conversion => "conversion",
            FailureReason::Store => "store",
        }
    }
}

#[derive(Clone)]
struct FieldCounters {
    not_found: Counter,
    conversion: Counter,
    store: Counter,
}

impl FieldCounters {
    fn register(field: &'static str) -> Self {
        let counter = |reason: FailureReason| {
            metrics::counter!(
                "sensorwatch_field_failures_total",
                "field" => field,
                "reason" => reason.as_str()
            )
        };
        Self {
            not_found: counter(FailureReason::NotFound),
            conversion: counter(FailureReason::Conversion),
            store: counter(FailureReason::Store),
        }
    }
}

/// Handles to the sampler's operational metrics.
#[derive(Clone)]
pub struct SamplerMetrics {
    pub cycles_total: Counter,
    pub command_failures_total: Counter,
    pub command_duration_seconds: Histogram,
    fields: Arc<HashMap<&'static str, FieldCounters>>,
}

impl std::fmt::Debug for SamplerMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerMetrics").finish_non_exhaustive()
    }
}

impl SamplerMetrics {
    /// Describes and registers every sampler metric with the current recorder.
    ///
    /// Must run inside `metrics::with_local_recorder` to bind the handles to
    /// a specific recorder.
    fn register(fields: &[&'static str]) -> Self {
        metrics::describe_counter!(
            "sensorwatch_sampling_cycles_total",
            Unit::Count,
            "Total number of sampling cycles started."
        );
        metrics::describe_counter!(
            "sensorwatch_command_failures_total",
            Unit::Count,
            "Total number of cycles in which the diagnostics command failed."
        );
        metrics::describe_counter!(
            "sensorwatch_field_failures_total",
            Unit::Count,
            "Total number of field updates skipped, labeled by field and reason."
        );
        metrics::describe_histogram!(
            "sensorwatch_command_duration_seconds",
            Unit::Seconds,
            "Time taken by the diagnostics command."
        );

        let fields = fields
            .iter()
            .map(|&field| (field, FieldCounters::register(field)))
            .collect();

        Self {
            cycles_total: metrics::counter!("sensorwatch_sampling_cycles_total"),
            command_failures_total: metrics::counter!("sensorwatch_command_failures_total"),
            command_duration_seconds: metrics::histogram!("sensorwatch_command_duration_seconds"),
            fields: Arc::new(fields),
        }
    }

    /// Creates a `SamplerMetrics` instance that performs no operations.
    /// Used when internal metrics are disabled in the configuration.
    pub fn disabled() -> Self {
        Self {
            cycles_total: Counter::noop(),
            command_failures_total: Counter::noop(),
            command_duration_seconds: Histogram::noop(),
            fields: Arc::new(HashMap::new()),
        }
    }

    /// Increments the failure counter for `field`. Unknown fields are ignored.
    pub fn increment_field_failure(&self, field: &str, reason: FailureReason) {
        if let Some(counters) = self.fields.get(field) {
            match reason {
                FailureReason::NotFound => counters.not_found.increment(1),
                FailureReason::Conversion => counters.conversion.increment(1),
                FailureReason::Store => counters.store.increment(1),
            }
        }
    }
}

/// Builder for the instance-scoped Prometheus recorder.
pub struct InternalMetricsBuilder {
    enabled: bool,
}

impl InternalMetricsBuilder {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Returns the sampler handles and, if enabled, the handle that renders
    /// them in the exposition format.
    pub fn build(
        self,
        fields: &[&'static str],
    ) -> Result<(SamplerMetrics, Option<PrometheusHandle>), BuildError> {
        if !self.enabled {
            return Ok((SamplerMetrics::disabled(), None));
        }

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                COMMAND_DURATION_BUCKETS,
            )?
            .build_recorder();
        let handle = recorder.handle();
        let metrics =
            metrics::with_local_recorder(&recorder, || SamplerMetrics::register(fields));

        Ok((metrics, Some(handle)))
    }
}
