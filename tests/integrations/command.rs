//! The shell command runner feeding the real sampler.

use sensorwatch::{
    command::{ExecError, ShellCommandRunner},
    extraction::{TrackedField, TRACKED_FIELDS},
    internal_metrics::SamplerMetrics,
    registry::{MetricKind, MetricRegistry},
    sampler::{CycleReport, Sampler},
    CommandRunner,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_shell_output_flows_into_extraction() {
    let runner = ShellCommandRunner::new().with_shell("sh");
    let output = runner
        .run("printf 'Tctl:  +45.1°C\\nPPT:  65.432 W\\n'")
        .await
        .unwrap();

    let fields = TrackedField::compile_all(&TRACKED_FIELDS).unwrap();
    assert_eq!(fields[0].extractor.extract(&output).unwrap(), "45.1");
    assert_eq!(fields[1].extractor.extract(&output).unwrap(), "65.432");
}

#[tokio::test]
async fn test_failing_command_leaves_registry_untouched() {
    let mut registry = MetricRegistry::new();
    for spec in TRACKED_FIELDS {
        registry
            .register(spec.metric, spec.help, MetricKind::Gauge)
            .unwrap();
    }
    let registry = Arc::new(registry);

    // `false -c sensors` exits 1 regardless of whether `sensors` is installed.
    let runner = ShellCommandRunner::new()
        .with_shell("false")
        .with_timeout(Some(Duration::from_secs(5)));
    let sampler = Sampler::new(
        Arc::new(runner),
        TrackedField::compile_all(&TRACKED_FIELDS).unwrap(),
        registry.clone(),
        SamplerMetrics::disabled(),
    );

    match sampler.run_cycle().await {
        CycleReport::CommandFailed(ExecError::NonZeroExit { command, status, .. }) => {
            assert_eq!(command, "sensors");
            assert_eq!(status, Some(1));
        }
        other => panic!("expected a command failure, got {:?}", other),
    }
    assert!(registry.snapshot().iter().all(|s| s.value == 0.0));
}
