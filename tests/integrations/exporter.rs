#[path = "../helpers/mod.rs"]
mod helpers;

use futures::stream::{self, StreamExt};
use helpers::TestAppBuilder;
use sensorwatch::command::test_utils::FakeCommandRunner;
use sensorwatch::exporter::exposition::CONTENT_TYPE;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Checks that every line is blank, a HELP/TYPE comment or a `name value`
/// sample, and returns the samples.
fn parse_exposition(body: &str) -> HashMap<String, f64> {
    let mut samples = HashMap::new();
    for line in body.lines() {
        if line.is_empty() || line.starts_with("# HELP ") || line.starts_with("# TYPE ") {
            continue;
        }
        let (name, value) = line
            .rsplit_once(' ')
            .unwrap_or_else(|| panic!("malformed line: {:?}", line));
        let value: f64 = value
            .parse()
            .unwrap_or_else(|_| panic!("malformed value in line: {:?}", line));
        samples.insert(name.to_string(), value);
    }
    samples
}

/// Output of a cycle that writes `k` to both gauges.
fn output_for(k: u32) -> String {
    format!("Tctl: +{}.5°C\nPPT: {}.25 W\n", k, k)
}

#[tokio::test]
async fn test_metrics_endpoint_headers() {
    let app = TestAppBuilder::new().start().await.unwrap();

    let response = reqwest::get(app.metrics_url()).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        CONTENT_TYPE
    );

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = TestAppBuilder::new().start().await.unwrap();

    let response = reqwest::get(format!("http://{}/other", app.metrics_addr()))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_custom_metrics_path() {
    let mut builder = TestAppBuilder::new();
    builder.config.server.metrics_path = "/sensors".to_string();
    let app = builder.start().await.unwrap();

    let response = reqwest::get(format!("http://{}/sensors", app.metrics_addr()))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("cpu_temperature_celsius"));

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_route_parameter_in_metrics_path_fails_build() {
    for path in ["/:metrics", "/*rest", "/{metrics}"] {
        let mut builder = TestAppBuilder::new();
        builder.config.server.metrics_path = path.to_string();
        let err = match builder.start().await {
            Ok(_) => panic!("{} should not start a server", path),
            Err(e) => e,
        };
        assert!(format!("{:#}", err).contains("metrics_path"), "{:#}", err);
    }
}

#[tokio::test]
async fn test_gauges_read_zero_before_first_success() {
    let runner = FakeCommandRunner::new();
    runner.add_failure(1, "not yet");
    let app = TestAppBuilder::new()
        .with_runner(runner)
        .with_internal_metrics(false)
        .start()
        .await
        .unwrap();

    let samples = parse_exposition(&app.scrape().await.unwrap());
    assert_eq!(samples["cpu_temperature_celsius"], 0.0);
    assert_eq!(samples["power_usage_watts"], 0.0);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_reads_are_stable_between_writes() {
    let runner = FakeCommandRunner::new();
    runner.add_output(&output_for(7));
    let app = TestAppBuilder::new()
        .with_runner(runner)
        .with_internal_metrics(false)
        .start()
        .await
        .unwrap();

    app.wait_for_value("power_usage_watts", 7.25, Duration::from_secs(5))
        .await;
    // All later cycles fail, so nothing writes to the registry any more.
    let first = app.scrape().await.unwrap();
    let second = app.scrape().await.unwrap();
    assert_eq!(first, second);

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_scrapes_during_updates() {
    const REQUESTS: usize = 1000;
    const DISTINCT_OUTPUTS: u32 = 50;

    let runner = FakeCommandRunner::new();
    for k in 1..=DISTINCT_OUTPUTS {
        runner.add_output(&output_for(k));
    }
    runner.set_fallback_output(&output_for(0));
    let app = TestAppBuilder::new()
        .with_runner(runner)
        .with_interval(Duration::from_millis(1))
        .start()
        .await
        .unwrap();

    // A second writer hammers the registry with values from the same set.
    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let registry = app.registry.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut k = 0;
            while !stop.load(Ordering::Relaxed) {
                registry.set("cpu_temperature_celsius", k as f64 + 0.5).unwrap();
                registry.set("power_usage_watts", k as f64 + 0.25).unwrap();
                k = (k + 1) % (DISTINCT_OUTPUTS + 1);
                tokio::task::yield_now().await;
            }
        })
    };

    let client = reqwest::Client::new();
    let url = app.metrics_url();
    let bodies: Vec<String> = stream::iter(0..REQUESTS)
        .map(|_| {
            let client = client.clone();
            let url = url.clone();
            async move {
                let response = client.get(&url).send().await.unwrap();
                assert_eq!(response.status(), 200);
                response.text().await.unwrap()
            }
        })
        .buffer_unordered(64)
        .collect()
        .await;

    stop.store(true, Ordering::Relaxed);
    writer.await.unwrap();
    drop(client);

    assert_eq!(bodies.len(), REQUESTS);
    for body in &bodies {
        let samples = parse_exposition(body);
        let temperature = samples["cpu_temperature_celsius"];
        let power = samples["power_usage_watts"];
        // 0 is the initial value; everything else must be one of the written values.
        assert!(
            temperature == 0.0
                || (temperature.fract() == 0.5 && temperature < DISTINCT_OUTPUTS as f64 + 1.0),
            "unexpected temperature {}",
            temperature
        );
        assert!(
            power == 0.0 || (power.fract() == 0.25 && power < DISTINCT_OUTPUTS as f64 + 1.0),
            "unexpected power {}",
            power
        );
    }

    app.shutdown(Duration::from_secs(5)).await.unwrap();
}
