//! Rendering of registry snapshots in the Prometheus text exposition format.

use crate::registry::MetricSample;
use std::fmt::Write;

/// The content type of the rendered body.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders `# HELP`, `# TYPE` and the sample line for every metric.
pub fn render(samples: &[MetricSample]) -> String {
    let mut out = String::with_capacity(samples.len() * 128);
    for sample in samples {
        // Writing to a `String` cannot fail.
        let _ = writeln!(out, "# HELP {} {}", sample.name, escape_help(&sample.help));
        let _ = writeln!(out, "# TYPE {} {}", sample.name, sample.kind);
        let _ = writeln!(out, "{} {}", sample.name, format_value(sample.value));
    }
    out
}

/// Formats a value as a decimal float, using the exposition spelling for
/// non-finite values.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', r"\\").replace('\n', r"\n")
}
