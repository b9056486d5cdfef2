//! Pattern extraction of sensor values from free-text command output
//!
//! Each tracked field owns one pre-compiled regular expression with exactly
//! one capture group. Fields are extracted independently so that a missing
//! line for one sensor never hides the value of another.

use regex::Regex;
use thiserror::Error;

/// Static description of one field scraped from the diagnostics output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Short field name used in logs and labels.
    pub field: &'static str,
    /// The gauge this field is published as.
    pub metric: &'static str,
    /// Help text for the gauge.
    pub help: &'static str,
    /// Pattern with exactly one capture group around the numeric value.
    pub pattern: &'static str,
}

/// The fields read from `sensors` on every cycle.
pub const TRACKED_FIELDS: [FieldSpec; 2] = [
    FieldSpec {
        field: "temperature",
        metric: "cpu_temperature_celsius",
        help: "Current temperature of the CPU in degrees Celsius",
        pattern: r"Tctl:\s*\+([0-9.]+)°C",
    },
    FieldSpec {
        field: "power",
        metric: "power_usage_watts",
        help: "Current power usage in watts",
        pattern: r"PPT:\s*([0-9.]+)\s*W",
    },
];

/// The pattern had no match in the text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no match for pattern `{pattern}`")]
pub struct NotFoundError {
    pub pattern: String,
}

/// An extraction pattern that cannot be used.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("invalid pattern `{pattern}`: {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern `{pattern}` must contain exactly one capture group, found {found}")]
    CaptureGroups { pattern: String, found: usize },
}

/// A compiled single-capture-group pattern.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    regex: Regex,
}

impl PatternExtractor {
    /// Compiles `pattern`, rejecting it unless it has exactly one capture group.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(pattern).map_err(|source| PatternError::Invalid {
            pattern: pattern.to_string(),
            source,
        })?;

        // `captures_len` counts the implicit whole-match group.
        let found = regex.captures_len() - 1;
        if found != 1 {
            return Err(PatternError::CaptureGroups {
                pattern: pattern.to_string(),
                found,
            });
        }

        Ok(Self { regex })
    }

    /// Returns the capture group of the first match in `text`.
    pub fn extract<'t>(&self, text: &'t str) -> Result<&'t str, NotFoundError> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| NotFoundError {
                pattern: self.regex.as_str().to_string(),
            })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// A `FieldSpec` with its pattern compiled.
#[derive(Debug, Clone)]
pub struct TrackedField {
    pub spec: FieldSpec,
    pub extractor: PatternExtractor,
}

impl TrackedField {
    pub fn compile(spec: FieldSpec) -> Result<Self, PatternError> {
        Ok(Self {
            spec,
            extractor: PatternExtractor::new(spec.pattern)?,
        })
    }

    /// Compiles every spec, failing on the first bad pattern.
    pub fn compile_all(specs: &[FieldSpec]) -> Result<Vec<Self>, PatternError> {
        specs.iter().copied().map(Self::compile).collect()
    }
}
