//! Benchmark result types.
//!
//! This module provides the [`BenchmarkResult`] sample produced by one
//! benchmark execution and the [`BenchmarkRun`] record that groups the
//! results of one harness invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One benchmark sample.
///
/// Created per subprocess run. Only the aggregator (`stddev`) and the
/// history store (`date`, `git_hash`) annotate it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Label identifying the benchmark across runs.
    pub label: String,
    /// Measured value.
    pub value: f64,
    /// Unit of `value`.
    #[serde(default)]
    pub unit: String,
    /// Whether a smaller value is an improvement.
    #[serde(default = "default_lower_is_better")]
    pub lower_is_better: bool,
    /// Argv of the command that produced the value.
    #[serde(default)]
    pub command: Vec<String>,
    /// Environment the command ran with.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Raw standard output of the command.
    #[serde(default)]
    pub stdout: String,
    /// Whether the benchmark's own verification passed.
    #[serde(default = "default_passed")]
    pub passed: bool,
    /// Standard deviation of the samples this result represents, when
    /// more than one sample was aggregated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stddev: Option<f64>,
    /// Suite the benchmark belongs to.
    #[serde(default)]
    pub suite: String,
    /// Explicit report group, overriding the label prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_group: Option<String>,
    /// Git hash of the run this result was merged from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub git_hash: String,
    /// Date of the run this result was merged from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

fn default_lower_is_better() -> bool {
    true
}

fn default_passed() -> bool {
    true
}

impl BenchmarkResult {
    /// Create a passing, lower-is-better result.
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            unit: String::new(),
            lower_is_better: true,
            command: Vec::new(),
            env: BTreeMap::new(),
            stdout: String::new(),
            passed: true,
            stddev: None,
            suite: String::new(),
            explicit_group: None,
            git_hash: String::new(),
            date: None,
        }
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the improvement direction.
    pub fn with_lower_is_better(mut self, lower_is_better: bool) -> Self {
        self.lower_is_better = lower_is_better;
        self
    }

    /// Record the command and environment used.
    pub fn with_command(mut self, command: Vec<String>, env: BTreeMap<String, String>) -> Self {
        self.command = command;
        self.env = env;
        self
    }

    /// Record the raw output.
    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    /// Set the suite name.
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = suite.into();
        self
    }

    /// Mark the result as failing verification.
    pub fn failed(mut self) -> Self {
        self.passed = false;
        self
    }
}

/// Results of one harness invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    /// Run name, e.g. `"This PR"` or a `--save` name.
    pub name: String,
    /// Git hash of the tree that was benchmarked.
    #[serde(default)]
    pub git_hash: String,
    /// When the run was recorded.
    pub date: DateTime<Utc>,
    /// Aggregated results.
    pub results: Vec<BenchmarkResult>,
}

impl BenchmarkRun {
    /// Create a run stamped with the current time.
    pub fn new(name: impl Into<String>, git_hash: impl Into<String>, results: Vec<BenchmarkResult>) -> Self {
        Self {
            name: name.into(),
            git_hash: git_hash.into(),
            date: Utc::now(),
            results,
        }
    }

    /// Find the result with `label`.
    pub fn result(&self, label: &str) -> Option<&BenchmarkResult> {
        self.results.iter().find(|r| r.label == label)
    }

    /// Results annotated with this run's date and git hash.
    pub fn annotated_results(&self) -> impl Iterator<Item = BenchmarkResult> + '_ {
        self.results.iter().map(move |r| {
            let mut r = r.clone();
            r.date = Some(self.date);
            r.git_hash = self.git_hash.clone();
            r
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_defaults() {
        let result = BenchmarkResult::new("alloc_size", 12.5).with_unit("μs");
        assert!(result.passed);
        assert!(result.lower_is_better);
        assert_eq!(result.unit, "μs");
        assert!(result.date.is_none());
    }

    #[test]
    fn test_deserialize_minimal_result() {
        let json = r#"{"label": "Velocity-Bench Hashtable", "value": 41.2}"#;
        let result: BenchmarkResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.label, "Velocity-Bench Hashtable");
        assert!(result.lower_is_better);
        assert!(result.passed);
        assert!(result.command.is_empty());
    }

    #[test]
    fn test_annotation_is_not_serialized_when_absent() {
        let json = serde_json::to_string(&BenchmarkResult::new("x", 1.0)).unwrap();
        assert!(!json.contains("git_hash"));
        assert!(!json.contains("\"date\""));
        assert!(!json.contains("stddev"));
    }

    #[test]
    fn test_zero_stddev_survives_round_trip() {
        let mut result = BenchmarkResult::new("x", 1.0);
        result.stddev = Some(0.0);
        let json = serde_json::to_string(&result).unwrap();
        let back: BenchmarkResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stddev, Some(0.0));

        let minimal: BenchmarkResult = serde_json::from_str(r#"{"label": "x", "value": 1.0}"#).unwrap();
        assert_eq!(minimal.stddev, None);
    }

    #[test]
    fn test_annotated_results_carry_run_metadata() {
        let run = BenchmarkRun::new("baseline", "abc1234", vec![BenchmarkResult::new("x", 1.0)]);
        let annotated: Vec<_> = run.annotated_results().collect();
        assert_eq!(annotated[0].git_hash, "abc1234");
        assert_eq!(annotated[0].date, Some(run.date));
        // The stored results stay untouched.
        assert!(run.results[0].date.is_none());
    }
}
