//! Regression comparison between benchmark runs.
//!
//! A [`Comparison`] lines up the results of several named runs by label and
//! computes, for every label, the relative performance of the baseline run
//! against each other run. A ratio above 1.0 means the baseline performs
//! better than the other run; [`classify`] turns the ratio into an
//! improved/regressed/unchanged verdict using an epsilon threshold.
//!
//! Rows are grouped by suite and grouping tag so reports can summarize each
//! group with the geometric mean of its ratios.

use crate::result::{BenchmarkResult, BenchmarkRun};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Default significance threshold for a relative change.
pub const DEFAULT_EPSILON: f64 = 0.02;

static LABEL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^_\s]+").expect("label prefix pattern is valid"));

/// Relative performance of `baseline` against `other`.
///
/// `other / baseline` when lower is better, `baseline / other` otherwise,
/// so values above 1.0 always favour the baseline. `None` when the
/// denominator is zero.
pub fn relative_performance(baseline: f64, other: f64, lower_is_better: bool) -> Option<f64> {
    let (numerator, denominator) = if lower_is_better {
        (other, baseline)
    } else {
        (baseline, other)
    };
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

/// Verdict for a relative-performance ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    /// Better by more than epsilon.
    Improved,
    /// Worse by more than epsilon.
    Regressed,
    /// Within epsilon.
    Unchanged,
}

/// Classify `ratio` against `epsilon`.
pub fn classify(ratio: f64, epsilon: f64) -> Change {
    let delta = ratio - 1.0;
    if delta.abs() > epsilon {
        if delta > 0.0 {
            Change::Improved
        } else {
            Change::Regressed
        }
    } else {
        Change::Unchanged
    }
}

/// Geometric mean of the strictly positive, finite values.
///
/// Other values are skipped. `None` if nothing is left.
pub fn geometric_mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let mut log_sum = 0.0;
    let mut count = 0usize;
    for value in values {
        if value <= 0.0 || !value.is_finite() {
            continue;
        }
        log_sum += value.ln();
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some((log_sum / count as f64).exp())
}

/// Leading run of characters up to the first underscore or whitespace.
pub fn label_prefix(label: &str) -> &str {
    LABEL_PREFIX
        .find(label)
        .map(|m| m.as_str())
        .unwrap_or(label)
}

/// Report group of a result: its suite plus explicit group or label prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    /// Suite name, possibly empty for results loaded from old history.
    pub suite: String,
    /// Explicit group or label prefix.
    pub group: String,
}

impl GroupKey {
    /// Group key of `result`.
    pub fn of(result: &BenchmarkResult) -> Self {
        let group = match &result.explicit_group {
            Some(group) if !group.is_empty() => group.clone(),
            _ => label_prefix(&result.label).to_string(),
        };
        Self {
            suite: result.suite.clone(),
            group,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.suite.is_empty() {
            write!(f, "{}", self.group)
        } else {
            write!(f, "{} / {}", self.suite, self.group)
        }
    }
}

/// Relative performance of the baseline against one other run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delta {
    /// Name of the run the baseline was compared with.
    pub against: String,
    /// Relative performance ratio.
    pub ratio: f64,
    /// Verdict for the ratio.
    pub change: Change,
}

impl Delta {
    /// Ratio as a percentage (100% = identical).
    pub fn percent(&self) -> f64 {
        self.ratio * 100.0
    }

    /// Signed change as a percentage (0% = identical).
    pub fn change_percent(&self) -> f64 {
        (self.ratio - 1.0) * 100.0
    }
}

/// One label across all compared runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    /// Benchmark label.
    pub label: String,
    /// Report group.
    pub group: GroupKey,
    /// Unit of the values.
    pub unit: String,
    /// Whether a smaller value is better.
    pub lower_is_better: bool,
    /// Result per run, in column order.
    pub values: Vec<Option<BenchmarkResult>>,
    /// Column index of the best value.
    pub best: Option<usize>,
    /// Delta per non-baseline run, in column order.
    pub deltas: Vec<Option<Delta>>,
}

impl ComparisonRow {
    /// Delta against the first non-baseline run.
    pub fn primary(&self) -> Option<&Delta> {
        self.deltas.first().and_then(Option::as_ref)
    }

    fn primary_ratio(&self) -> Option<f64> {
        self.primary().map(|d| d.ratio)
    }
}

/// Rows of one report group.
#[derive(Debug, Clone)]
pub struct GroupSummary<'a> {
    /// Group key.
    pub key: GroupKey,
    /// Rows sorted by primary ratio, best first, rows without delta last.
    pub rows: Vec<&'a ComparisonRow>,
    /// Geometric mean of the primary ratios, if any exist.
    pub geomean: Option<f64>,
}

/// Label-by-label comparison of several runs against a baseline.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Run names in column order.
    pub run_names: Vec<String>,
    /// Name of the baseline run.
    pub baseline: String,
    /// Significance threshold.
    pub epsilon: f64,
    /// One row per label, in order of first appearance.
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    /// Compare `runs` against the run named `baseline`.
    ///
    /// Rows whose baseline value is missing carry no deltas. A baseline
    /// name that matches no run leaves every row without deltas.
    pub fn new(runs: &[BenchmarkRun], baseline: &str, epsilon: f64) -> Self {
        let run_names: Vec<String> = runs.iter().map(|r| r.name.clone()).collect();
        let baseline_index = run_names.iter().position(|n| n == baseline);

        let mut labels: Vec<&str> = Vec::new();
        for run in runs {
            for result in &run.results {
                if !labels.contains(&result.label.as_str()) {
                    labels.push(&result.label);
                }
            }
        }

        let rows = labels
            .into_iter()
            .map(|label| {
                let values: Vec<Option<BenchmarkResult>> =
                    runs.iter().map(|run| run.result(label).cloned()).collect();
                Self::build_row(label, values, baseline_index, &run_names, epsilon)
            })
            .collect();

        Self {
            run_names,
            baseline: baseline.to_string(),
            epsilon,
            rows,
        }
    }

    fn build_row(
        label: &str,
        values: Vec<Option<BenchmarkResult>>,
        baseline_index: Option<usize>,
        run_names: &[String],
        epsilon: f64,
    ) -> ComparisonRow {
        let reference = baseline_index
            .and_then(|i| values[i].as_ref())
            .or_else(|| values.iter().flatten().next())
            .cloned()
            .unwrap_or_else(|| BenchmarkResult::new(label, 0.0));
        let lower_is_better = reference.lower_is_better;

        let mut best: Option<usize> = None;
        for (i, value) in values.iter().enumerate() {
            let Some(value) = value else { continue };
            let better = match best.and_then(|b| values[b].as_ref()) {
                None => true,
                Some(current) if lower_is_better => value.value < current.value,
                Some(current) => value.value > current.value,
            };
            if better {
                best = Some(i);
            }
        }

        let baseline_value = baseline_index.and_then(|i| values[i].as_ref()).map(|r| r.value);
        let deltas = run_names
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != baseline_index)
            .map(|(i, name)| {
                let baseline = baseline_value?;
                let other = values[i].as_ref()?.value;
                let ratio = relative_performance(baseline, other, lower_is_better)?;
                Some(Delta {
                    against: name.clone(),
                    ratio,
                    change: classify(ratio, epsilon),
                })
            })
            .collect();

        ComparisonRow {
            label: label.to_string(),
            group: GroupKey::of(&reference),
            unit: reference.unit.clone(),
            lower_is_better,
            values,
            best,
            deltas,
        }
    }

    /// Names of the runs compared with the baseline, in column order.
    pub fn other_runs(&self) -> impl Iterator<Item = &str> {
        self.run_names
            .iter()
            .filter(move |n| **n != self.baseline)
            .map(String::as_str)
    }

    /// Whether any row has a primary delta.
    pub fn has_deltas(&self) -> bool {
        self.rows.iter().any(|r| r.primary().is_some())
    }

    /// Rows sorted by primary ratio, best first, rows without delta last.
    pub fn sorted_rows(&self) -> Vec<&ComparisonRow> {
        sort_rows(self.rows.iter().collect())
    }

    /// Rows whose primary delta improved, best first.
    pub fn improved(&self) -> Vec<&ComparisonRow> {
        self.sorted_rows()
            .into_iter()
            .filter(|r| r.primary().map(|d| d.change) == Some(Change::Improved))
            .collect()
    }

    /// Rows whose primary delta regressed, worst first.
    pub fn regressed(&self) -> Vec<&ComparisonRow> {
        let mut rows: Vec<&ComparisonRow> = self
            .sorted_rows()
            .into_iter()
            .filter(|r| r.primary().map(|d| d.change) == Some(Change::Regressed))
            .collect();
        rows.reverse();
        rows
    }

    /// Number of rows whose primary delta stayed within epsilon.
    pub fn unchanged_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.primary().map(|d| d.change) == Some(Change::Unchanged))
            .count()
    }

    /// Rows grouped by [`GroupKey`], groups in order of first appearance.
    pub fn groups(&self) -> Vec<GroupSummary<'_>> {
        let mut groups: Vec<(GroupKey, Vec<&ComparisonRow>)> = Vec::new();
        for row in &self.rows {
            match groups.iter_mut().find(|(key, _)| *key == row.group) {
                Some((_, rows)) => rows.push(row),
                None => groups.push((row.group.clone(), vec![row])),
            }
        }

        groups
            .into_iter()
            .map(|(key, rows)| {
                let geomean = geometric_mean(rows.iter().filter_map(|r| r.primary_ratio()));
                GroupSummary {
                    key,
                    rows: sort_rows(rows),
                    geomean,
                }
            })
            .collect()
    }
}

fn sort_rows(mut rows: Vec<&ComparisonRow>) -> Vec<&ComparisonRow> {
    rows.sort_by(|a, b| match (a.primary_ratio(), b.primary_ratio()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows
}
