//! Outlier-filtered aggregation of repeated benchmark samples.
//!
//! Each benchmark is executed several times. The samples collected for a
//! label are reduced to one representative [`BenchmarkResult`]:
//!
//! 1. Outliers are rejected with the modified z-score
//!    (`0.6745 × (x − median) / MAD`), once more samples than the requested
//!    iteration count exist.
//! 2. The relative standard deviation of the survivors decides whether the
//!    whole sample set is trustworthy; if not, the caller re-runs.
//! 3. The median sample is returned, annotated with the standard deviation.

use crate::result::BenchmarkResult;
use tracing::{debug, warn};

/// Scores above this magnitude are outliers.
pub const Z_SCORE_THRESHOLD: f64 = 3.5;

/// Consistency constant relating MAD to the standard deviation.
const MAD_SCALE: f64 = 0.6745;

/// Arithmetic median; the mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator); needs two values.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Modified z-score of every value. All zeros when the MAD is zero.
pub fn modified_z_scores(values: &[f64]) -> Vec<f64> {
    let Some(median) = median(values) else {
        return Vec::new();
    };
    let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    let mad = self::median(&deviations).unwrap_or(0.0);
    if mad == 0.0 {
        return vec![0.0; values.len()];
    }
    values
        .iter()
        .map(|v| MAD_SCALE * (v - median) / mad)
        .collect()
}

/// Samples grouped by label, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    entries: Vec<(String, Vec<BenchmarkResult>)>,
}

impl SampleSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sample under its label.
    pub fn push(&mut self, result: BenchmarkResult) {
        match self.entries.iter_mut().find(|(label, _)| *label == result.label) {
            Some((_, samples)) => samples.push(result),
            None => self.entries.push((result.label.clone(), vec![result])),
        }
    }

    /// Samples recorded for `label`.
    pub fn get(&self, label: &str) -> Option<&[BenchmarkResult]> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, samples)| samples.as_slice())
    }

    /// Iterate over `(label, samples)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[BenchmarkResult])> {
        self.entries
            .iter()
            .map(|(label, samples)| (label.as_str(), samples.as_slice()))
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no label has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of samples across labels.
    pub fn sample_count(&self) -> usize {
        self.entries.iter().map(|(_, s)| s.len()).sum()
    }
}

impl FromIterator<BenchmarkResult> for SampleSet {
    fn from_iter<I: IntoIterator<Item = BenchmarkResult>>(iter: I) -> Self {
        let mut set = SampleSet::new();
        for result in iter {
            set.push(result);
        }
        set
    }
}

/// Aggregation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationConfig {
    /// Requested iterations; outliers are only rejected above this count.
    pub min_samples: usize,
    /// Largest acceptable `stddev / mean`.
    pub stddev_threshold: f64,
    /// Modified z-score beyond which a sample is an outlier.
    pub z_threshold: f64,
}

impl AggregationConfig {
    /// Config with the standard z-score threshold.
    pub fn new(min_samples: usize, stddev_threshold: f64) -> Self {
        Self {
            min_samples,
            stddev_threshold,
            z_threshold: Z_SCORE_THRESHOLD,
        }
    }
}

/// Drop outlying samples from every label holding more than `min_samples`.
///
/// A label whose samples would all be rejected keeps its unfiltered list.
pub fn remove_outliers(samples: &SampleSet, min_samples: usize, threshold: f64) -> SampleSet {
    let mut filtered = SampleSet::new();
    for (label, list) in samples.iter() {
        let kept: Vec<BenchmarkResult> = if list.len() <= min_samples {
            list.to_vec()
        } else {
            let values: Vec<f64> = list.iter().map(|r| r.value).collect();
            let survivors: Vec<BenchmarkResult> = list
                .iter()
                .zip(modified_z_scores(&values))
                .filter(|(_, z)| z.abs() <= threshold)
                .map(|(r, _)| r.clone())
                .collect();
            if survivors.is_empty() {
                list.to_vec()
            } else {
                if survivors.len() < list.len() {
                    debug!(
                        label,
                        removed = list.len() - survivors.len(),
                        "removed outliers"
                    );
                }
                survivors
            }
        };
        filtered.entries.push((label.to_string(), kept));
    }
    filtered
}

/// Outcome of aggregating a sample set.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// False when any label's spread exceeded the threshold.
    pub valid: bool,
    /// One representative result per label.
    pub results: Vec<BenchmarkResult>,
}

/// Reduce every label to its median sample and check the spread.
pub fn process_results(samples: &SampleSet, config: &AggregationConfig) -> Aggregation {
    let mut aggregation = Aggregation {
        valid: true,
        results: Vec::new(),
    };

    for (label, list) in remove_outliers(samples, config.min_samples, config.z_threshold).iter() {
        match list.len() {
            0 => continue,
            1 => {
                aggregation.results.push(list[0].clone());
                continue;
            }
            _ => {}
        }

        let values: Vec<f64> = list.iter().map(|r| r.value).collect();
        let mean = mean(&values).unwrap_or(0.0);
        let stddev = sample_stddev(&values).unwrap_or(0.0);
        let threshold = config.stddev_threshold * mean.abs();

        if stddev > threshold {
            warn!(label, stddev, threshold, "stddev above the threshold");
            aggregation.valid = false;
        }

        let mut sorted = list.to_vec();
        sorted.sort_by(|a, b| a.value.total_cmp(&b.value));
        let mut representative = sorted.swap_remove((sorted.len() - 1) / 2);
        representative.stddev = Some(stddev);
        aggregation.results.push(representative);
    }

    aggregation
}
