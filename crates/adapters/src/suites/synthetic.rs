// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Synthetic test suite.
//!
//! Produces deterministic values without running anything, so the whole
//! pipeline (aggregation, history, reports) can be exercised on machines
//! without a SYCL toolchain.

use crate::{BenchTarget, Suite};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use urbench_benchmarks::BenchmarkResult;
use urbench_core::Result;

/// Suite name of synthetic results.
pub const SUITE_NAME: &str = "Test";

/// Base name, base value, spread and group of the synthetic benchmarks.
const CONFIGS: [(&str, f64, f64, &str); 5] = [
    ("Memory Bandwidth", 2000.0, 200.0, "Foo Group"),
    ("Latency", 100.0, 20.0, "Bar Group"),
    ("Throughput", 1500.0, 150.0, "Foo Group"),
    ("FLOPS", 3000.0, 300.0, "Foo Group"),
    ("Cache Miss Rate", 250.0, 25.0, "Bar Group"),
];

/// Variants generated per configuration.
const VARIANTS: usize = 6;

/// Suite of synthetic benchmarks.
#[derive(Debug, Default)]
pub struct TestSuite;

impl TestSuite {
    /// Create the suite.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Suite for TestSuite {
    fn name(&self) -> &str {
        SUITE_NAME
    }

    fn benchmarks(&self) -> Vec<Box<dyn BenchTarget>> {
        CONFIGS
            .iter()
            .flat_map(|&(name, value, diff, group)| {
                (0..VARIANTS).map(move |variant| {
                    let multiplier = 1.0 + variant as f64 * 0.2;
                    Box::new(TestBenchmark::new(
                        format!("{} {}", name, variant + 1),
                        value * multiplier,
                        diff * multiplier,
                        group,
                    )) as Box<dyn BenchTarget>
                })
            })
            .collect()
    }
}

/// A benchmark returning `value` with a small deterministic wobble.
///
/// Successive runs cycle through `value`, `value + diff / 1000` and
/// `value - diff / 1000`.
#[derive(Debug)]
pub struct TestBenchmark {
    name: String,
    value: f64,
    diff: f64,
    group: String,
    calls: AtomicUsize,
}

impl TestBenchmark {
    /// Create a synthetic benchmark.
    pub fn new(name: impl Into<String>, value: f64, diff: f64, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            diff,
            group: group.into(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BenchTarget for TestBenchmark {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn unit(&self) -> String {
        "ms".to_string()
    }

    fn suite(&self) -> String {
        SUITE_NAME.to_string()
    }

    fn explicit_group(&self) -> Option<String> {
        Some(self.group.clone())
    }

    async fn run(&self, env: &BTreeMap<String, String>) -> Result<Option<Vec<BenchmarkResult>>> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let offset = match call % 3 {
            0 => 0.0,
            1 => self.diff / 1000.0,
            _ => -self.diff / 1000.0,
        };

        let mut env = env.clone();
        env.insert("A".to_string(), "B".to_string());
        Ok(Some(vec![BenchmarkResult::new(self.name.clone(), self.value + offset)
            .with_unit("ms")
            .with_command(Vec::new(), env)
            .with_stdout("no output")]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_generates_variants() {
        let benchmarks = TestSuite::new().benchmarks();
        assert_eq!(benchmarks.len(), CONFIGS.len() * VARIANTS);
        assert_eq!(benchmarks[0].name(), "Memory Bandwidth 1");
        assert_eq!(benchmarks[5].name(), "Memory Bandwidth 6");
        assert_eq!(benchmarks[6].explicit_group().as_deref(), Some("Bar Group"));
    }

    #[tokio::test]
    async fn test_values_are_deterministic() {
        let bench = TestBenchmark::new("Latency 1", 100.0, 20.0, "Bar Group");
        let env = BTreeMap::new();
        let mut values = Vec::new();
        for _ in 0..4 {
            let results = bench.run(&env).await.unwrap().unwrap();
            values.push(results[0].value);
        }
        let expected = [100.0, 100.02, 99.98, 100.0];
        for (value, expected) in values.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-9, "{} != {}", value, expected);
        }
    }
}
