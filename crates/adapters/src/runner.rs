// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Repeated execution of benchmark targets.
//!
//! Every target runs `iterations` times per attempt. After each attempt all
//! samples collected so far are aggregated; an attempt whose spread is too
//! large triggers another one, up to [`MAX_ATTEMPTS`].

use crate::BenchTarget;
use std::collections::BTreeMap;
use tracing::{error, info, warn};
use urbench_benchmarks::aggregate::{process_results, Aggregation, AggregationConfig, SampleSet};
use urbench_benchmarks::BenchmarkResult;
use urbench_core::{Options, Result};

/// Upper bound on attempts per target.
pub const MAX_ATTEMPTS: usize = 5;

/// Run `target` up to `iterations` times, adding accepted samples to `samples`.
///
/// Returns `false` if the target reported that it cannot run. Samples that
/// failed verification are dropped.
pub async fn run_iterations(
    target: &dyn BenchTarget,
    env: &BTreeMap<String, String>,
    iterations: usize,
    samples: &mut SampleSet,
) -> Result<bool> {
    let name = target.name();
    for iteration in 0..iterations {
        let Some(results) = target.run(env).await? else {
            info!(benchmark = %name, iteration, "did not finish");
            return Ok(false);
        };

        for mut result in results {
            if !result.passed {
                warn!(benchmark = %name, label = %result.label, "verification failed, dropping sample");
                continue;
            }
            info!(
                benchmark = %name,
                iteration,
                label = %result.label,
                value = result.value,
                unit = %result.unit,
                "complete"
            );

            result.lower_is_better = target.lower_is_better();
            result.suite = target.suite();
            result.explicit_group = target.explicit_group();
            if result.unit.is_empty() {
                result.unit = target.unit();
            }
            samples.push(result);
        }
    }
    Ok(true)
}

/// Run `target` until its aggregated results are stable.
///
/// After [`MAX_ATTEMPTS`] attempts, or once the target stops finishing, the
/// last aggregation is returned even if it is still unstable.
pub async fn run_target(
    target: &dyn BenchTarget,
    env: &BTreeMap<String, String>,
    options: &Options,
) -> Result<Vec<BenchmarkResult>> {
    let config = AggregationConfig::new(options.iterations, options.stddev_threshold);
    let mut samples = SampleSet::new();
    let mut aggregation = Aggregation::default();

    for attempt in 1..=MAX_ATTEMPTS {
        let finished = run_iterations(target, env, options.iterations, &mut samples).await?;
        aggregation = process_results(&samples, &config);
        if aggregation.valid {
            return Ok(aggregation.results);
        }
        if !finished {
            warn!(
                benchmark = %target.name(),
                attempt,
                "did not finish, keeping the unstable aggregation"
            );
            return Ok(aggregation.results);
        }
        info!(benchmark = %target.name(), attempt, samples = samples.sample_count(), "results unstable");
    }

    warn!(
        benchmark = %target.name(),
        attempts = MAX_ATTEMPTS,
        "results still unstable, keeping the last aggregation"
    );
    Ok(aggregation.results)
}

/// Set up, run and tear down every target in order.
///
/// A target whose setup or run fails is logged and skipped, unless
/// `exit_on_failure` is set, in which case the error is returned.
pub async fn run_all(
    targets: &mut [Box<dyn BenchTarget>],
    env: &BTreeMap<String, String>,
    options: &Options,
) -> Result<Vec<BenchmarkResult>> {
    let mut ready = Vec::with_capacity(targets.len());
    for target in targets.iter_mut() {
        info!(benchmark = %target.name(), "setting up");
        match target.setup().await {
            Ok(()) => ready.push(true),
            Err(e) if options.exit_on_failure => return Err(e),
            Err(e) => {
                error!(benchmark = %target.name(), error = %e, "setup failed");
                ready.push(false);
            }
        }
    }

    let mut results = Vec::new();
    for (target, ready) in targets.iter().zip(ready) {
        if !ready {
            continue;
        }
        match run_target(target.as_ref(), env, options).await {
            Ok(processed) => results.extend(processed),
            Err(e) if options.exit_on_failure => return Err(e),
            Err(e) => error!(benchmark = %target.name(), error = %e, "failed"),
        }
    }

    for target in targets.iter_mut() {
        info!(benchmark = %target.name(), "tearing down");
        if let Err(e) = target.teardown().await {
            warn!(benchmark = %target.name(), error = %e, "teardown failed");
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockBenchTarget;
    use urbench_core::Error;

    fn mock_target(name: &str) -> MockBenchTarget {
        let mut mock = MockBenchTarget::new();
        mock.expect_name().return_const(name.to_string());
        mock.expect_unit().return_const("ms".to_string());
        mock.expect_lower_is_better().return_const(false);
        mock.expect_suite().return_const("Mock".to_string());
        mock.expect_explicit_group().return_const(None::<String>);
        mock
    }

    fn options(iterations: usize) -> Options {
        Options {
            iterations,
            ..Options::default()
        }
    }

    #[tokio::test]
    async fn test_iterations_annotate_and_drop_failures() {
        let mut mock = mock_target("bench");
        let mut call = 0;
        mock.expect_run().times(3).returning(move |_| {
            call += 1;
            let result = BenchmarkResult::new("bench", 10.0);
            Ok(Some(vec![if call == 2 { result.failed() } else { result }]))
        });

        let mut samples = SampleSet::new();
        let finished = run_iterations(&mock, &BTreeMap::new(), 3, &mut samples)
            .await
            .unwrap();

        assert!(finished);
        let kept = samples.get("bench").unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].unit, "ms");
        assert_eq!(kept[0].suite, "Mock");
        assert!(!kept[0].lower_is_better);
    }

    #[tokio::test]
    async fn test_stable_target_runs_one_attempt() {
        let mut mock = mock_target("stable");
        mock.expect_run()
            .times(3)
            .returning(|_| Ok(Some(vec![BenchmarkResult::new("stable", 5.0)])));

        let results = run_target(&mock, &BTreeMap::new(), &options(3)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, 5.0);
        assert_eq!(results[0].stddev, Some(0.0));
    }

    #[tokio::test]
    async fn test_unstable_target_stops_after_max_attempts() {
        let mut mock = mock_target("noisy");
        let mut call = 0usize;
        mock.expect_run()
            .times(3 * MAX_ATTEMPTS)
            .returning(move |_| {
                call += 1;
                let value = if call % 2 == 0 { 100.0 } else { 1.0 };
                Ok(Some(vec![BenchmarkResult::new("noisy", value)]))
            });

        let results = run_target(&mock, &BTreeMap::new(), &options(3)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].stddev.unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_unfinished_target_yields_nothing() {
        let mut mock = mock_target("qs");
        mock.expect_run().times(1).returning(|_| Ok(None));

        let results = run_target(&mock, &BTreeMap::new(), &options(3)).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_unfinished_target_is_not_retried() {
        let mut mock = mock_target("flaky");
        let mut call = 0;
        mock.expect_run().times(3).returning(move |_| {
            call += 1;
            match call {
                1 => Ok(Some(vec![BenchmarkResult::new("flaky", 1.0)])),
                2 => Ok(Some(vec![BenchmarkResult::new("flaky", 100.0)])),
                _ => Ok(None),
            }
        });

        let results = run_target(&mock, &BTreeMap::new(), &options(2)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].stddev.unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_run_all_skips_failed_setup() {
        let mut broken = mock_target("broken");
        broken
            .expect_setup()
            .times(1)
            .returning(|| Err(Error::invalid_input("missing binary")));
        broken.expect_run().never();
        broken.expect_teardown().times(1).returning(|| Ok(()));

        let mut working = mock_target("working");
        working.expect_setup().times(1).returning(|| Ok(()));
        working
            .expect_run()
            .returning(|_| Ok(Some(vec![BenchmarkResult::new("working", 1.0)])));
        working.expect_teardown().times(1).returning(|| Ok(()));

        let mut targets: Vec<Box<dyn BenchTarget>> = vec![Box::new(broken), Box::new(working)];
        let results = run_all(&mut targets, &BTreeMap::new(), &options(1))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "working");
        assert_eq!(results[0].suite, "Mock");
    }

    #[tokio::test]
    async fn test_run_all_propagates_with_exit_on_failure() {
        let mut failing = mock_target("failing");
        failing.expect_setup().returning(|| Ok(()));
        failing
            .expect_run()
            .returning(|_| Err(Error::parse("failing", "no match")));
        failing.expect_teardown().returning(|| Ok(()));

        let options = Options {
            exit_on_failure: true,
            ..options(1)
        };
        let mut targets: Vec<Box<dyn BenchTarget>> = vec![Box::new(failing)];
        let err = run_all(&mut targets, &BTreeMap::new(), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
