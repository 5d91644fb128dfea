//! Benchmark targets, suites and the harness that drives them.
//!
//! A [`Suite`] prepares shared sources (clones, builds) and hands out
//! [`BenchTarget`]s. The [`runner`] executes every target repeatedly until
//! its aggregated result is stable, and the [`harness`] ties the run to the
//! history store and the report renderers.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod harness;
pub mod runner;
pub mod suites;

pub use harness::{Harness, HarnessReport};

use async_trait::async_trait;
use std::collections::BTreeMap;
use urbench_benchmarks::BenchmarkResult;
use urbench_core::Result;

/// A single benchmark the harness can set up, run and tear down.
///
/// `run` returns `Ok(None)` when the benchmark cannot produce a result in
/// the given environment; the runner then stops iterating it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BenchTarget: Send + Sync {
    /// Unique display name, matched by `--filter`.
    fn name(&self) -> String;

    /// Unit of the measured value.
    fn unit(&self) -> String {
        "μs".to_string()
    }

    /// Whether a smaller value is an improvement.
    fn lower_is_better(&self) -> bool {
        true
    }

    /// Name of the suite the benchmark belongs to.
    fn suite(&self) -> String;

    /// Report group overriding the label prefix.
    fn explicit_group(&self) -> Option<String> {
        None
    }

    /// Prepare inputs and binaries.
    async fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Run the benchmark once with the given extra environment.
    async fn run(&self, env: &BTreeMap<String, String>) -> Result<Option<Vec<BenchmarkResult>>>;

    /// Release whatever `setup` acquired.
    async fn teardown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A family of benchmarks sharing sources and build steps.
#[async_trait]
pub trait Suite: Send + Sync {
    /// Suite name used in logs and as the suite of every result.
    fn name(&self) -> &str;

    /// Fetch and build what the suite's benchmarks share.
    async fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// The suite's benchmarks. Called after a successful `setup`.
    fn benchmarks(&self) -> Vec<Box<dyn BenchTarget>>;

    /// Release whatever `setup` acquired. Called once the benchmarks ran.
    async fn teardown(&mut self) -> Result<()> {
        Ok(())
    }
}
