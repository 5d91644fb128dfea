// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! UMF suite.
//!
//! Runs the allocator benchmark installed with UMF. Nothing is built: the
//! binary is taken from `<umf>/benchmark/` and reports its result as CSV.

use super::{parse_csv_output, run_bench};
use crate::{BenchTarget, Suite};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use urbench_benchmarks::BenchmarkResult;
use urbench_core::{Error, Options, Result};

/// Suite name of UMF results.
pub const SUITE_NAME: &str = "UMF";

/// UMF benchmarks taken from the install prefix.
pub struct UmfSuite {
    options: Arc<Options>,
}

impl UmfSuite {
    /// Create the suite.
    pub fn new(options: Arc<Options>) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Suite for UmfSuite {
    fn name(&self) -> &str {
        SUITE_NAME
    }

    fn benchmarks(&self) -> Vec<Box<dyn BenchTarget>> {
        let Some(prefix) = &self.options.umf else {
            return Vec::new();
        };
        vec![Box::new(UmfBenchmark::new(
            Arc::clone(&self.options),
            prefix.join("benchmark"),
            "umf-benchmark",
        ))]
    }
}

/// One benchmark binary of the UMF install.
pub struct UmfBenchmark {
    options: Arc<Options>,
    bin: PathBuf,
    name: String,
}

impl UmfBenchmark {
    /// Benchmark `name` found in `bin_dir`.
    pub fn new(options: Arc<Options>, bin_dir: PathBuf, name: &str) -> Self {
        Self {
            options,
            bin: bin_dir.join(name),
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl BenchTarget for UmfBenchmark {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn suite(&self) -> String {
        SUITE_NAME.to_string()
    }

    async fn setup(&mut self) -> Result<()> {
        if !self.bin.is_file() {
            return Err(Error::invalid_input(format!(
                "UMF benchmark binary {} not found",
                self.bin.display()
            )));
        }
        Ok(())
    }

    async fn run(&self, env: &BTreeMap<String, String>) -> Result<Option<Vec<BenchmarkResult>>> {
        let command = vec![self.bin.display().to_string()];
        let stdout = run_bench(&self.options, &command, env).await?;
        let (row_label, value) = parse_csv_output(&self.name, &stdout)?;
        debug!(benchmark = %self.name, row = %row_label, value, "parsed UMF output");

        Ok(Some(vec![BenchmarkResult::new(self.name.clone(), value)
            .with_unit(self.unit())
            .with_command(command, env.clone())
            .with_stdout(stdout)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_lists_gbench() {
        let options = Arc::new(Options {
            umf: Some(PathBuf::from("/opt/umf")),
            ..Options::default()
        });
        let benchmarks = UmfSuite::new(options).benchmarks();
        assert_eq!(benchmarks.len(), 1);
        assert_eq!(benchmarks[0].name(), "umf-benchmark");
        assert_eq!(benchmarks[0].suite(), "UMF");
        assert_eq!(benchmarks[0].unit(), "μs");
        assert!(benchmarks[0].lower_is_better());
    }

    #[tokio::test]
    async fn test_setup_requires_binary() {
        let dir = tempfile::tempdir().unwrap();
        let mut bench = UmfBenchmark::new(
            Arc::new(Options::default()),
            dir.path().to_path_buf(),
            "umf-benchmark",
        );
        assert!(matches!(bench.setup().await, Err(Error::InvalidInput(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_parses_csv() {
        use std::os::unix::fs::PermissionsExt;

        let workdir = tempfile::tempdir().unwrap();
        let bin_dir = workdir.path().join("benchmark");
        std::fs::create_dir_all(&bin_dir).unwrap();
        std::fs::create_dir_all(workdir.path().join("bench-cwd")).unwrap();
        let bin = bin_dir.join("umf-benchmark");
        std::fs::write(&bin, "#!/bin/sh\necho 'name,mean'\necho \"alloc,$UMF_SCALE\"\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();

        let options = Arc::new(Options {
            workdir: workdir.path().to_path_buf(),
            ..Options::default()
        });
        let mut bench = UmfBenchmark::new(options, bin_dir, "umf-benchmark");
        bench.setup().await.unwrap();

        let mut env = BTreeMap::new();
        env.insert("UMF_SCALE".to_string(), "4.25".to_string());
        let results = bench.run(&env).await.unwrap().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "umf-benchmark");
        assert_eq!(results[0].value, 4.25);
        assert_eq!(results[0].env.get("UMF_SCALE").map(String::as_str), Some("4.25"));
    }
}
