// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! compute-benchmarks suite.
//!
//! Micro-benchmarks measuring API overhead and memory throughput of the
//! SYCL runtime, and of Unified Runtime when a UR install is given. All
//! binaries share one CMake build and report results as CSV.

use super::{parse_csv_output, run_bench};
use crate::{BenchTarget, Suite};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use urbench_benchmarks::BenchmarkResult;
use urbench_core::execution::{self, CommandSpec};
use urbench_core::{fetch, workdir, Options, Result};

/// Suite name of compute-benchmarks results.
pub const SUITE_NAME: &str = "Compute Benchmarks";

/// compute-benchmarks repository.
pub const REPO_URL: &str = "https://github.com/intel/compute-benchmarks.git";

/// Revision checked out.
pub const REPO_REF: &str = "master";

const REPO_DIR: &str = "compute-benchmarks-repo";
const BUILD_DIR: &str = "compute-benchmarks-build";

/// Shape of one compute benchmark invocation.
#[derive(Debug, Clone)]
pub struct ComputeBenchmark {
    options: Arc<Options>,
    bin_dir: PathBuf,
    bench: &'static str,
    test: &'static str,
    name: String,
    args: Vec<String>,
    unit: &'static str,
    lower_is_better: bool,
}

impl ComputeBenchmark {
    fn new(
        options: &Arc<Options>,
        bin_dir: &Path,
        bench: &'static str,
        test: &'static str,
        name: String,
        args: Vec<String>,
    ) -> Self {
        Self {
            options: Arc::clone(options),
            bin_dir: bin_dir.to_path_buf(),
            bench,
            test,
            name,
            args,
            unit: "μs",
            lower_is_better: true,
        }
    }

    fn higher_is_better(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self.lower_is_better = false;
        self
    }

    /// Argv used to run the benchmark.
    pub fn command(&self) -> Vec<String> {
        let mut command = vec![
            self.bin_dir.join(self.bench).display().to_string(),
            format!("--test={}", self.test),
            "--csv".to_string(),
            "--noHeaders".to_string(),
        ];
        command.extend(self.args.iter().cloned());
        command
    }
}

fn submit_kernel_args(in_order: bool) -> Vec<String> {
    vec![
        format!("--Ioq={}", u8::from(in_order)),
        "--DiscardEvents=0".to_string(),
        "--MeasureCompletion=0".to_string(),
        "--iterations=100000".to_string(),
        "--Profiling=0".to_string(),
        "--NumKernels=10".to_string(),
        "--KernelExecTime=1".to_string(),
    ]
}

fn order_name(in_order: bool) -> &'static str {
    if in_order {
        "in order"
    } else {
        "out of order"
    }
}

/// Every compute benchmark enabled by `options`.
pub fn compute_benchmarks(options: &Arc<Options>, bin_dir: &Path) -> Vec<ComputeBenchmark> {
    let mut benchmarks = Vec::new();

    let mut apis = vec!["sycl"];
    if options.ur.is_some() {
        apis.push("ur");
    }
    for api in apis {
        let bench = if api == "ur" {
            "api_overhead_benchmark_ur"
        } else {
            "api_overhead_benchmark_sycl"
        };
        for in_order in [true, false] {
            benchmarks.push(ComputeBenchmark::new(
                options,
                bin_dir,
                bench,
                "SubmitKernel",
                format!("{} SubmitKernel {}", bench, order_name(in_order)),
                submit_kernel_args(in_order),
            ));
        }
    }

    for (source, destination) in [("Device", "Device"), ("Host", "Device")] {
        benchmarks.push(ComputeBenchmark::new(
            options,
            bin_dir,
            "memory_benchmark_sycl",
            "QueueInOrderMemcpy",
            format!(
                "memory_benchmark_sycl QueueInOrderMemcpy from {} to {}, size 1024",
                source, destination
            ),
            vec![
                "--iterations=10000".to_string(),
                "--IsCopyOnly=0".to_string(),
                format!("--sourcePlacement={}", source),
                format!("--destinationPlacement={}", destination),
                "--size=1024".to_string(),
                "--count=100".to_string(),
            ],
        ));
    }

    benchmarks.push(ComputeBenchmark::new(
        options,
        bin_dir,
        "memory_benchmark_sycl",
        "QueueMemcpy",
        "memory_benchmark_sycl QueueMemcpy from Device to Device, size 1024".to_string(),
        vec![
            "--iterations=10000".to_string(),
            "--sourcePlacement=Device".to_string(),
            "--destinationPlacement=Device".to_string(),
            "--size=1024".to_string(),
        ],
    ));

    benchmarks.push(
        ComputeBenchmark::new(
            options,
            bin_dir,
            "memory_benchmark_sycl",
            "StreamMemory",
            "memory_benchmark_sycl StreamMemory, placement Device, type Triad, size 10240"
                .to_string(),
            vec![
                "--iterations=10000".to_string(),
                "--type=Triad".to_string(),
                "--size=10240".to_string(),
                "--memoryPlacement=Device".to_string(),
                "--useEvents=0".to_string(),
                "--contents=Zeros".to_string(),
                "--multiplier=1".to_string(),
            ],
        )
        .higher_is_better("GB/s"),
    );

    benchmarks.push(ComputeBenchmark::new(
        options,
        bin_dir,
        "miscellaneous_benchmark_sycl",
        "VectorSum",
        "miscellaneous_benchmark_sycl VectorSum".to_string(),
        vec![
            "--iterations=1000".to_string(),
            "--numberOfElementsX=512".to_string(),
            "--numberOfElementsY=256".to_string(),
            "--numberOfElementsZ=256".to_string(),
        ],
    ));

    benchmarks
}

/// The compute-benchmarks checkout and build.
pub struct ComputeSuite {
    options: Arc<Options>,
    bin_dir: Option<PathBuf>,
}

impl ComputeSuite {
    /// Create the suite. Nothing is fetched until `setup`.
    pub fn new(options: Arc<Options>) -> Self {
        Self {
            options,
            bin_dir: None,
        }
    }

    fn configure_command(&self, repo: &Path, build: &Path) -> CommandSpec {
        let mut spec = CommandSpec::new("cmake")
            .arg("-B")
            .arg(build.display().to_string())
            .arg("-S")
            .arg(repo.display().to_string())
            .arg("-DCMAKE_BUILD_TYPE=Release")
            .arg("-DBUILD_SYCL=ON")
            .arg("-DALLOW_WARNINGS=ON")
            .timeout(self.options.timeout());
        if let Some(sycl) = &self.options.sycl {
            spec = spec
                .arg(format!("-DSYCL_COMPILER_ROOT={}", sycl.display()))
                .with_sycl(sycl);
        }
        if let Some(ur) = &self.options.ur {
            spec = spec.arg("-DBUILD_UR=ON").arg(format!(
                "-Dunified-runtime_DIR={}",
                ur.join("lib").join("cmake").join("unified-runtime").display()
            ));
        }
        spec
    }
}

#[async_trait]
impl Suite for ComputeSuite {
    fn name(&self) -> &str {
        SUITE_NAME
    }

    async fn setup(&mut self) -> Result<()> {
        let options = Arc::clone(&self.options);
        let repo = fetch::git_clone(&options.workdir, REPO_DIR, REPO_URL, REPO_REF, options.timeout())
            .await?;
        let build = workdir::create_build_path(&options.workdir, BUILD_DIR, options.rebuild)?;
        info!(build = %build.display(), "building compute-benchmarks");

        execution::run(&self.configure_command(&repo, &build)).await?;

        let mut compile = CommandSpec::new("cmake")
            .arg("--build")
            .arg(build.display().to_string())
            .arg("-j")
            .timeout(options.timeout());
        if let Some(sycl) = &options.sycl {
            compile = compile.with_sycl(sycl);
        }
        execution::run(&compile).await?;

        self.bin_dir = Some(build.join("bin"));
        Ok(())
    }

    fn benchmarks(&self) -> Vec<Box<dyn BenchTarget>> {
        let Some(bin_dir) = &self.bin_dir else {
            return Vec::new();
        };
        compute_benchmarks(&self.options, bin_dir)
            .into_iter()
            .map(|b| Box::new(b) as Box<dyn BenchTarget>)
            .collect()
    }
}

#[async_trait]
impl BenchTarget for ComputeBenchmark {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn unit(&self) -> String {
        self.unit.to_string()
    }

    fn lower_is_better(&self) -> bool {
        self.lower_is_better
    }

    fn suite(&self) -> String {
        SUITE_NAME.to_string()
    }

    fn explicit_group(&self) -> Option<String> {
        Some(self.test.to_string())
    }

    async fn run(&self, env: &BTreeMap<String, String>) -> Result<Option<Vec<BenchmarkResult>>> {
        let command = self.command();
        let stdout = run_bench(&self.options, &command, env).await?;
        let (row_label, value) = parse_csv_output(&self.name, &stdout)?;
        debug!(benchmark = %self.name, row = %row_label, value, "parsed compute output");

        Ok(Some(vec![BenchmarkResult::new(self.name.clone(), value)
            .with_unit(self.unit)
            .with_lower_is_better(self.lower_is_better)
            .with_command(command, env.clone())
            .with_stdout(stdout)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(ur: bool) -> Arc<Options> {
        Arc::new(Options {
            workdir: PathBuf::from("/work"),
            sycl: Some(PathBuf::from("/opt/sycl")),
            ur: ur.then(|| PathBuf::from("/opt/ur")),
            ..Options::default()
        })
    }

    fn bin_dir() -> PathBuf {
        PathBuf::from("/work/compute-benchmarks-build/bin")
    }

    #[test]
    fn test_submit_kernel_command() {
        let benchmarks = compute_benchmarks(&options(false), &bin_dir());
        let in_order = &benchmarks[0];
        assert_eq!(in_order.name, "api_overhead_benchmark_sycl SubmitKernel in order");
        assert_eq!(
            in_order.command(),
            vec![
                "/work/compute-benchmarks-build/bin/api_overhead_benchmark_sycl",
                "--test=SubmitKernel",
                "--csv",
                "--noHeaders",
                "--Ioq=1",
                "--DiscardEvents=0",
                "--MeasureCompletion=0",
                "--iterations=100000",
                "--Profiling=0",
                "--NumKernels=10",
                "--KernelExecTime=1",
            ]
        );
        assert_eq!(
            benchmarks[1].name,
            "api_overhead_benchmark_sycl SubmitKernel out of order"
        );
        assert!(benchmarks[1].command().contains(&"--Ioq=0".to_string()));
    }

    #[test]
    fn test_ur_benchmarks_need_ur_prefix() {
        let without = compute_benchmarks(&options(false), &bin_dir());
        assert!(without.iter().all(|b| !b.name.contains("_ur ")));

        let with = compute_benchmarks(&options(true), &bin_dir());
        assert_eq!(with.len(), without.len() + 2);
        assert!(with
            .iter()
            .any(|b| b.name == "api_overhead_benchmark_ur SubmitKernel in order"));
    }

    #[test]
    fn test_stream_memory_is_throughput() {
        let benchmarks = compute_benchmarks(&options(false), &bin_dir());
        let stream = benchmarks
            .iter()
            .find(|b| b.test == "StreamMemory")
            .unwrap();
        assert!(!stream.lower_is_better());
        assert_eq!(stream.unit(), "GB/s");
        assert_eq!(stream.explicit_group().as_deref(), Some("StreamMemory"));
    }

    #[test]
    fn test_configure_command_flags() {
        let suite = ComputeSuite::new(options(true));
        let spec = suite.configure_command(
            Path::new("/work/compute-benchmarks-repo"),
            Path::new("/work/compute-benchmarks-build"),
        );
        assert!(spec.args.contains(&"-DBUILD_SYCL=ON".to_string()));
        assert!(spec.args.contains(&"-DSYCL_COMPILER_ROOT=/opt/sycl".to_string()));
        assert!(spec.args.contains(&"-DBUILD_UR=ON".to_string()));
        assert!(spec
            .args
            .contains(&"-Dunified-runtime_DIR=/opt/ur/lib/cmake/unified-runtime".to_string()));
        assert!(spec.env["PATH"].starts_with("/opt/sycl/bin"));
    }

    #[test]
    fn test_suite_without_build_has_no_benchmarks() {
        assert!(ComputeSuite::new(options(false)).benchmarks().is_empty());
    }
}
