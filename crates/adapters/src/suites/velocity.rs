// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Velocity-Bench suite.
//!
//! SYCL ports of real applications. The suite clones Velocity-Bench at a
//! pinned commit; every benchmark then fetches its own input data, builds
//! its `SYCL` directory with CMake and parses a figure of merit from the
//! application's output.

use super::run_bench;
use crate::{BenchTarget, Suite};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use urbench_benchmarks::BenchmarkResult;
use urbench_core::execution::{self, CommandSpec};
use urbench_core::{fetch, workdir, Error, Options, Result};

/// Suite name of Velocity-Bench results.
pub const SUITE_NAME: &str = "Velocity-Bench";

/// Velocity-Bench repository.
pub const REPO_URL: &str = "https://github.com/oneapi-src/Velocity-Bench/";

/// Pinned Velocity-Bench commit.
pub const REPO_COMMIT: &str = "b22215c16f789100449c34bf4eaa3fb178983d69";

const REPO_DIR: &str = "velocity-bench-repo";

const SOBEL_DATA_URL: &str =
    "https://github.com/oneapi-src/Velocity-Bench/raw/main/sobel_filter/res/sobel_filter_data.tgz?download=";
const EASYWAVE_DATA_URL: &str =
    "https://git.gfz-potsdam.de/id2/geoperil/easyWave/-/raw/master/data/examples.tar.gz";

static HASHTABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+) million keys/second").expect("valid regex"));
static BITCRACKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"bitcracker - total time for whole calculation: (\d+\.\d+) s").expect("valid regex")
});
static CUDASIFT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Avg workload time = (\d+\.\d+) ms").expect("valid regex"));
static EASYWAVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Model time = (\d{2}:\d{2}:\d{2}),\s+elapsed: (\d+) msec").expect("valid regex")
});
static QUICKSILVER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Figure Of Merit\s+(\d+\.\d+)").expect("valid regex"));
static SOBEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"sobelfilter - total time for whole calculation: (\d+\.\d+) s").expect("valid regex")
});

/// The applications of the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocityKind {
    /// GPU hash table insertions
    Hashtable,
    /// BitLocker password cracking
    Bitcracker,
    /// SIFT feature extraction
    CudaSift,
    /// Tsunami simulation
    Easywave,
    /// Monte Carlo particle transport
    QuickSilver,
    /// Sobel edge detection
    SobelFilter,
}

impl VelocityKind {
    /// Every application, in reporting order.
    pub const ALL: [VelocityKind; 6] = [
        VelocityKind::Hashtable,
        VelocityKind::Bitcracker,
        VelocityKind::CudaSift,
        VelocityKind::Easywave,
        VelocityKind::QuickSilver,
        VelocityKind::SobelFilter,
    ];

    /// Benchmark name, also the result label.
    pub fn name(self) -> &'static str {
        match self {
            VelocityKind::Hashtable => "Velocity-Bench Hashtable",
            VelocityKind::Bitcracker => "Velocity-Bench Bitcracker",
            VelocityKind::CudaSift => "Velocity-Bench CudaSift",
            VelocityKind::Easywave => "Velocity-Bench Easywave",
            VelocityKind::QuickSilver => "Velocity-Bench QuickSilver",
            VelocityKind::SobelFilter => "Velocity-Bench Sobel Filter",
        }
    }

    /// Directory of the application in the repository and in the workdir.
    pub fn dir_name(self) -> &'static str {
        match self {
            VelocityKind::Hashtable => "hashtable",
            VelocityKind::Bitcracker => "bitcracker",
            VelocityKind::CudaSift => "cudaSift",
            VelocityKind::Easywave => "easywave",
            VelocityKind::QuickSilver => "QuickSilver",
            VelocityKind::SobelFilter => "sobel_filter",
        }
    }

    fn bin_name(self) -> &'static str {
        match self {
            VelocityKind::Hashtable => "hashtable_sycl",
            VelocityKind::Bitcracker => "bitcracker",
            VelocityKind::CudaSift => "cudaSift",
            VelocityKind::Easywave => "easyWave_sycl",
            VelocityKind::QuickSilver => "qs",
            VelocityKind::SobelFilter => "sobel_filter",
        }
    }

    /// Unit of the parsed value.
    pub fn unit(self) -> &'static str {
        match self {
            VelocityKind::Hashtable => "M keys/sec",
            VelocityKind::Bitcracker => "s",
            VelocityKind::QuickSilver => "MMS/CTT",
            VelocityKind::CudaSift | VelocityKind::Easywave | VelocityKind::SobelFilter => "ms",
        }
    }

    /// Whether a smaller value is an improvement.
    pub fn lower_is_better(self) -> bool {
        !matches!(self, VelocityKind::Hashtable | VelocityKind::QuickSilver)
    }

    /// Input archive as `(url, file name)`, unpacked into the data directory.
    fn download(self) -> Option<(&'static str, &'static str)> {
        match self {
            VelocityKind::SobelFilter => Some((SOBEL_DATA_URL, "sobel_filter_data.tgz")),
            VelocityKind::Easywave => Some((EASYWAVE_DATA_URL, "examples.tar.gz")),
            _ => None,
        }
    }

    /// Directory holding the application's inputs.
    fn data_path(self, repo: &Path, workdir: &Path) -> PathBuf {
        match self {
            VelocityKind::Bitcracker => repo.join("bitcracker").join("hash_pass"),
            VelocityKind::QuickSilver => repo.join("QuickSilver").join("Examples").join("AllScattering"),
            kind => workdir.join("data").join(kind.dir_name()),
        }
    }

    fn args(self, data: &Path) -> Vec<String> {
        let data = data.display();
        match self {
            VelocityKind::Hashtable => vec!["--no-verify".to_string()],
            VelocityKind::Bitcracker => vec![
                "-f".to_string(),
                format!("{}/img_win8_user_hash.txt", data),
                "-d".to_string(),
                format!("{}/user_passwords_60000.txt", data),
                "-b".to_string(),
                "60000".to_string(),
            ],
            VelocityKind::CudaSift => Vec::new(),
            VelocityKind::Easywave => vec![
                "-grid".to_string(),
                format!("{}/examples/e2Asean.grd", data),
                "-source".to_string(),
                format!("{}/examples/BengkuluSept2007.flt", data),
                "-time".to_string(),
                "120".to_string(),
            ],
            VelocityKind::QuickSilver => {
                vec!["-i".to_string(), format!("{}/scatteringOnly.inp", data)]
            }
            VelocityKind::SobelFilter => vec![
                "-i".to_string(),
                format!("{}/sobel_filter_data/silverfalls_32Kx32K.png", data),
                "-n".to_string(),
                "5".to_string(),
            ],
        }
    }

    fn extra_env(self) -> &'static [(&'static str, &'static str)] {
        match self {
            VelocityKind::QuickSilver => &[("QS_DEVICE", "GPU")],
            VelocityKind::SobelFilter => &[("OPENCV_IO_MAX_IMAGE_PIXELS", "1677721600")],
            _ => &[],
        }
    }

    /// Extract the figure of merit from the application's output.
    ///
    /// Easywave prints nothing useful on stdout; its value is the last
    /// elapsed time in `easywave.log` inside `bench_cwd`.
    pub fn parse_output(self, stdout: &str, bench_cwd: &Path) -> Result<f64> {
        let capture = |re: &Regex| -> Result<f64> {
            let caps = re
                .captures(stdout)
                .ok_or_else(|| Error::parse(self.name(), "failed to parse benchmark output"))?;
            caps[1]
                .parse()
                .map_err(|e| Error::parse(self.name(), format!("invalid number '{}': {}", &caps[1], e)))
        };

        match self {
            VelocityKind::Hashtable => capture(&HASHTABLE_RE),
            VelocityKind::Bitcracker => capture(&BITCRACKER_RE),
            VelocityKind::CudaSift => capture(&CUDASIFT_RE),
            VelocityKind::QuickSilver => capture(&QUICKSILVER_RE),
            VelocityKind::SobelFilter => {
                let seconds = capture(&SOBEL_RE)?;
                Ok((seconds * 1000.0 * 1000.0).round() / 1000.0)
            }
            VelocityKind::Easywave => {
                let log = bench_cwd.join("easywave.log");
                let contents = fs::read_to_string(&log).map_err(|e| {
                    Error::parse(self.name(), format!("cannot read {}: {}", log.display(), e))
                })?;
                last_elapsed_time(&contents)
                    .ok_or_else(|| Error::parse(self.name(), "no elapsed time found in the log file"))
            }
        }
    }
}

/// Elapsed milliseconds of the last `Model time` line in an easyWave log.
fn last_elapsed_time(log: &str) -> Option<f64> {
    log.lines()
        .filter_map(|line| EASYWAVE_RE.captures(line))
        .filter_map(|caps| caps[2].parse::<f64>().ok())
        .last()
}

fn copy_dir_all(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

/// The Velocity-Bench checkout and its applications.
pub struct VelocitySuite {
    options: Arc<Options>,
    repo: Option<PathBuf>,
}

impl VelocitySuite {
    /// Create the suite. Nothing is fetched until `setup`.
    pub fn new(options: Arc<Options>) -> Self {
        Self { options, repo: None }
    }
}

#[async_trait]
impl Suite for VelocitySuite {
    fn name(&self) -> &str {
        SUITE_NAME
    }

    async fn setup(&mut self) -> Result<()> {
        let repo = fetch::git_clone(
            &self.options.workdir,
            REPO_DIR,
            REPO_URL,
            REPO_COMMIT,
            self.options.timeout(),
        )
        .await?;
        self.repo = Some(repo);
        Ok(())
    }

    fn benchmarks(&self) -> Vec<Box<dyn BenchTarget>> {
        let Some(repo) = &self.repo else {
            return Vec::new();
        };
        VelocityKind::ALL
            .into_iter()
            .map(|kind| {
                Box::new(VelocityBenchmark::new(kind, Arc::clone(&self.options), repo.clone()))
                    as Box<dyn BenchTarget>
            })
            .collect()
    }
}

/// One Velocity-Bench application.
pub struct VelocityBenchmark {
    kind: VelocityKind,
    options: Arc<Options>,
    repo: PathBuf,
}

impl VelocityBenchmark {
    /// Application `kind` from the checkout at `repo`.
    pub fn new(kind: VelocityKind, options: Arc<Options>, repo: PathBuf) -> Self {
        Self { kind, options, repo }
    }

    fn build_dir(&self) -> PathBuf {
        self.options.workdir.join(self.kind.dir_name())
    }

    fn binary(&self) -> PathBuf {
        self.build_dir().join(self.kind.bin_name())
    }

    fn data_path(&self) -> PathBuf {
        self.kind.data_path(&self.repo, &self.options.workdir)
    }

    /// Argv used to run the application.
    pub fn command(&self) -> Vec<String> {
        std::iter::once(self.binary().display().to_string())
            .chain(self.kind.args(&self.data_path()))
            .collect()
    }

    async fn download_deps(&self) -> Result<()> {
        if let Some((url, file_name)) = self.kind.download() {
            fetch::download(&self.data_path(), url, file_name, true).await?;
        }
        if self.kind == VelocityKind::CudaSift {
            let images = self.repo.join(self.kind.dir_name()).join("inputData");
            let dest = self.options.workdir.join("inputData");
            if !dest.exists() {
                copy_dir_all(&images, &dest)?;
            }
        }
        Ok(())
    }

    fn cmake(&self) -> CommandSpec {
        let mut spec = CommandSpec::new("cmake").timeout(self.options.timeout());
        if let Some(sycl) = &self.options.sycl {
            spec = spec.with_sycl(sycl);
        }
        spec
    }
}

#[async_trait]
impl BenchTarget for VelocityBenchmark {
    fn name(&self) -> String {
        self.kind.name().to_string()
    }

    fn unit(&self) -> String {
        self.kind.unit().to_string()
    }

    fn lower_is_better(&self) -> bool {
        self.kind.lower_is_better()
    }

    fn suite(&self) -> String {
        SUITE_NAME.to_string()
    }

    async fn setup(&mut self) -> Result<()> {
        self.download_deps().await?;

        let build = workdir::create_build_path(
            &self.options.workdir,
            self.kind.dir_name(),
            self.options.rebuild,
        )?;
        let source = self.repo.join(self.kind.dir_name()).join("SYCL");
        info!(benchmark = %self.kind.name(), build = %build.display(), "building");

        let configure = self
            .cmake()
            .arg("-B")
            .arg(build.display().to_string())
            .arg("-S")
            .arg(source.display().to_string())
            .arg("-DCMAKE_BUILD_TYPE=Release")
            .env("CC", "clang")
            .env("CXX", "clang++");
        execution::run(&configure).await?;

        let compile = self
            .cmake()
            .arg("--build")
            .arg(build.display().to_string())
            .arg("-j");
        execution::run(&compile).await?;
        Ok(())
    }

    async fn run(&self, env: &BTreeMap<String, String>) -> Result<Option<Vec<BenchmarkResult>>> {
        if self.kind == VelocityKind::QuickSilver
            && env.get("UR_L0_USE_IMMEDIATE_COMMANDLISTS").map(String::as_str) == Some("0")
        {
            debug!("QuickSilver does not run without immediate command lists");
            return Ok(None);
        }

        let mut env = env.clone();
        for (key, value) in self.kind.extra_env() {
            env.insert(key.to_string(), value.to_string());
        }

        let command = self.command();
        let stdout = run_bench(&self.options, &command, &env).await?;
        let value = self.kind.parse_output(&stdout, &self.options.bench_cwd())?;

        Ok(Some(vec![BenchmarkResult::new(self.kind.name(), value)
            .with_unit(self.kind.unit())
            .with_lower_is_better(self.kind.lower_is_better())
            .with_command(command, env)
            .with_stdout(stdout)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bench(kind: VelocityKind) -> VelocityBenchmark {
        let options = Arc::new(Options {
            workdir: PathBuf::from("/work"),
            sycl: Some(PathBuf::from("/opt/sycl")),
            ..Options::default()
        });
        VelocityBenchmark::new(kind, options, PathBuf::from("/work/velocity-bench-repo"))
    }

    #[test]
    fn test_parse_hashtable() {
        let out = "Inserted 1 keys\n1234.56 million keys/second\n";
        let value = VelocityKind::Hashtable
            .parse_output(out, Path::new("."))
            .unwrap();
        assert_eq!(value, 1234.56);
        assert!(!VelocityKind::Hashtable.lower_is_better());
    }

    #[test]
    fn test_parse_bitcracker_and_cudasift() {
        let out = "bitcracker - total time for whole calculation: 12.345 s\n";
        assert_eq!(
            VelocityKind::Bitcracker.parse_output(out, Path::new(".")).unwrap(),
            12.345
        );
        let out = "Avg workload time = 3.14 ms\n";
        assert_eq!(
            VelocityKind::CudaSift.parse_output(out, Path::new(".")).unwrap(),
            3.14
        );
    }

    #[test]
    fn test_parse_quicksilver() {
        let out = "Figure Of Merit      25.5 [Num Segments / Cycle Tracking Time]\n";
        assert_eq!(
            VelocityKind::QuickSilver.parse_output(out, Path::new(".")).unwrap(),
            25.5
        );
    }

    #[test]
    fn test_sobel_converts_to_milliseconds() {
        let out = "sobelfilter - total time for whole calculation: 1.2345678 s\n";
        let value = VelocityKind::SobelFilter
            .parse_output(out, Path::new("."))
            .unwrap();
        assert!((value - 1234.568).abs() < 1e-9);
    }

    #[test]
    fn test_parse_failure_names_benchmark() {
        let err = VelocityKind::CudaSift
            .parse_output("nothing here", Path::new("."))
            .unwrap_err();
        assert!(err.to_string().contains("Velocity-Bench CudaSift"));
    }

    #[test]
    fn test_easywave_reads_last_elapsed_time() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("easywave.log"),
            "Model time = 00:01:00,   elapsed: 150 msec\n\
             noise\n\
             Model time = 00:02:00,   elapsed: 320 msec\n",
        )
        .unwrap();
        let value = VelocityKind::Easywave.parse_output("", dir.path()).unwrap();
        assert_eq!(value, 320.0);
    }

    #[test]
    fn test_easywave_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            VelocityKind::Easywave.parse_output("", dir.path()),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            bench(VelocityKind::Hashtable).command(),
            vec!["/work/hashtable/hashtable_sycl", "--no-verify"]
        );
        assert_eq!(
            bench(VelocityKind::Bitcracker).command(),
            vec![
                "/work/bitcracker/bitcracker",
                "-f",
                "/work/velocity-bench-repo/bitcracker/hash_pass/img_win8_user_hash.txt",
                "-d",
                "/work/velocity-bench-repo/bitcracker/hash_pass/user_passwords_60000.txt",
                "-b",
                "60000",
            ]
        );
        assert_eq!(
            bench(VelocityKind::Easywave).command()[2],
            "/work/data/easywave/examples/e2Asean.grd"
        );
        assert_eq!(
            bench(VelocityKind::SobelFilter).command()[2],
            "/work/data/sobel_filter/sobel_filter_data/silverfalls_32Kx32K.png"
        );
        assert_eq!(
            bench(VelocityKind::QuickSilver).command()[2],
            "/work/velocity-bench-repo/QuickSilver/Examples/AllScattering/scatteringOnly.inp"
        );
    }

    #[tokio::test]
    async fn test_quicksilver_skips_without_immediate_command_lists() {
        let mut env = BTreeMap::new();
        env.insert("UR_L0_USE_IMMEDIATE_COMMANDLISTS".to_string(), "0".to_string());
        let result = bench(VelocityKind::QuickSilver).run(&env).await.unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_suite_needs_checkout() {
        let suite = VelocitySuite::new(Arc::new(Options::default()));
        assert!(suite.benchmarks().is_empty());

        let suite = VelocitySuite {
            options: Arc::new(Options::default()),
            repo: Some(PathBuf::from("/repo")),
        };
        let names: Vec<String> = suite.benchmarks().iter().map(|b| b.name()).collect();
        assert_eq!(names.len(), 6);
        assert_eq!(names[5], "Velocity-Bench Sobel Filter");
    }
}
