// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Harness options.
//!
//! Options are layered, lowest precedence first:
//!
//! 1. built-in defaults ([`Options::default`])
//! 2. an optional `urbench.toml` (or the file passed with `--config`)
//! 3. `URBENCH_*` environment variables (e.g. `URBENCH_ITERATIONS=5`)
//! 4. command-line flags, applied by the CLI on top of the loaded value
//!
//! # Example
//!
//! ```no_run
//! use urbench_core::Options;
//!
//! let mut options = Options::load(None)?;
//! options.iterations = 5;
//! options.validate()?;
//! # Ok::<(), urbench_core::Error>(())
//! ```

use crate::error::{Error, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Base name of the optional configuration file (any format `config` knows).
pub const DEFAULT_CONFIG_NAME: &str = "urbench";

/// Prefix of environment variables overriding options.
pub const ENV_PREFIX: &str = "URBENCH";

/// Name recorded for the run produced by the current invocation.
pub const CURRENT_RUN_NAME: &str = "This PR";

/// Run name compared against when none is given.
pub const DEFAULT_COMPARE_NAME: &str = "baseline";

/// How saved runs are turned into a comparison run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Use the most recent run with the requested name.
    #[default]
    Latest,
    /// Average each label over the most recent runs.
    Average,
    /// Take the median of each label over the most recent runs.
    Median,
}

impl CompareMode {
    /// Lowercase name as used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Average => "average",
            Self::Median => "median",
        }
    }
}

impl fmt::Display for CompareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "average" | "mean" => Ok(Self::Average),
            "median" => Ok(Self::Median),
            _ => Err(Error::invalid_input(format!(
                "unknown compare type '{}', expected one of latest, average, median",
                s
            ))),
        }
    }
}

/// Options controlling a harness invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Working directory holding sources, builds and saved results
    pub workdir: PathBuf,
    /// Root of the SYCL compiler
    pub sycl: Option<PathBuf>,
    /// Unified Runtime install prefix
    pub ur: Option<PathBuf>,
    /// UMF install prefix
    pub umf: Option<PathBuf>,
    /// Unified Runtime adapter name
    pub ur_adapter: String,
    /// Wipe build directories before building
    pub rebuild: bool,
    /// Per-subprocess timeout in seconds
    pub timeout_secs: u64,
    /// Iterations per benchmark attempt
    pub iterations: usize,
    /// Relative standard deviation above which results are re-run
    pub stddev_threshold: f64,
    /// Relative change considered significant
    pub epsilon: f64,
    /// Log subprocess output
    pub verbose: bool,
    /// Stop at the first failing benchmark
    pub exit_on_failure: bool,
    /// How saved runs are aggregated for comparison
    pub compare: CompareMode,
    /// Number of saved runs used by average/median comparison
    pub compare_max: usize,
    /// Maximum number of history files loaded
    pub history_limit: usize,
    /// Write the Markdown report
    pub output_markdown: bool,
    /// Write the HTML report
    pub output_html: bool,
    /// Directory receiving the reports
    pub output_dir: PathBuf,
    /// Run nothing and save nothing
    pub dry_run: bool,
    /// Include the synthetic test suite
    pub test_suite: bool,
    /// GitHub `owner/repo` used for commit links
    pub github_repo: String,
    /// Extra environment passed to every benchmark run
    pub extra_env: BTreeMap<String, String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            sycl: None,
            ur: None,
            umf: None,
            ur_adapter: "level_zero".to_string(),
            rebuild: true,
            timeout_secs: 600,
            iterations: 3,
            stddev_threshold: 0.02,
            epsilon: 0.02,
            verbose: false,
            exit_on_failure: false,
            compare: CompareMode::Latest,
            compare_max: 10,
            history_limit: 1000,
            output_markdown: true,
            output_html: false,
            output_dir: PathBuf::from("."),
            dry_run: false,
            test_suite: false,
            github_repo: "oneapi-src/unified-runtime".to_string(),
            extra_env: BTreeMap::new(),
        }
    }
}

impl Options {
    /// Load options from the configuration file and environment.
    ///
    /// With `config_file` set the file must exist; otherwise an
    /// `urbench.*` file in the current directory is used when present.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file = match config_file {
            Some(path) => File::from(path.to_path_buf()).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let options: Options = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        options.validate()?;
        Ok(options)
    }

    /// Reject option combinations the harness cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::Config("iterations must be at least 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout must be at least 1 second".to_string()));
        }
        if self.stddev_threshold.is_nan() || self.stddev_threshold < 0.0 {
            return Err(Error::Config(format!(
                "stddev threshold must be non-negative, got {}",
                self.stddev_threshold
            )));
        }
        if self.epsilon.is_nan() || self.epsilon < 0.0 {
            return Err(Error::Config(format!(
                "epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        if self.compare_max == 0 {
            return Err(Error::Config("compare-max must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Per-subprocess timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Directory benchmarks are executed in.
    pub fn bench_cwd(&self) -> PathBuf {
        self.workdir.join("bench-cwd")
    }

    /// Library directories of the configured install prefixes.
    pub fn library_dirs(&self) -> Vec<PathBuf> {
        [&self.ur, &self.umf]
            .into_iter()
            .flatten()
            .map(|prefix| prefix.join("lib"))
            .collect()
    }
}

/// Parse `KEY=VALUE` assignments given with `--env`.
pub fn parse_env_assignments<S: AsRef<str>>(args: &[S]) -> Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for arg in args {
        let arg = arg.as_ref();
        let (key, value) = arg.split_once('=').ok_or_else(|| {
            Error::invalid_input(format!(
                "environment variable argument '{}' is not in the form Variable=Value",
                arg
            ))
        })?;
        if key.is_empty() {
            return Err(Error::invalid_input(format!(
                "environment variable argument '{}' has an empty name",
                arg
            )));
        }
        env.insert(key.to_string(), value.to_string());
    }
    Ok(env)
}
