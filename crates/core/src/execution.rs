// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Subprocess execution for benchmark binaries and build tools.
//!
//! Every external program the harness touches (benchmark executables,
//! `cmake`, `git`) is described by a [`CommandSpec`] and executed with
//! [`run`]. Output is captured in full, a non-zero exit status becomes
//! [`Error::Process`], and a command that outlives its timeout is killed
//! and reported as [`Error::Timeout`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use urbench_core::execution::{self, CommandSpec};
//!
//! # async fn demo() -> urbench_core::Result<()> {
//! let spec = CommandSpec::new("cmake")
//!     .args(["--build", "build", "-j"])
//!     .env("CC", "clang")
//!     .timeout(Duration::from_secs(600));
//! let output = execution::run(&spec).await?;
//! println!("{}", output.stdout);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Separator used in `PATH`-like variables.
const PATH_SEPARATOR: &str = ":";

/// Description of a command to execute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSpec {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Variables added to the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Working directory, inherited when `None`.
    pub cwd: Option<PathBuf>,
    /// Time budget, unlimited when `None`.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Create a spec for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Create a spec from an argv list. The first element is the program.
    pub fn from_argv<I, S>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv
            .next()
            .ok_or_else(|| Error::invalid_input("command line is empty"))?;
        Ok(Self::new(program).args(argv))
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables.
    pub fn envs<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set the time budget.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Put a SYCL toolchain on `PATH` and `LD_LIBRARY_PATH`.
    pub fn with_sycl(self, sycl_root: &Path) -> Self {
        self.prepend_path("PATH", &[sycl_root.join("bin")])
            .prepend_path("LD_LIBRARY_PATH", &[sycl_root.join("lib")])
    }

    /// Prepend library directories to `LD_LIBRARY_PATH`.
    pub fn with_library_dirs(self, dirs: &[PathBuf]) -> Self {
        if dirs.is_empty() {
            return self;
        }
        self.prepend_path("LD_LIBRARY_PATH", dirs)
    }

    /// Prepend directories to a `PATH`-like variable, keeping the value
    /// already set on this spec or inherited from the current process.
    pub fn prepend_path(mut self, var: &str, dirs: &[PathBuf]) -> Self {
        let existing = self
            .env
            .get(var)
            .cloned()
            .or_else(|| std::env::var(var).ok())
            .filter(|v| !v.is_empty());

        let mut parts: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
        parts.extend(existing);
        self.env.insert(var.to_string(), parts.join(PATH_SEPARATOR));
        self
    }

    /// The full argv, program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Run a command to completion and capture its output.
pub async fn run(spec: &CommandSpec) -> Result<ProcessOutput> {
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &spec.cwd {
        cmd.current_dir(cwd);
    }

    debug!(command = %spec, cwd = ?spec.cwd, "spawning process");
    let child = cmd.spawn()?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match spec.timeout {
        Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Timeout {
                command: spec.to_string(),
                timeout,
            })??,
        None => child.wait_with_output().await?,
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    debug!(command = %spec, %stdout, %stderr, "process finished");

    if !output.status.success() {
        return Err(Error::Process {
            command: spec.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }

    Ok(ProcessOutput { stdout, stderr })
}

/// Short hash of the git `HEAD` in `dir` (or the current directory).
///
/// Returns `"unknown"` when git is unavailable or the directory is not a
/// repository.
pub async fn git_short_hash(dir: Option<&Path>) -> String {
    let mut spec = CommandSpec::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .timeout(Duration::from_secs(30));
    if let Some(dir) = dir {
        spec = spec.cwd(dir);
    }

    match run(&spec).await {
        Ok(output) => {
            let hash = output.stdout.trim();
            if hash.is_empty() {
                "unknown".to_string()
            } else {
                hash.to_string()
            }
        }
        Err(e) => {
            debug!(error = %e, "could not determine git hash");
            "unknown".to_string()
        }
    }
}
