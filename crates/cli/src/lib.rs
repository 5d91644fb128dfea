//! CLI for urbench.
//!
//! This crate provides the `urbench` command-line interface: the `run`
//! subcommand driving the full benchmark harness, `compare` for reports
//! built from saved runs only, and `status` for inspecting a working
//! directory.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use anyhow::{bail, Context};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use urbench_adapters::{Harness, HarnessReport};
use urbench_benchmarks::History;
use urbench_core::options::{parse_env_assignments, DEFAULT_COMPARE_NAME};
use urbench_core::workdir::{read_version, WORKDIR_VERSION};
use urbench_core::{CompareMode, Options};

/// urbench CLI.
#[derive(Parser, Debug)]
#[command(name = "urbench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to `urbench.toml` when present).
    #[arg(long, global = true, env = "URBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and run the enabled benchmark suites and write the reports.
    ///
    /// Suites are enabled by their install prefixes: `--sycl` enables the
    /// Compute and Velocity suites, `--umf` the UMF suite.
    Run(RunArgs),

    /// Render reports from saved runs without running anything.
    Compare(CompareArgs),

    /// Show the working directory layout version and saved runs.
    Status {
        /// Working directory to inspect.
        workdir: PathBuf,

        /// List every saved run.
        #[arg(short, long)]
        detailed: bool,
    },
}

/// Report options shared by `run` and `compare`.
#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// How saved runs are combined: latest, average or median.
    #[arg(long = "compare-type", value_name = "TYPE")]
    pub compare_type: Option<CompareMode>,

    /// Number of saved runs used by average and median comparison.
    #[arg(long, value_name = "N")]
    pub compare_max: Option<usize>,

    /// Relative change considered significant.
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Write benchmark_results.html.
    #[arg(long)]
    pub output_html: bool,

    /// Write benchmark_results.md.
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    pub output_markdown: Option<bool>,

    /// Directory the reports are written to.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// GitHub `owner/repo` used for commit links.
    #[arg(long, value_name = "OWNER/REPO")]
    pub github_repo: Option<String>,
}

impl ReportArgs {
    /// Override `options` with the flags given on the command line.
    pub fn apply(&self, options: &mut Options) {
        if let Some(mode) = self.compare_type {
            options.compare = mode;
        }
        if let Some(max) = self.compare_max {
            options.compare_max = max;
        }
        if let Some(epsilon) = self.epsilon {
            options.epsilon = epsilon;
        }
        if self.output_html {
            options.output_html = true;
        }
        if let Some(markdown) = self.output_markdown {
            options.output_markdown = markdown;
        }
        if let Some(dir) = &self.output_dir {
            options.output_dir = dir.clone();
        }
        if let Some(repo) = &self.github_repo {
            options.github_repo = repo.clone();
        }
    }
}

/// Arguments of `urbench run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Working directory for sources, builds and saved results.
    pub workdir: PathBuf,

    /// SYCL compiler root.
    #[arg(long, value_name = "DIR")]
    pub sycl: Option<PathBuf>,

    /// Unified Runtime install prefix.
    #[arg(long, value_name = "DIR")]
    pub ur: Option<PathBuf>,

    /// UMF install prefix.
    #[arg(long, value_name = "DIR")]
    pub umf: Option<PathBuf>,

    /// Unified Runtime adapter.
    #[arg(long, value_name = "NAME")]
    pub adapter: Option<String>,

    /// Keep existing build directories.
    #[arg(long)]
    pub no_rebuild: bool,

    /// Extra environment for benchmark runs.
    #[arg(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,

    /// Save this run into history under NAME.
    #[arg(long, value_name = "NAME")]
    pub save: Option<String>,

    /// Saved runs to compare against, in addition to `baseline`.
    #[arg(long = "compare", value_name = "NAME")]
    pub compare: Vec<String>,

    /// Iterations per attempt.
    #[arg(long, value_name = "N")]
    pub iterations: Option<usize>,

    /// Relative standard deviation that triggers a re-run.
    #[arg(long, value_name = "F")]
    pub stddev_threshold: Option<f64>,

    /// Per-subprocess timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Only run benchmarks whose name matches REGEX.
    #[arg(long, value_name = "REGEX")]
    pub filter: Option<String>,

    /// Log subprocess output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Stop at the first failing benchmark.
    #[arg(long)]
    pub exit_on_failure: bool,

    /// Run no benchmarks and save nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Include the synthetic test suite.
    #[arg(long)]
    pub test_suite: bool,

    /// Report options.
    #[command(flatten)]
    pub report: ReportArgs,
}

impl RunArgs {
    /// Override `options` with the flags given on the command line.
    pub fn apply(&self, options: &mut Options) -> anyhow::Result<()> {
        options.workdir = self.workdir.clone();
        if let Some(sycl) = &self.sycl {
            options.sycl = Some(sycl.clone());
        }
        if let Some(ur) = &self.ur {
            options.ur = Some(ur.clone());
        }
        if let Some(umf) = &self.umf {
            options.umf = Some(umf.clone());
        }
        if let Some(adapter) = &self.adapter {
            options.ur_adapter = adapter.clone();
        }
        if self.no_rebuild {
            options.rebuild = false;
        }
        options
            .extra_env
            .extend(parse_env_assignments(&self.env).context("invalid --env")?);
        if let Some(iterations) = self.iterations {
            options.iterations = iterations;
        }
        if let Some(threshold) = self.stddev_threshold {
            options.stddev_threshold = threshold;
        }
        if let Some(timeout) = self.timeout {
            options.timeout_secs = timeout;
        }
        options.verbose |= self.verbose;
        options.exit_on_failure |= self.exit_on_failure;
        options.dry_run |= self.dry_run;
        options.test_suite |= self.test_suite;
        self.report.apply(options);

        options.validate()?;
        Ok(())
    }

    /// Build the harness for these arguments.
    pub fn harness(&self, options: Options) -> anyhow::Result<Harness> {
        let mut harness = Harness::new(options).with_compare_names(self.compare.clone());
        if let Some(pattern) = &self.filter {
            let filter = Regex::new(pattern)
                .with_context(|| format!("invalid --filter pattern '{}'", pattern))?;
            harness = harness.with_filter(filter);
        }
        if let Some(name) = &self.save {
            harness = harness.with_save_name(name.clone());
        }
        Ok(harness)
    }
}

/// Arguments of `urbench compare`.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Working directory holding the saved results.
    pub workdir: PathBuf,

    /// Saved run the others are compared with.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_COMPARE_NAME)]
    pub baseline: String,

    /// Saved runs to compare, in addition to `baseline`.
    #[arg(long = "compare", value_name = "NAME")]
    pub compare: Vec<String>,

    /// Report options.
    #[command(flatten)]
    pub report: ReportArgs,
}

impl Cli {
    /// Whether debug logging was requested.
    pub fn verbose(&self) -> bool {
        matches!(&self.command, Commands::Run(args) if args.verbose)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the default `urbench=info` filter.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "urbench=debug" } else { "urbench=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Run the CLI command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut options =
        Options::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Run(args) => {
            args.apply(&mut options)?;
            let harness = args.harness(options)?;
            info!(
                workdir = %args.workdir.display(),
                compare = ?harness.compare_names(),
                save = ?args.save,
                "starting benchmark run"
            );
            let report = harness.run().await.context("benchmark run failed")?;
            info!(results = report.results.len(), "benchmark run finished");

            println!(
                "{} {} benchmarks",
                "Completed".green().bold(),
                report.results.len()
            );
            print_outputs(&report);
            Ok(())
        }
        Commands::Compare(args) => {
            options.workdir = args.workdir.clone();
            args.report.apply(&mut options);
            options.validate()?;

            let harness = Harness::new(options).with_compare_names(args.compare.clone());
            info!(
                baseline = %args.baseline,
                compare = ?harness.compare_names(),
                "comparing saved runs"
            );
            let report = harness
                .compare_saved(&args.baseline)
                .with_context(|| format!("failed to compare against '{}'", args.baseline))?;
            print_outputs(&report);
            Ok(())
        }
        Commands::Status { workdir, detailed } => status(&workdir, detailed, &options),
    }
}

fn print_outputs(report: &HarnessReport) {
    if let Some(path) = &report.saved {
        println!("{} {}", "Saved".green(), path.display());
    }
    if let Some(path) = &report.markdown {
        println!("{} {}", "Markdown".cyan(), path.display());
    }
    if let Some(path) = &report.html {
        println!("{} {}", "HTML".cyan(), path.display());
    }
}

fn status(workdir: &Path, detailed: bool, options: &Options) -> anyhow::Result<()> {
    println!("{}", "urbench benchmark harness".bold());
    println!("Version: {}", env!("CARGO_PKG_VERSION"));

    info!(workdir = %workdir.display(), "inspecting working directory");
    if !workdir.is_dir() {
        bail!("working directory {} does not exist", workdir.display());
    }

    match read_version(workdir) {
        Some(version) if version == WORKDIR_VERSION => {
            println!("Workdir: {} (layout {})", workdir.display(), version.green())
        }
        Some(version) => println!(
            "Workdir: {} (layout {}, expected {})",
            workdir.display(),
            version.yellow(),
            WORKDIR_VERSION
        ),
        None => println!("Workdir: {} ({})", workdir.display(), "not initialized".red()),
    }

    let mut history = History::new(workdir);
    history.load(options.history_limit)?;
    debug!(dir = %history.results_dir().display(), runs = history.runs().len(), "history loaded");
    println!("Saved runs: {}", history.runs().len());

    if detailed {
        for run in history.runs() {
            println!(
                "  - {} {} {} ({} results)",
                run.date.format("%Y-%m-%d %H:%M:%S"),
                run.name.bold(),
                run.git_hash,
                run.results.len()
            );
        }
    }

    Ok(())
}
