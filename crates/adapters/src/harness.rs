// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end benchmark run.
//!
//! The [`Harness`] prepares the working directory, sets up the enabled
//! suites, runs every selected benchmark, compares the results with saved
//! runs and writes the reports.

use crate::suites::enabled_suites;
use crate::{runner, BenchTarget, Suite};
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use urbench_benchmarks::compare::Comparison;
use urbench_benchmarks::html::generate_html;
use urbench_benchmarks::io::{write_report, HTML_REPORT, MARKDOWN_REPORT};
use urbench_benchmarks::markdown::generate_markdown;
use urbench_benchmarks::{BenchmarkResult, BenchmarkRun, History};
use urbench_core::execution::git_short_hash;
use urbench_core::options::{CURRENT_RUN_NAME, DEFAULT_COMPARE_NAME};
use urbench_core::workdir::{prepare_workdir, WORKDIR_VERSION};
use urbench_core::{Error, Options, Result};

/// Outcome of a harness invocation.
#[derive(Debug, Default)]
pub struct HarnessReport {
    /// Aggregated results of this run
    pub results: Vec<BenchmarkResult>,
    /// Path of the written Markdown report
    pub markdown: Option<PathBuf>,
    /// Path of the written HTML report
    pub html: Option<PathBuf>,
    /// Path of the history file this run was saved to
    pub saved: Option<PathBuf>,
}

/// Drives suites, the runner, the history store and the reports.
pub struct Harness {
    options: Arc<Options>,
    filter: Option<Regex>,
    save_name: Option<String>,
    compare_names: Vec<String>,
}

impl Harness {
    /// Harness comparing against the default `baseline` run.
    pub fn new(options: Options) -> Self {
        Self {
            options: Arc::new(options),
            filter: None,
            save_name: None,
            compare_names: vec![DEFAULT_COMPARE_NAME.to_string()],
        }
    }

    /// Run only benchmarks whose name matches `filter`.
    pub fn with_filter(mut self, filter: Regex) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Persist the run into history under `name`.
    pub fn with_save_name(mut self, name: impl Into<String>) -> Self {
        self.save_name = Some(name.into());
        self
    }

    /// Also compare against the saved runs in `names`, in order.
    ///
    /// The names are added after the default `baseline`; duplicates are
    /// ignored.
    pub fn with_compare_names(mut self, names: Vec<String>) -> Self {
        for name in names {
            if !self.compare_names.contains(&name) {
                self.compare_names.push(name);
            }
        }
        self
    }

    /// Saved runs the results are compared against.
    pub fn compare_names(&self) -> &[String] {
        &self.compare_names
    }

    /// Options the harness runs with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Run the benchmarks and write the configured reports.
    pub async fn run(&self) -> Result<HarnessReport> {
        let options = &self.options;
        options.validate()?;
        prepare_workdir(&options.workdir, WORKDIR_VERSION)?;
        std::fs::create_dir_all(options.bench_cwd())?;

        let suites = if options.dry_run {
            info!("dry run, no benchmarks will be executed");
            Vec::new()
        } else {
            enabled_suites(options)
        };

        let mut suites = self.setup_suites(suites).await?;
        let mut targets = self.select_targets(&suites);
        info!(count = targets.len(), "benchmarks selected");
        let results = runner::run_all(&mut targets, &options.extra_env, options).await;
        teardown_suites(&mut suites).await;
        let results = results?;

        let mut history = History::new(&options.workdir);
        history.load(options.history_limit)?;

        let git_hash = git_short_hash(None).await;
        let current = History::create_run(CURRENT_RUN_NAME, results.clone(), &git_hash);
        let mut chart = vec![current];
        self.push_compare_runs(&history, &mut chart);

        let mut report = HarnessReport {
            results,
            ..HarnessReport::default()
        };

        if options.output_markdown {
            let comparison = Comparison::new(&chart, CURRENT_RUN_NAME, options.epsilon);
            let path = write_report(
                &options.output_dir,
                MARKDOWN_REPORT,
                &generate_markdown(&comparison),
            )?;
            info!(path = %path.display(), "markdown report written");
            report.markdown = Some(path);
        }

        let mut compare_names = self.compare_names.clone();
        if !options.dry_run {
            let saved_name = self
                .save_name
                .clone()
                .unwrap_or_else(|| CURRENT_RUN_NAME.to_string());
            let run = History::create_run(&saved_name, report.results.clone(), &git_hash);
            report.saved = history.save(run, self.save_name.is_some())?;
            if !compare_names.contains(&saved_name) {
                compare_names.push(saved_name);
            }
        }

        if options.output_html {
            report.html = Some(write_html(&history, &compare_names, options)?);
        }

        Ok(report)
    }

    /// Render reports from saved runs only, comparing against `baseline`.
    pub fn compare_saved(&self, baseline: &str) -> Result<HarnessReport> {
        let options = &self.options;
        let mut history = History::new(&options.workdir);
        history.load(options.history_limit)?;

        let base = history
            .get_compare(baseline, options.compare, options.compare_max)
            .ok_or_else(|| Error::invalid_input(format!("no saved run named '{}'", baseline)))?;
        let mut chart = vec![base];
        self.push_compare_runs(&history, &mut chart);

        let mut report = HarnessReport::default();
        if options.output_markdown {
            let comparison = Comparison::new(&chart, baseline, options.epsilon);
            let path = write_report(
                &options.output_dir,
                MARKDOWN_REPORT,
                &generate_markdown(&comparison),
            )?;
            report.markdown = Some(path);
        }

        if options.output_html {
            let mut names = vec![baseline.to_string()];
            names.extend(
                self.compare_names
                    .iter()
                    .filter(|n| n.as_str() != baseline)
                    .cloned(),
            );
            report.html = Some(write_html(&history, &names, options)?);
        }

        Ok(report)
    }

    /// Set up `suites`, returning the ones that are ready.
    ///
    /// With `exit_on_failure` the first failure tears down the suites set up
    /// so far and is returned.
    async fn setup_suites(&self, suites: Vec<Box<dyn Suite>>) -> Result<Vec<Box<dyn Suite>>> {
        let mut ready: Vec<Box<dyn Suite>> = Vec::new();
        for mut suite in suites {
            info!(suite = suite.name(), "setting up suite");
            match suite.setup().await {
                Ok(()) => ready.push(suite),
                Err(e) if self.options.exit_on_failure => {
                    teardown_suites(&mut ready).await;
                    return Err(e);
                }
                Err(e) => error!(suite = suite.name(), error = %e, "suite setup failed, skipping"),
            }
        }
        Ok(ready)
    }

    fn select_targets(&self, suites: &[Box<dyn Suite>]) -> Vec<Box<dyn BenchTarget>> {
        suites
            .iter()
            .flat_map(|suite| suite.benchmarks())
            .filter(|target| {
                self.filter
                    .as_ref()
                    .map_or(true, |filter| filter.is_match(&target.name()))
            })
            .collect()
    }

    fn push_compare_runs(&self, history: &History, chart: &mut Vec<BenchmarkRun>) {
        let options = &self.options;
        for name in &self.compare_names {
            if chart.iter().any(|run| run.name == *name) {
                continue;
            }
            match history.get_compare(name, options.compare, options.compare_max) {
                Some(run) => chart.push(run),
                None => warn!(name = %name, "no saved run to compare against"),
            }
        }
    }
}

async fn teardown_suites(suites: &mut [Box<dyn Suite>]) {
    for suite in suites.iter_mut() {
        if let Err(e) = suite.teardown().await {
            warn!(suite = suite.name(), error = %e, "suite teardown failed");
        }
    }
}

fn write_html(history: &History, compare_names: &[String], options: &Options) -> Result<PathBuf> {
    let baseline = compare_names
        .first()
        .map(String::as_str)
        .unwrap_or(DEFAULT_COMPARE_NAME);
    let html = generate_html(history.runs(), compare_names, baseline, &options.github_repo);
    let path = write_report(&options.output_dir, HTML_REPORT, &html)?;
    info!(path = %path.display(), "html report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingSuite {
        name: &'static str,
        fail_setup: bool,
        teardowns: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Suite for CountingSuite {
        fn name(&self) -> &str {
            self.name
        }

        async fn setup(&mut self) -> Result<()> {
            if self.fail_setup {
                return Err(Error::invalid_input("missing toolchain"));
            }
            Ok(())
        }

        fn benchmarks(&self) -> Vec<Box<dyn BenchTarget>> {
            Vec::new()
        }

        async fn teardown(&mut self) -> Result<()> {
            self.teardowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn counting_suites(teardowns: &Arc<AtomicUsize>) -> Vec<Box<dyn Suite>> {
        vec![
            Box::new(CountingSuite {
                name: "ready",
                fail_setup: false,
                teardowns: Arc::clone(teardowns),
            }),
            Box::new(CountingSuite {
                name: "broken",
                fail_setup: true,
                teardowns: Arc::clone(teardowns),
            }),
        ]
    }

    fn options(dir: &TempDir) -> Options {
        Options {
            workdir: dir.path().join("work"),
            output_dir: dir.path().to_path_buf(),
            test_suite: true,
            ..Options::default()
        }
    }

    #[tokio::test]
    async fn test_run_test_suite_writes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let report = Harness::new(options(&dir)).run().await.unwrap();

        assert_eq!(report.results.len(), 30);
        assert!(report.saved.is_none());
        assert!(report.html.is_none());
        let markdown = std::fs::read_to_string(report.markdown.unwrap()).unwrap();
        assert!(markdown.starts_with("# Summary"));
        assert!(markdown.contains("Relative perf in group Test / Foo Group"));
        assert!(dir.path().join("work").join("BENCH_WORKDIR_VERSION").is_file());
    }

    #[tokio::test]
    async fn test_filter_selects_benchmarks() {
        let dir = tempfile::tempdir().unwrap();
        let report = Harness::new(options(&dir))
            .with_filter(Regex::new("^Latency").unwrap())
            .run()
            .await
            .unwrap();

        assert_eq!(report.results.len(), 6);
        assert!(report.results.iter().all(|r| r.label.starts_with("Latency")));
    }

    #[tokio::test]
    async fn test_saved_run_becomes_comparison() {
        let dir = tempfile::tempdir().unwrap();
        let first = Harness::new(options(&dir))
            .with_save_name("baseline")
            .run()
            .await
            .unwrap();
        assert!(first.saved.unwrap().is_file());

        let second = Harness::new(Options {
            output_html: true,
            ..options(&dir)
        })
        .run()
        .await
        .unwrap();
        let markdown = std::fs::read_to_string(second.markdown.unwrap()).unwrap();
        assert!(markdown.contains("| Benchmark | This PR | baseline |"));
        assert!(markdown.contains("No diffs to calculate performance change"));

        let html = std::fs::read_to_string(second.html.unwrap()).unwrap();
        assert!(html.contains("Relative Performance"));
    }

    #[tokio::test]
    async fn test_dry_run_executes_and_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let report = Harness::new(Options {
            dry_run: true,
            ..options(&dir)
        })
        .with_save_name("baseline")
        .run()
        .await
        .unwrap();

        assert!(report.results.is_empty());
        assert!(report.saved.is_none());
        assert!(!dir.path().join("work").join("results").exists());
    }

    #[tokio::test]
    async fn test_compare_saved_requires_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::new(options(&dir));
        let err = harness.compare_saved("nightly").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_compare_saved_renders_history() {
        let dir = tempfile::tempdir().unwrap();
        Harness::new(options(&dir))
            .with_save_name("nightly")
            .run()
            .await
            .unwrap();

        let report = Harness::new(options(&dir))
            .with_compare_names(vec!["nightly".to_string()])
            .compare_saved("nightly")
            .unwrap();
        let markdown = std::fs::read_to_string(report.markdown.unwrap()).unwrap();
        assert!(markdown.contains("# Details"));
        assert!(markdown.contains("A=B"));
    }

    #[tokio::test]
    async fn test_failed_suite_setup_tears_down_ready_suites() {
        let dir = tempfile::tempdir().unwrap();
        let teardowns = Arc::new(AtomicUsize::new(0));
        let harness = Harness::new(Options {
            exit_on_failure: true,
            ..options(&dir)
        });

        let err = harness
            .setup_suites(counting_suites(&teardowns))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_suite_setup_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let teardowns = Arc::new(AtomicUsize::new(0));
        let harness = Harness::new(options(&dir));

        let ready = harness
            .setup_suites(counting_suites(&teardowns))
            .await
            .unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].name(), "ready");
        assert_eq!(teardowns.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_compare_names_extend_default() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::new(options(&dir))
            .with_compare_names(vec!["nightly".to_string(), "baseline".to_string()]);
        assert_eq!(harness.compare_names(), ["baseline", "nightly"]);
    }
}
