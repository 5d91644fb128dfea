//! Saved benchmark runs.
//!
//! Every saved run is one JSON file under `<workdir>/results/`, named
//! `<run name>_<YYYYMMDD>_<HHMMSS>.json`. [`History`] loads the newest files
//! first and can synthesize a comparison baseline from several runs of the
//! same name.

use crate::aggregate::{mean, median};
use crate::io;
use crate::result::{BenchmarkResult, BenchmarkRun};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use urbench_core::{CompareMode, Result};

/// Directory under the workdir holding saved runs.
pub const RESULTS_DIR: &str = "results";

/// Number of files loaded when no limit is configured.
pub const DEFAULT_LOAD_LIMIT: usize = 1000;

/// Saved runs, newest first.
#[derive(Debug, Clone)]
pub struct History {
    dir: PathBuf,
    runs: Vec<BenchmarkRun>,
}

impl History {
    /// History stored in `workdir`.
    pub fn new(workdir: &Path) -> Self {
        Self {
            dir: workdir.join(RESULTS_DIR),
            runs: Vec::new(),
        }
    }

    /// Directory holding the result files.
    pub fn results_dir(&self) -> &Path {
        &self.dir
    }

    /// Loaded runs, newest first.
    pub fn runs(&self) -> &[BenchmarkRun] {
        &self.runs
    }

    /// A new run named `name`, stamped with the current time.
    pub fn create_run(name: &str, results: Vec<BenchmarkResult>, git_hash: &str) -> BenchmarkRun {
        BenchmarkRun::new(name, git_hash, results)
    }

    /// Load up to `limit` of the newest result files.
    ///
    /// Files whose names do not follow the result naming scheme are ignored,
    /// and files that fail to parse are skipped with a warning.
    pub fn load(&mut self, limit: usize) -> Result<()> {
        self.runs.clear();
        if !self.dir.is_dir() {
            debug!(dir = %self.dir.display(), "no saved results");
            return Ok(());
        }

        let mut files: Vec<(String, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match timestamp_key(stem) {
                Some(key) => files.push((key, path)),
                None => debug!(file = %path.display(), "ignoring file outside the naming scheme"),
            }
        }

        files.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, path) in files.into_iter().take(limit) {
            match io::read_run(&path) {
                Ok(run) => self.runs.push(run),
                Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable result file"),
            }
        }

        info!(count = self.runs.len(), dir = %self.dir.display(), "loaded benchmark history");
        Ok(())
    }

    /// Add `run` to the history, writing it to disk when `persist` is set.
    ///
    /// Returns the path of the written file.
    pub fn save(&mut self, run: BenchmarkRun, persist: bool) -> Result<Option<PathBuf>> {
        let path = if persist {
            fs::create_dir_all(&self.dir)?;
            let file_name = format!(
                "{}_{}.json",
                run.name.replace(['/', '\\'], "_"),
                run.date.format("%Y%m%d_%H%M%S")
            );
            let path = self.dir.join(file_name);
            io::write_run(&run, &path)?;
            info!(name = %run.name, file = %path.display(), "saved benchmark run");
            Some(path)
        } else {
            None
        };

        self.runs.insert(0, run);
        Ok(path)
    }

    /// Newest run named `name`.
    pub fn find_latest(&self, name: &str) -> Option<&BenchmarkRun> {
        self.runs.iter().find(|r| r.name == name)
    }

    /// Run to compare against for `name`.
    ///
    /// [`CompareMode::Latest`] returns the newest run. The other modes combine
    /// up to `compare_max` of the newest runs label by label into a synthetic
    /// run whose git hash is the mode name and whose date is the newest
    /// run's date.
    pub fn get_compare(&self, name: &str, mode: CompareMode, compare_max: usize) -> Option<BenchmarkRun> {
        if mode == CompareMode::Latest {
            return self.find_latest(name).cloned();
        }

        let runs: Vec<&BenchmarkRun> = self
            .runs
            .iter()
            .filter(|r| r.name == name)
            .take(compare_max)
            .collect();
        let newest = runs.first()?;

        let mut labels: Vec<&str> = Vec::new();
        for run in &runs {
            for result in &run.results {
                if !labels.contains(&result.label.as_str()) {
                    labels.push(&result.label);
                }
            }
        }

        let results: Vec<BenchmarkResult> = labels
            .into_iter()
            .filter_map(|label| {
                let found: Vec<&BenchmarkResult> =
                    runs.iter().filter_map(|r| r.result(label)).collect();
                let values: Vec<f64> = found.iter().map(|r| r.value).collect();
                let value = match mode {
                    CompareMode::Median => median(&values)?,
                    _ => mean(&values)?,
                };
                let mut result = (*found.first()?).clone();
                result.value = value;
                Some(result)
            })
            .collect();

        Some(BenchmarkRun {
            name: name.to_string(),
            git_hash: mode.as_str().to_string(),
            date: newest.date,
            results,
        })
    }
}

/// Sortable `YYYYMMDDHHMMSS` key of a result file stem.
fn timestamp_key(stem: &str) -> Option<String> {
    let mut parts = stem.rsplitn(3, '_');
    let time = parts.next()?;
    let date = parts.next()?;
    let name = parts.next()?;
    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if name.is_empty() || !digits(date, 8) || !digits(time, 6) {
        return None;
    }
    Some(format!("{}{}", date, time))
}
