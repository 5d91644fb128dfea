//! I/O operations for benchmark runs and reports.
//!
//! This module reads and writes saved runs as JSON and writes the rendered
//! reports into the output directory.

use crate::result::BenchmarkRun;
use std::fs;
use std::path::{Path, PathBuf};
use urbench_core::Result;

/// File name of the Markdown report.
pub const MARKDOWN_REPORT: &str = "benchmark_results.md";

/// File name of the HTML report.
pub const HTML_REPORT: &str = "benchmark_results.html";

/// Write a run to a JSON file.
pub fn write_run(run: &BenchmarkRun, path: impl AsRef<Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(run)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a run from a JSON file.
pub fn read_run(path: impl AsRef<Path>) -> Result<BenchmarkRun> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write `contents` to `output_dir/file_name`, creating the directory.
pub fn write_report(output_dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(file_name);
    fs::write(&path, contents)?;
    Ok(path)
}
