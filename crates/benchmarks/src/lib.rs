//! Benchmark results and everything done with them after a run.
//!
//! This crate owns the result model shared by all benchmark suites and the
//! post-processing pipeline:
//!
//! - [`result`] - the `BenchmarkResult` sample and the `BenchmarkRun` record
//! - [`aggregate`] - outlier rejection and representative-sample selection
//! - [`compare`] - relative performance and regression classification
//! - [`history`] - saved runs on disk and baseline synthesis
//! - [`markdown`] - Markdown comparison report
//! - [`html`] - HTML report with time-series and bar charts
//! - [`io`] - JSON and report file I/O
//!
//! # Quick Start
//!
//! ```no_run
//! use urbench_benchmarks::{BenchmarkResult, BenchmarkRun, Comparison};
//!
//! let current = BenchmarkRun::new("This PR", "abc1234", vec![BenchmarkResult::new("alloc_a", 9.0)]);
//! let baseline = BenchmarkRun::new("baseline", "def5678", vec![BenchmarkResult::new("alloc_a", 10.0)]);
//!
//! let comparison = Comparison::new(&[current, baseline], "This PR", 0.02);
//! for row in &comparison.rows {
//!     println!("{}: {:?}", row.label, row.primary().map(|d| d.change));
//! }
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod compare;
pub mod history;
pub mod html;
pub mod io;
pub mod markdown;
pub mod result;

pub use aggregate::{process_results, AggregationConfig, SampleSet};
pub use compare::{classify, relative_performance, Change, Comparison};
pub use history::History;
pub use result::{BenchmarkResult, BenchmarkRun};
