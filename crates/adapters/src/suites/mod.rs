// Copyright 2025 urbench Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark suites.
//!
//! - **UMF**: the memory-allocator benchmark shipped with a UMF install
//! - **Velocity**: SYCL applications from Velocity-Bench, built from source
//! - **Compute**: SYCL and Unified Runtime micro-benchmarks from
//!   compute-benchmarks, built from source
//! - **Test**: deterministic synthetic benchmarks for exercising the pipeline
//!
//! Suites are enabled by the install prefixes given in [`Options`]; a suite
//! whose prerequisites are missing is left out with an informational log.

pub mod compute;
pub mod synthetic;
pub mod umf;
pub mod velocity;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::compute::{ComputeBenchmark, ComputeSuite};
    pub use super::synthetic::{TestBenchmark, TestSuite};
    pub use super::umf::{UmfBenchmark, UmfSuite};
    pub use super::velocity::{VelocityBenchmark, VelocityKind, VelocitySuite};
}

use crate::Suite;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use urbench_core::execution::{self, CommandSpec};
use urbench_core::{Error, Options, Result};

/// Suites whose prerequisites are configured in `options`.
pub fn enabled_suites(options: &Arc<Options>) -> Vec<Box<dyn Suite>> {
    let mut suites: Vec<Box<dyn Suite>> = Vec::new();

    if options.sycl.is_some() {
        suites.push(Box::new(compute::ComputeSuite::new(Arc::clone(options))));
        suites.push(Box::new(velocity::VelocitySuite::new(Arc::clone(options))));
    } else {
        info!("SYCL compiler root not provided, skipping Compute and Velocity suites");
    }

    if options.umf.is_some() {
        suites.push(Box::new(umf::UmfSuite::new(Arc::clone(options))));
    } else {
        info!("UMF install prefix not provided, skipping UMF suite");
    }

    if options.test_suite {
        suites.push(Box::new(synthetic::TestSuite::new()));
    }

    suites
}

/// Run a benchmark binary inside the benchmark working directory.
///
/// The configured install prefixes are put on `LD_LIBRARY_PATH` and the
/// SYCL toolchain on `PATH`. Returns the captured standard output.
pub(crate) async fn run_bench(
    options: &Options,
    argv: &[String],
    env: &BTreeMap<String, String>,
) -> Result<String> {
    let mut spec = CommandSpec::from_argv(argv.iter().cloned())?
        .envs(env)
        .with_library_dirs(&options.library_dirs())
        .cwd(options.bench_cwd())
        .timeout(options.timeout());
    if let Some(sycl) = &options.sycl {
        spec = spec.with_sycl(sycl);
    }

    let output = execution::run(&spec).await?;
    if options.verbose {
        info!(command = %spec, stdout = %output.stdout, "benchmark output");
    }
    Ok(output.stdout)
}

/// Split one CSV line into fields, honouring double-quoted fields.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Parse benchmark CSV output: a header row followed by one data row whose
/// first two fields are a label and a numeric value.
pub fn parse_csv_output(benchmark: &str, output: &str) -> Result<(String, f64)> {
    let mut rows = output.lines().filter(|l| !l.trim().is_empty()).skip(1);
    let row = rows
        .next()
        .ok_or_else(|| Error::parse(benchmark, "benchmark output does not contain data"))?;

    let fields = split_csv_line(row.trim_end_matches('\r'));
    let (label, value) = match fields.as_slice() {
        [label, value, ..] => (label.trim(), value.trim()),
        _ => {
            return Err(Error::parse(
                benchmark,
                format!("error parsing output: expected label and value in '{}'", row),
            ))
        }
    };
    let value: f64 = value.parse().map_err(|e| {
        Error::parse(
            benchmark,
            format!("error parsing output: value '{}' is not a number: {}", value, e),
        )
    })?;
    Ok((label.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv_line() {
        assert_eq!(split_csv_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(
            split_csv_line(r#""alloc, 4096",12.5"#),
            vec!["alloc, 4096", "12.5"]
        );
        assert_eq!(split_csv_line(r#""say ""hi""",1"#), vec![r#"say "hi""#, "1"]);
        assert_eq!(split_csv_line(""), vec![""]);
    }

    #[test]
    fn test_parse_csv_output() {
        let output = "TestCase,Mean,Median\nSubmitKernel(api=sycl),12.25,12.0\n";
        let (label, value) = parse_csv_output("submit", output).unwrap();
        assert_eq!(label, "SubmitKernel(api=sycl)");
        assert_eq!(value, 12.25);
    }

    #[test]
    fn test_parse_csv_quoted_label() {
        let output = "name,value\r\n\"glibc, 4096 bytes\",\"3.5\"\r\n";
        let (label, value) = parse_csv_output("umf", output).unwrap();
        assert_eq!(label, "glibc, 4096 bytes");
        assert_eq!(value, 3.5);
    }

    #[test]
    fn test_parse_csv_missing_data_row() {
        let err = parse_csv_output("umf-benchmark", "name,value\n").unwrap_err();
        assert!(matches!(err, Error::Parse { ref benchmark, .. } if benchmark == "umf-benchmark"));
    }

    #[test]
    fn test_parse_csv_bad_value() {
        assert!(matches!(
            parse_csv_output("umf", "name,value\nalloc,fast\n"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            parse_csv_output("umf", "name,value\nalloc\n"),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_enabled_suites_follow_options() {
        let options = Arc::new(Options::default());
        assert!(enabled_suites(&options).is_empty());

        let options = Arc::new(Options {
            test_suite: true,
            umf: Some("/opt/umf".into()),
            ..Options::default()
        });
        let names: Vec<String> = enabled_suites(&options)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["UMF", "Test"]);
    }
}
