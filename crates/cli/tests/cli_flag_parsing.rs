use clap::Parser;
use std::path::PathBuf;
use urbench_cli::{Cli, Commands};
use urbench_core::{CompareMode, Options};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("urbench").chain(args.iter().copied())).unwrap()
}

fn run_options(args: &[&str]) -> anyhow::Result<Options> {
    let Commands::Run(run) = parse(args).command else {
        panic!("expected the run subcommand");
    };
    let mut options = Options::default();
    run.apply(&mut options)?;
    Ok(options)
}

#[test]
fn test_run_defaults() {
    let options = run_options(&["run", "/tmp/work"]).unwrap();
    assert_eq!(options.workdir, PathBuf::from("/tmp/work"));
    assert_eq!(options.iterations, 3);
    assert_eq!(options.stddev_threshold, 0.02);
    assert_eq!(options.timeout_secs, 600);
    assert_eq!(options.compare, CompareMode::Latest);
    assert_eq!(options.compare_max, 10);
    assert!(options.rebuild);
    assert!(options.output_markdown);
    assert!(!options.output_html);
    assert!(options.extra_env.is_empty());
}

#[test]
fn test_run_flags_override_options() {
    let options = run_options(&[
        "run",
        "/tmp/work",
        "--sycl",
        "/opt/sycl",
        "--umf",
        "/opt/umf",
        "--adapter",
        "opencl",
        "--no-rebuild",
        "--env",
        "UR_L0_USE_IMMEDIATE_COMMANDLISTS=0",
        "--env",
        "EMPTY=",
        "--iterations",
        "5",
        "--stddev-threshold",
        "0.05",
        "--timeout",
        "30",
        "--epsilon",
        "0.01",
        "--compare-type",
        "median",
        "--compare-max",
        "4",
        "--output-html",
        "--output-markdown",
        "false",
        "--output-dir",
        "/tmp/out",
        "--exit-on-failure",
        "--test-suite",
    ])
    .unwrap();

    assert_eq!(options.sycl, Some(PathBuf::from("/opt/sycl")));
    assert_eq!(options.umf, Some(PathBuf::from("/opt/umf")));
    assert_eq!(options.ur_adapter, "opencl");
    assert!(!options.rebuild);
    assert_eq!(
        options.extra_env.get("UR_L0_USE_IMMEDIATE_COMMANDLISTS").map(String::as_str),
        Some("0")
    );
    assert_eq!(options.extra_env.get("EMPTY").map(String::as_str), Some(""));
    assert_eq!(options.iterations, 5);
    assert_eq!(options.stddev_threshold, 0.05);
    assert_eq!(options.timeout_secs, 30);
    assert_eq!(options.epsilon, 0.01);
    assert_eq!(options.compare, CompareMode::Median);
    assert_eq!(options.compare_max, 4);
    assert!(options.output_html);
    assert!(!options.output_markdown);
    assert_eq!(options.output_dir, PathBuf::from("/tmp/out"));
    assert!(options.exit_on_failure);
    assert!(options.test_suite);
}

#[test]
fn test_malformed_env_is_rejected() {
    let err = run_options(&["run", "/tmp/work", "--env", "NOVALUE"]).unwrap_err();
    assert!(format!("{:#}", err).contains("Variable=Value"));
}

#[test]
fn test_zero_iterations_is_rejected() {
    assert!(run_options(&["run", "/tmp/work", "--iterations", "0"]).is_err());
}

#[test]
fn test_unknown_compare_type_is_rejected() {
    let result = Cli::try_parse_from(["urbench", "run", "/tmp/work", "--compare-type", "mode"]);
    assert!(result.is_err());
}

#[test]
fn test_repeated_compare_names() {
    let Commands::Run(run) = parse(&[
        "run",
        "/tmp/work",
        "--compare",
        "baseline",
        "--compare",
        "nightly",
        "--save",
        "pr-123",
        "--filter",
        "^Latency",
    ])
    .command
    else {
        panic!("expected the run subcommand");
    };
    assert_eq!(run.compare, vec!["baseline", "nightly"]);
    assert_eq!(run.save.as_deref(), Some("pr-123"));

    let harness = run.harness(Options::default()).unwrap();
    assert_eq!(harness.options().iterations, 3);
    assert_eq!(harness.compare_names(), ["baseline", "nightly"]);
}

#[test]
fn test_compare_keeps_default_baseline() {
    let Commands::Run(run) = parse(&["run", "/tmp/work", "--compare", "nightly"]).command else {
        panic!("expected the run subcommand");
    };
    let harness = run.harness(Options::default()).unwrap();
    assert_eq!(harness.compare_names(), ["baseline", "nightly"]);
}

#[test]
fn test_invalid_filter_is_rejected() {
    let Commands::Run(run) = parse(&["run", "/tmp/work", "--filter", "("]).command else {
        panic!("expected the run subcommand");
    };
    assert!(run.harness(Options::default()).is_err());
}

#[test]
fn test_compare_defaults_to_baseline() {
    let Commands::Compare(compare) = parse(&["compare", "/tmp/work"]).command else {
        panic!("expected the compare subcommand");
    };
    assert_eq!(compare.baseline, "baseline");
    assert!(compare.compare.is_empty());
}

#[test]
fn test_status_detailed() {
    let cli = parse(&["status", "/tmp/work", "--detailed"]);
    assert!(!cli.verbose());
    assert!(matches!(cli.command, Commands::Status { detailed: true, .. }));
}

#[test]
fn test_verbose_run() {
    assert!(parse(&["run", "/tmp/work", "-v"]).verbose());
}
