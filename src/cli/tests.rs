//! CLI module tests.

use super::args::{Args, Command, DEFAULT_VERIFY_RUNS};
use super::commands::{estimate, load_suite_config, run_cli, verify_sampling};
use super::output::{capability_lines, capability_status, efficiency_line, version_string};
use crate::accel::testing::{missing_prober, present_prober};
use crate::accel::{CollectingSink, GPU_UNAVAILABLE_MARKER};
use crate::config::EstimatorConfig;
use crate::domains::sampling::SamplingConfig;
use crate::error::McError;
use std::path::PathBuf;

// ============================================================================
// Args parsing tests
// ============================================================================

#[test]
fn test_parse_no_args_shows_help() {
    let args = Args::parse_from(["montecarlo-app"]);
    assert_eq!(args.command, Command::Help);
}

#[test]
fn test_parse_help_variants() {
    for flag in ["-h", "--help", "help"] {
        assert_eq!(Args::parse_from(["montecarlo-app", flag]).command, Command::Help);
    }
}

#[test]
fn test_parse_version_variants() {
    for flag in ["-V", "--version", "version"] {
        assert_eq!(Args::parse_from(["montecarlo-app", flag]).command, Command::Version);
    }
}

#[test]
fn test_parse_unknown_command_shows_help() {
    let args = Args::parse_from(["montecarlo-app", "frobnicate"]);
    assert_eq!(args.command, Command::Help);
}

#[test]
fn test_parse_simulate_defaults() {
    let args = Args::parse_from(["montecarlo-app", "simulate"]);
    assert_eq!(
        args.command,
        Command::Simulate {
            config_path: None,
            samples: None,
            gpu: false,
            seed: None
        }
    );
}

#[test]
fn test_parse_simulate_options() {
    let args = Args::parse_from([
        "montecarlo-app",
        "simulate",
        "--config",
        "suite.yaml",
        "--samples",
        "500",
        "--gpu",
        "--seed",
        "7",
    ]);
    assert_eq!(
        args.command,
        Command::Simulate {
            config_path: Some(PathBuf::from("suite.yaml")),
            samples: Some(500),
            gpu: true,
            seed: Some(7)
        }
    );
}

fn invalid_message(argv: &[&str]) -> String {
    match Args::parse_from(argv).command {
        Command::Invalid { message } => message,
        other => panic!("expected an argument error for {argv:?}, got {other:?}"),
    }
}

#[test]
fn test_parse_simulate_bad_number_is_rejected() {
    let message = invalid_message(&["montecarlo-app", "simulate", "-n", "lots"]);
    assert!(message.contains("'lots'") && message.contains("-n"), "{message}");

    let message = invalid_message(&["montecarlo-app", "simulate", "--seed", "-3"]);
    assert!(message.contains("'-3'") && message.contains("--seed"), "{message}");
}

#[test]
fn test_parse_missing_values_are_rejected() {
    assert_eq!(
        invalid_message(&["montecarlo-app", "simulate", "--samples"]),
        "--samples requires a value"
    );
    assert_eq!(
        invalid_message(&["montecarlo-app", "run-all", "--plot"]),
        "--plot requires a value"
    );
}

#[test]
fn test_run_cli_exits_nonzero_on_argument_error() {
    let code = run_cli(Args::parse_from(["montecarlo-app", "simulate", "--samples", "lots"]));
    assert_eq!(code, std::process::ExitCode::from(1));
}

#[test]
fn test_parse_run_all_and_verify_bad_numbers_are_rejected() {
    let message = invalid_message(&["montecarlo-app", "run-all", "--seed", "forty-two"]);
    assert!(message.starts_with("invalid value 'forty-two' for --seed"), "{message}");

    let message = invalid_message(&["montecarlo-app", "verify", "--runs", "many"]);
    assert!(message.starts_with("invalid value 'many' for --runs"), "{message}");
}

#[test]
fn test_parse_probe() {
    assert_eq!(Args::parse_from(["montecarlo-app", "probe"]).command, Command::Probe);
}

#[test]
fn test_parse_run_all() {
    let args = Args::parse_from([
        "montecarlo-app",
        "run-all",
        "--config",
        "suite.yaml",
        "--plot",
        "band.svg",
        "--report",
        "out.json",
        "--seed",
        "42",
        "-v",
    ]);
    assert_eq!(
        args.command,
        Command::RunAll {
            config_path: Some(PathBuf::from("suite.yaml")),
            plot_path: Some(PathBuf::from("band.svg")),
            report_path: Some(PathBuf::from("out.json")),
            seed_override: Some(42),
            verbose: true,
        }
    );
    assert!(args.verbose());
}

#[test]
fn test_parse_run_all_bare() {
    let args = Args::parse_from(["montecarlo-app", "run-all"]);
    assert_eq!(
        args.command,
        Command::RunAll {
            config_path: None,
            plot_path: None,
            report_path: None,
            seed_override: None,
            verbose: false,
        }
    );
    assert!(!args.verbose());
}

#[test]
fn test_parse_verify() {
    assert_eq!(
        Args::parse_from(["montecarlo-app", "verify"]).command,
        Command::Verify {
            runs: DEFAULT_VERIFY_RUNS
        }
    );
    assert_eq!(
        Args::parse_from(["montecarlo-app", "verify", "--runs", "5"]).command,
        Command::Verify { runs: 5 }
    );
}

// ============================================================================
// Command helpers
// ============================================================================

fn estimator(samples: usize, use_accelerated: bool) -> EstimatorConfig {
    EstimatorConfig {
        samples,
        use_accelerated,
        ..EstimatorConfig::default()
    }
}

#[test]
fn test_estimate_seeded_is_reproducible() {
    let prober = missing_prober();
    let a = estimate(&estimator(2000, false), Some(3), &prober, &mut CollectingSink::default()).unwrap();
    let b = estimate(&estimator(2000, false), Some(3), &prober, &mut CollectingSink::default()).unwrap();
    assert_eq!(a.efficiency.to_bits(), b.efficiency.to_bits());
    assert!(a.accelerator.is_none());
}

#[test]
fn test_estimate_gpu_without_backend_warns_once() {
    let mut sink = CollectingSink::default();
    let result = estimate(&estimator(1000, true), Some(1), &missing_prober(), &mut sink).unwrap();
    assert_eq!(result.accelerator, Some(false));
    assert_eq!(sink.warnings().len(), 1);
    assert!(sink.warnings()[0].contains("GPU support is unavailable"));
}

#[test]
fn test_estimate_rejects_zero_samples() {
    let err = estimate(&estimator(0, false), Some(1), &missing_prober(), &mut CollectingSink::default());
    assert!(matches!(err, Err(McError::InvalidInput { .. })));
}

#[test]
fn test_efficiency_line_format() {
    let result = estimate(&estimator(100, false), Some(5), &present_prober(), &mut CollectingSink::default())
        .unwrap();
    let line = efficiency_line(&result);
    assert!(line.starts_with("Monte Carlo Efficiency: "));
    let value: f64 = line["Monte Carlo Efficiency: ".len()..].parse().unwrap();
    assert_eq!(value.to_bits(), result.efficiency.to_bits());
}

#[test]
fn test_capability_lines() {
    let mut sink = CollectingSink::default();
    let missing = missing_prober().probe(false, &mut sink);
    assert!(sink.warnings().is_empty());
    assert_eq!(capability_status(&missing), "unavailable");
    let lines = capability_lines(&missing);
    assert!(lines[0].starts_with("Backend:  unavailable ("), "{}", lines[0]);
    assert!(lines.iter().any(|l| l.starts_with(GPU_UNAVAILABLE_MARKER)));

    let present = present_prober().probe(true, &mut sink);
    assert_eq!(capability_status(&present), "available");
    assert!(capability_lines(&present)[0].ends_with("(available)"));
}

#[test]
fn test_load_suite_config_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("suite.yaml");
    std::fs::write(&path, "reproducibility:\n  seed: 1\nreinforce:\n  episodes: 4\n").unwrap();

    let config = load_suite_config(Some(&path), Some(dir.path().join("out.svg")), Some(99)).unwrap();
    assert_eq!(config.reproducibility.seed, Some(99));
    assert_eq!(config.reinforce.episodes, 4);
    assert!(config.output.plot_path.is_some());

    let kept = load_suite_config(Some(&path), None, None).unwrap();
    assert_eq!(kept.reproducibility.seed, Some(1));
}

#[test]
fn test_estimator_section_drives_estimate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("suite.yaml");
    std::fs::write(&path, "estimator:\n  samples: 300\n  use_accelerated: true\n").unwrap();

    let config = load_suite_config(Some(&path), None, Some(4)).unwrap();
    let mut sink = CollectingSink::default();
    let result = estimate(&config.estimator, config.reproducibility.seed, &missing_prober(), &mut sink)
        .unwrap();
    assert_eq!(result.total_samples, 300);
    assert_eq!(result.accelerator, Some(false));
    assert_eq!(sink.warnings().len(), 1);
}

#[test]
fn test_load_suite_config_rejects_non_svg_plot() {
    let err = load_suite_config(None, Some(PathBuf::from("out.png")), None);
    assert!(matches!(err, Err(McError::Config { .. })));
}

#[test]
fn test_verify_sampling_passes() {
    let config = SamplingConfig {
        n_samples: 200,
        ..SamplingConfig::default()
    };
    let summary = verify_sampling(&config, 3).unwrap();
    assert_eq!(summary.runs, 3);
    assert_eq!(summary.run_hashes.len(), 3);
    assert!(summary.passed());
}

#[test]
fn test_verify_sampling_zero_runs() {
    assert!(verify_sampling(&SamplingConfig::default(), 0).is_err());
}

// ============================================================================
// Output formatting
// ============================================================================

#[test]
fn test_version_string() {
    assert!(version_string().starts_with("montecarlo-app "));
}
