//! CLI command handlers.
//!
//! Each handler returns an [`ExitCode`]; the fallible work lives in helpers
//! returning [`McResult`] so tests can inspect it directly.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::{Deserialize, Serialize};

use crate::accel::{CapabilityProber, CollectingSink, TracingSink, WarningSink};
use crate::config::{EstimatorConfig, SuiteConfig};
use crate::domains::monte_carlo::{EfficiencyEstimate, EfficiencyEstimator, SimulationParams};
use crate::domains::sampling::{sample_from_config, SamplingConfig};
use crate::engine::rng::SimRng;
use crate::error::{McError, McResult};
use crate::logging;
use crate::orchestrator::Orchestrator;

use super::output::{
    print_capability, print_estimate, print_help, print_suite_report, print_verify_summary,
    print_version,
};
use super::{Args, Command};

/// Main CLI entry point.
///
/// Dispatches to the appropriate command handler based on parsed arguments.
#[must_use]
pub fn run_cli(args: Args) -> ExitCode {
    logging::init(args.verbose());

    match args.command {
        Command::Simulate {
            config_path,
            samples,
            gpu,
            seed,
        } => simulate(config_path.as_deref(), samples, gpu, seed),
        Command::Probe => probe(),
        Command::RunAll {
            config_path,
            plot_path,
            report_path,
            seed_override,
            verbose: _,
        } => run_all(
            config_path.as_deref(),
            plot_path,
            report_path.as_deref(),
            seed_override,
        ),
        Command::Verify { runs } => verify(runs),
        Command::Help => {
            print_help();
            ExitCode::SUCCESS
        }
        Command::Version => {
            print_version();
            ExitCode::SUCCESS
        }
        Command::Invalid { message } => {
            eprintln!("Error: {message}");
            eprintln!("Run 'montecarlo-app help' for usage.");
            ExitCode::from(1)
        }
    }
}

fn failure(err: &McError) -> ExitCode {
    eprintln!("Error: {err}");
    ExitCode::from(1)
}

/// Estimate the beam efficiency.
#[must_use]
pub fn simulate(
    config_path: Option<&Path>,
    samples: Option<usize>,
    gpu: bool,
    seed: Option<u64>,
) -> ExitCode {
    let prober = CapabilityProber::system();
    let result = load_suite_config(config_path, None, seed).and_then(|mut config| {
        if let Some(n) = samples {
            config.estimator.samples = n;
        }
        config.estimator.use_accelerated |= gpu;
        estimate(&config.estimator, config.reproducibility.seed, &prober, &mut TracingSink)
    });
    match result {
        Ok(estimate) => {
            print_estimate(&estimate);
            ExitCode::SUCCESS
        }
        Err(e) => failure(&e),
    }
}

/// Run one estimate against the given prober.
///
/// # Errors
///
/// Propagates estimator construction and run errors.
pub fn estimate(
    config: &EstimatorConfig,
    seed: Option<u64>,
    prober: &CapabilityProber,
    sink: &mut dyn WarningSink,
) -> McResult<EfficiencyEstimate> {
    let params = SimulationParams::with_samples(config.samples).accelerated(config.use_accelerated);
    let estimator = EfficiencyEstimator::new(config.physics, params)?;
    let mut rng = SimRng::from_optional_seed(seed);
    estimator.run(&mut rng, prober, sink)
}

/// Report accelerated-backend availability.
///
/// Exits 0 either way; an unavailable backend is not an error.
#[must_use]
pub fn probe() -> ExitCode {
    let mut sink = CollectingSink::default();
    let capability = CapabilityProber::system().probe(false, &mut sink);
    print_capability(&capability);
    ExitCode::SUCCESS
}

/// Run the experiment suite.
#[must_use]
pub fn run_all(
    config_path: Option<&Path>,
    plot_path: Option<PathBuf>,
    report_path: Option<&Path>,
    seed: Option<u64>,
) -> ExitCode {
    let result = load_suite_config(config_path, plot_path, seed)
        .and_then(Orchestrator::new)
        .and_then(|orchestrator| orchestrator.run_with_configured_surface())
        .and_then(|report| {
            if let Some(path) = report_path {
                report.write_json(path)?;
                tracing::info!(path = %path.display(), "wrote suite report");
            }
            Ok(report)
        });
    match result {
        Ok(report) => {
            print_suite_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => failure(&e),
    }
}

/// Load the suite configuration and apply command-line overrides.
///
/// # Errors
///
/// Returns config loading or validation errors.
pub fn load_suite_config(
    config_path: Option<&Path>,
    plot_path: Option<PathBuf>,
    seed: Option<u64>,
) -> McResult<SuiteConfig> {
    let mut config = match config_path {
        Some(path) => SuiteConfig::load(path)?,
        None => SuiteConfig::default(),
    };
    if seed.is_some() {
        config.reproducibility.seed = seed;
    }
    if plot_path.is_some() {
        config.output.plot_path = plot_path;
    }
    config.check()?;
    Ok(config)
}

/// Outcome of a reproducibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifySummary {
    /// Number of runs compared.
    pub runs: usize,
    /// Fingerprint of the first run.
    pub reference_hash: String,
    /// Fingerprint of every run.
    pub run_hashes: Vec<String>,
}

impl VerifySummary {
    /// Whether every run matched the reference.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.run_hashes.iter().all(|h| *h == self.reference_hash)
    }
}

/// Check that seeded latent sampling reproduces bit-for-bit.
#[must_use]
pub fn verify(runs: usize) -> ExitCode {
    match verify_sampling(&SamplingConfig::default(), runs) {
        Ok(summary) => {
            print_verify_summary(&summary);
            if summary.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => failure(&e),
    }
}

/// Rerun latent sampling `runs` times and collect fingerprints.
///
/// # Errors
///
/// Returns `InvalidInput` for zero runs, otherwise propagates sampling
/// errors.
pub fn verify_sampling(config: &SamplingConfig, runs: usize) -> McResult<VerifySummary> {
    if runs == 0 {
        return Err(McError::invalid_input("verify needs at least one run"));
    }
    let run_hashes = (0..runs)
        .map(|_| sample_from_config(config)?.fingerprint())
        .collect::<McResult<Vec<_>>>()?;
    let reference_hash = run_hashes[0].clone();
    Ok(VerifySummary {
        runs,
        reference_hash,
        run_hashes,
    })
}
