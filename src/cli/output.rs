//! CLI output formatting.
//!
//! Formatting is split from printing so the text can be tested.

use crate::accel::Capability;
use crate::domains::monte_carlo::EfficiencyEstimate;
use crate::orchestrator::SuiteReport;

use super::commands::VerifySummary;

/// Version string with the build's git hash, when known.
#[must_use]
pub fn version_string() -> String {
    let version = option_env!("MONTECARLO_APP_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    match option_env!("GIT_HASH").filter(|h| !h.is_empty()) {
        Some(hash) => format!("montecarlo-app {version} ({})", &hash[..hash.len().min(12)]),
        None => format!("montecarlo-app {version}"),
    }
}

/// Print version information.
pub fn print_version() {
    println!("{}", version_string());
}

/// Print help message.
pub fn print_help() {
    println!(
        r"montecarlo-app - Monte Carlo beam efficiency and ML uncertainty suite

USAGE:
    montecarlo-app <COMMAND> [OPTIONS]

COMMANDS:
    simulate                    Estimate the beam efficiency
        -c, --config <FILE>     Suite configuration (estimator section)
        -n, --samples <N>       Number of sampled directions (default: 10000)
        --gpu                   Probe the accelerated backend first
        --seed <N>              Seed the sampler

    probe                       Report accelerated-backend availability

    run-all                     Run training, MC-Dropout and latent sampling
        -c, --config <FILE>     Suite configuration (YAML)
        --plot <FILE.svg>       Write the uncertainty plot as SVG
        --report <FILE.json>    Write the full results as JSON
        --seed <N>              Master seed for training and inference
        -v, --verbose           Enable debug logging

    verify                      Check seeded latent sampling reproduces
        --runs <N>              Number of runs (default: 3)

    help                        Show this help message
    version                     Show version information

EXAMPLES:
    montecarlo-app simulate --samples 100000
    montecarlo-app run-all --seed 42 --plot band.svg
    montecarlo-app verify --runs 5

Logging goes to stderr; set RUST_LOG to adjust it.
"
    );
}

/// The estimator's one-line result.
#[must_use]
pub fn efficiency_line(estimate: &EfficiencyEstimate) -> String {
    format!("Monte Carlo Efficiency: {}", estimate.efficiency)
}

/// Print an efficiency estimate.
pub fn print_estimate(estimate: &EfficiencyEstimate) {
    tracing::info!(
        forward = estimate.forward_samples,
        total = estimate.total_samples,
        std_error = estimate.std_error,
        "estimate complete"
    );
    println!("{}", efficiency_line(estimate));
}

/// Probe outcome reduced for display.
#[must_use]
pub fn capability_status(capability: &Capability) -> &'static str {
    if capability.is_available() {
        "available"
    } else {
        "unavailable"
    }
}

/// Lines describing a probe outcome.
#[must_use]
pub fn capability_lines(capability: &Capability) -> Vec<String> {
    let status = capability_status(capability);
    match capability {
        Capability::Available(handle) => vec![
            format!("Backend:  {} ({status})", handle.backend),
            format!("Driver:   {}", handle.driver_path.display()),
        ],
        Capability::Unavailable(failure) => vec![
            format!("Backend:  {status} ({})", failure.kind),
            format!("Reason:   {}", failure.message),
            String::new(),
            failure.diagnostic.clone(),
        ],
    }
}

/// Print a probe outcome.
pub fn print_capability(capability: &Capability) {
    for line in capability_lines(capability) {
        println!("{line}");
    }
}

/// Print the suite results.
pub fn print_suite_report(report: &SuiteReport) {
    let training = &report.training;
    println!("Seed: {}", report.master_seed);
    println!();
    println!("Policy gradient ({})", training.env);
    println!("  Episodes:        {}", training.episodes.len());
    if let Some(best) = training.best_reward() {
        println!("  Best reward:     {best}");
    }
    println!("  Avg reward:      {:.2}", training.moving_average_reward);
    println!("  Final baseline:  {:.4}", training.final_baseline);
    println!();
    println!("MC-Dropout");
    println!("  Grid points:     {}", report.uncertainty.len());
    println!("  Max std:         {:.4}", report.uncertainty.max_std());
}

/// Print a reproducibility check.
pub fn print_verify_summary(summary: &VerifySummary) {
    let (sym, status) = if summary.passed() {
        ("✓", "PASSED")
    } else {
        ("✗", "FAILED")
    };

    println!("Reproducibility Check");
    println!("  Runs:           {}", summary.runs);
    println!("  Reference Hash: {}", summary.reference_hash);
    if summary.run_hashes.len() > 1 {
        for (i, hash) in summary.run_hashes.iter().enumerate() {
            let match_sym = if *hash == summary.reference_hash { "=" } else { "!" };
            println!("    Run {}: {hash} {match_sym}", i + 1);
        }
    }
    println!("{sym} Result: {status}");
}
