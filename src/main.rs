//! montecarlo-app CLI
//!
//! Command-line interface for the estimator and experiment suite.

use std::process::ExitCode;

use montecarlo_app::cli::{run_cli, Args};

fn main() -> ExitCode {
    run_cli(Args::parse())
}
