//! Run the beam-efficiency estimator with default parameters.

use std::process::ExitCode;

use montecarlo_app::domains::monte_carlo::{simulate, DEFAULT_SAMPLES};
use montecarlo_app::logging;

fn main() -> ExitCode {
    logging::init(false);
    match simulate(DEFAULT_SAMPLES, false) {
        Ok(efficiency) => {
            println!("Monte Carlo Efficiency: {efficiency}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}
