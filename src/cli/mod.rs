//! CLI module for montecarlo-app.
//!
//! All CLI logic lives here rather than in main.rs so it can be tested. The
//! entry point `run_cli` is called from main.rs with parsed arguments.

mod args;
mod commands;
mod output;

pub use args::{Args, Command, DEFAULT_VERIFY_RUNS};
pub use commands::{estimate, load_suite_config, run_cli, verify_sampling, VerifySummary};
pub use output::{
    capability_lines, capability_status, efficiency_line, print_help, print_version, version_string,
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests;
