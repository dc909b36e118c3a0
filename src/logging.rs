//! Diagnostic logging setup.
//!
//! Log output goes to stderr so stdout carries only program results.

use tracing_subscriber::EnvFilter;

/// Level used when neither `RUST_LOG` nor `--verbose` says otherwise.
pub const DEFAULT_LEVEL: &str = "info";

/// Filter from `RUST_LOG`, falling back to `info` (`debug` when verbose).
#[must_use]
pub fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { DEFAULT_LEVEL })
    })
}

/// Install the global fmt subscriber.
///
/// Returns `false` if a subscriber was already installed; repeated calls are
/// harmless.
pub fn init(verbose: bool) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init()
        .is_ok()
}
