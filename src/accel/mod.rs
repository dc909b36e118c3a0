//! Accelerated-backend capability probing.
//!
//! Answers one question: can a CUDA compute backend be acquired on this
//! host? The answer is a tagged [`Capability`]; callers branch on the tag.
//! When the backend is missing the prober renders a diagnostic with
//! remediation steps and emits it once as a non-fatal warning. Probing
//! never fails and never panics.
//!
//! # Example
//!
//! ```rust
//! use montecarlo_app::accel::{CapabilityProber, CollectingSink};
//!
//! let prober = CapabilityProber::system();
//! let mut sink = CollectingSink::default();
//! let capability = prober.probe(true, &mut sink);
//! if !capability.is_available() {
//!     assert_eq!(sink.warnings().len(), 1);
//! }
//! ```

mod diagnostics;
mod loader;

pub use diagnostics::{build_help_message, GPU_UNAVAILABLE_MARKER, INCLUDE_DIR_VAR, TOOLCHAIN_BINARY};
pub use loader::{BackendError, BackendLoader, CudaDriverLoader, ProbeEnvironment, SystemEnvironment};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Handle to an acquired accelerated backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHandle {
    /// Backend name (e.g. "cuda").
    pub backend: String,
    /// Driver library that was located.
    pub driver_path: PathBuf,
}

/// Why the backend could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeFailure {
    /// Failure kind (variant name of the underlying error).
    pub kind: String,
    /// Failure message.
    pub message: String,
    /// Rendered diagnostic with remediation steps.
    pub diagnostic: String,
}

/// Outcome of a capability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    /// Backend acquired.
    Available(BackendHandle),
    /// Backend missing; the CPU path must be used.
    Unavailable(ProbeFailure),
}

impl Capability {
    /// Whether the accelerated backend is usable.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Borrow the backend handle, if any.
    #[must_use]
    pub const fn handle(&self) -> Option<&BackendHandle> {
        match self {
            Self::Available(handle) => Some(handle),
            Self::Unavailable(_) => None,
        }
    }

    /// Split into the `(available, handle_or_none)` pair.
    #[must_use]
    pub fn into_parts(self) -> (bool, Option<BackendHandle>) {
        match self {
            Self::Available(handle) => (true, Some(handle)),
            Self::Unavailable(_) => (false, None),
        }
    }
}

/// Destination for non-fatal warnings.
pub trait WarningSink {
    /// Emit one warning.
    fn warn(&mut self, message: &str);
}

/// Emits warnings through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn warn(&mut self, message: &str) {
        tracing::warn!(target: "montecarlo_app::accel", "{message}");
    }
}

/// Collects warnings in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    warnings: Vec<String>,
}

impl CollectingSink {
    /// Warnings emitted so far, oldest first.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

impl WarningSink for CollectingSink {
    fn warn(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }
}

/// Probes for the accelerated backend.
pub struct CapabilityProber {
    loader: Box<dyn BackendLoader>,
    environment: Box<dyn ProbeEnvironment>,
}

impl std::fmt::Debug for CapabilityProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityProber")
            .field("backend", &self.loader.backend_name())
            .finish_non_exhaustive()
    }
}

impl Default for CapabilityProber {
    fn default() -> Self {
        Self::system()
    }
}

impl CapabilityProber {
    /// Create a prober from explicit seams.
    #[must_use]
    pub fn new(loader: Box<dyn BackendLoader>, environment: Box<dyn ProbeEnvironment>) -> Self {
        Self {
            loader,
            environment,
        }
    }

    /// Prober for the CUDA driver on this host.
    #[must_use]
    pub fn system() -> Self {
        Self::new(
            Box::new(CudaDriverLoader::from_env()),
            Box::new(SystemEnvironment),
        )
    }

    /// Attempt to acquire the backend.
    ///
    /// On failure with `warn` set, exactly one diagnostic is sent to `sink`.
    pub fn probe(&self, warn: bool, sink: &mut dyn WarningSink) -> Capability {
        match self.loader.acquire() {
            Ok(handle) => {
                tracing::debug!(
                    backend = %handle.backend,
                    driver = %handle.driver_path.display(),
                    "accelerated backend available"
                );
                Capability::Available(handle)
            }
            Err(err) => {
                let diagnostic = build_help_message(Some(&err), self.environment.as_ref());
                if warn {
                    sink.warn(&diagnostic);
                }
                Capability::Unavailable(ProbeFailure {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                    diagnostic,
                })
            }
        }
    }

    /// Probe with warnings enabled and return only availability.
    pub fn warn_if_unavailable(&self, sink: &mut dyn WarningSink) -> bool {
        self.probe(true, sink).is_available()
    }
}

/// Probe the system backend, warning through `tracing` when `warn` is set.
#[must_use]
pub fn probe(warn: bool) -> Capability {
    CapabilityProber::system().probe(warn, &mut TracingSink)
}

/// Probe the system backend with warnings enabled; returns availability.
#[must_use]
pub fn warn_if_unavailable() -> bool {
    CapabilityProber::system().warn_if_unavailable(&mut TracingSink)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes shared by tests in this crate.

    use super::*;
    use std::collections::HashMap;

    /// Loader that always fails.
    #[derive(Debug, Clone)]
    pub struct MissingBackend;

    impl BackendLoader for MissingBackend {
        fn backend_name(&self) -> &str {
            "cuda"
        }

        fn acquire(&self) -> Result<BackendHandle, BackendError> {
            Err(BackendError::DriverNotFound {
                library: "libcuda.so".to_string(),
                searched: 0,
            })
        }
    }

    /// Loader that always succeeds.
    #[derive(Debug, Clone)]
    pub struct PresentBackend;

    impl BackendLoader for PresentBackend {
        fn backend_name(&self) -> &str {
            "cuda"
        }

        fn acquire(&self) -> Result<BackendHandle, BackendError> {
            Ok(BackendHandle {
                backend: "cuda".to_string(),
                driver_path: PathBuf::from("/usr/lib/libcuda.so.1"),
            })
        }
    }

    /// Environment with a fixed set of executables and variables.
    #[derive(Debug, Clone, Default)]
    pub struct FakeEnvironment {
        pub executables: Vec<String>,
        pub vars: HashMap<String, String>,
    }

    impl ProbeEnvironment for FakeEnvironment {
        fn find_executable(&self, name: &str) -> Option<PathBuf> {
            self.executables
                .iter()
                .any(|e| e == name)
                .then(|| PathBuf::from("/opt/cuda/bin").join(name))
        }

        fn var(&self, key: &str) -> Option<String> {
            self.vars.get(key).cloned()
        }
    }

    pub fn missing_prober() -> CapabilityProber {
        CapabilityProber::new(Box::new(MissingBackend), Box::new(FakeEnvironment::default()))
    }

    pub fn present_prober() -> CapabilityProber {
        CapabilityProber::new(Box::new(PresentBackend), Box::new(FakeEnvironment::default()))
    }
}
