//! Remediation text for a missing accelerated backend.

use super::{BackendError, ProbeEnvironment};

/// Leading marker of every unavailable-backend diagnostic.
pub const GPU_UNAVAILABLE_MARKER: &str = "GPU support is unavailable.";

/// Compiler executable the CUDA toolchain must provide.
pub const TOOLCHAIN_BINARY: &str = "nvcc";

/// Variable pointing at CUDA headers outside standard locations.
pub const INCLUDE_DIR_VAR: &str = "CUDA_INC_DIR";

/// Build the diagnostic for a failed backend acquisition.
///
/// Combines the failure kind and message, toolchain discoverability,
/// the header-directory variable and static install guidance.
#[must_use]
pub fn build_help_message(failure: Option<&BackendError>, env: &dyn ProbeEnvironment) -> String {
    let mut message = String::from(GPU_UNAVAILABLE_MARKER);

    if let Some(err) = failure {
        message.push_str(&format!(" (CUDA driver error: {}: {err})", err.kind()));
    }

    message.push_str(
        " Install CUDA prerequisites: an NVIDIA driver providing libcuda, \
         and the CUDA Toolkit (nvcc).",
    );

    if env.find_executable(TOOLCHAIN_BINARY).is_none() {
        message.push_str(&format!(
            " {TOOLCHAIN_BINARY} not found on PATH; install the CUDA Toolkit and export \
             CUDA_HOME and PATH."
        ));
    }

    if env.var(INCLUDE_DIR_VAR).is_none() {
        message.push_str(&format!(
            " If CUDA headers are not in a standard location, set {INCLUDE_DIR_VAR}."
        ));
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::testing::FakeEnvironment;

    fn driver_missing() -> BackendError {
        BackendError::DriverNotFound {
            library: "libcuda.so.1".to_string(),
            searched: 7,
        }
    }

    #[test]
    fn test_message_starts_with_marker() {
        let msg = build_help_message(None, &FakeEnvironment::default());
        assert!(msg.starts_with(GPU_UNAVAILABLE_MARKER));
        assert!(!msg.contains("CUDA driver error"));
    }

    #[test]
    fn test_message_includes_failure_kind_and_text() {
        let err = driver_missing();
        let msg = build_help_message(Some(&err), &FakeEnvironment::default());
        assert!(msg.contains("DriverNotFound"));
        assert!(msg.contains("libcuda.so.1"));
    }

    #[test]
    fn test_bare_environment_gets_both_hints() {
        let msg = build_help_message(Some(&driver_missing()), &FakeEnvironment::default());
        assert!(msg.contains("nvcc not found on PATH"));
        assert!(msg.contains("set CUDA_INC_DIR"));
    }

    #[test]
    fn test_configured_environment_omits_hints() {
        let mut env = FakeEnvironment::default();
        env.executables.push(TOOLCHAIN_BINARY.to_string());
        env.vars
            .insert(INCLUDE_DIR_VAR.to_string(), "/opt/cuda/include".to_string());

        let msg = build_help_message(Some(&driver_missing()), &env);
        assert!(!msg.contains("not found on PATH"));
        assert!(!msg.contains("set CUDA_INC_DIR"));
        assert!(msg.contains("Install CUDA prerequisites"));
    }
}
