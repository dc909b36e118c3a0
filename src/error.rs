//! Error types for montecarlo-app.
//!
//! Every fallible operation returns `Result<T, McError>` instead of
//! panicking. The capability prober is the one exception: its acquisition
//! failures are converted into warnings and never surface as `McError`.

use thiserror::Error;

/// Result type alias for montecarlo-app operations.
pub type McResult<T> = Result<T, McError>;

/// Unified error type for all montecarlo-app operations.
#[derive(Debug, Error)]
pub enum McError {
    // ===== Numerical Faults =====
    /// A caller-supplied parameter is outside its valid domain.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the invalid parameter.
        message: String,
    },

    /// No sample landed in the forward hemisphere, so the mean is undefined.
    #[error("No forward-hemisphere samples among {samples} draws; efficiency is undefined")]
    NoForwardSamples {
        /// Number of samples drawn.
        samples: usize,
    },

    /// Numerical instability detected (NaN or Inf).
    #[error("Non-finite value detected at {location}")]
    NonFiniteValue {
        /// Location where the non-finite value was detected.
        location: String,
    },

    /// Tensor shape does not match what the model expects.
    #[error("Shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Expected shape.
        expected: String,
        /// Observed shape.
        found: String,
    },

    // ===== Experiment Errors =====
    /// Control-task environment failure.
    #[error("Environment error: {0}")]
    Environment(String),

    /// Plot rendering failure.
    #[error("Render error: {0}")]
    Render(String),

    // ===== Configuration Errors =====
    /// Invalid configuration parameter.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== I/O Errors =====
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl McError {
    /// Create an invalid-input error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an environment error.
    #[must_use]
    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment(message.into())
    }

    /// Create a render error.
    #[must_use]
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a non-finite value error.
    #[must_use]
    pub fn non_finite(location: impl Into<String>) -> Self {
        Self::NonFiniteValue {
            location: location.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_invalid_input_display() {
        let err = McError::invalid_input("sample_count must be at least 1");
        let msg = err.to_string();
        assert!(msg.contains("Invalid input"));
        assert!(msg.contains("sample_count"));
    }

    #[test]
    fn test_error_no_forward_samples_display() {
        let msg = McError::NoForwardSamples { samples: 3 }.to_string();
        assert!(msg.contains("3 draws"));
        assert!(msg.contains("undefined"));
    }

    #[test]
    fn test_error_config() {
        let msg = McError::config("grid_min must be below grid_max").to_string();
        assert!(msg.contains("Configuration error"));
        assert!(msg.contains("grid_min"));
    }

    #[test]
    fn test_error_environment() {
        let msg = McError::environment("episode already finished").to_string();
        assert!(msg.contains("Environment error"));
    }

    #[test]
    fn test_error_render() {
        let msg = McError::render("backend failed").to_string();
        assert!(msg.contains("Render error"));
    }

    #[test]
    fn test_error_serialization() {
        let msg = McError::serialization("bincode").to_string();
        assert!(msg.contains("Serialization error"));
    }

    #[test]
    fn test_error_io_from() {
        let err: McError = std::io::Error::other("disk full").into();
        assert!(matches!(err, McError::Io(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_error_shape_display() {
        let err = McError::ShapeMismatch {
            expected: "[4, 1]".to_string(),
            found: "[4, 2]".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("[4, 1]"));
        assert!(msg.contains("[4, 2]"));
    }
}
