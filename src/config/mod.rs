//! Configuration system with YAML schema and validation.
//!
//! Mistakes are caught before any experiment runs:
//! - Type-safe configuration structs
//! - Unknown keys rejected by serde
//! - Runtime semantic validation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::domains::bnn::BnnConfig;
use crate::domains::monte_carlo::{BeamPhysics, DEFAULT_SAMPLES};
use crate::domains::reinforce::{make_env, ReinforceConfig};
use crate::domains::sampling::SamplingConfig;
use crate::error::{McError, McResult};

/// Top-level suite configuration.
///
/// Every section is optional in YAML; omitted sections take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    /// Schema version for forward compatibility.
    #[validate(length(min = 1))]
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Reproducibility settings.
    #[validate(nested)]
    #[serde(default)]
    pub reproducibility: ReproducibilityConfig,

    /// Beam-efficiency estimator.
    #[validate(nested)]
    #[serde(default)]
    pub estimator: EstimatorConfig,

    /// Policy-gradient training.
    #[validate(nested)]
    #[serde(default)]
    pub reinforce: ReinforceConfig,

    /// MC-Dropout uncertainty.
    #[validate(nested)]
    #[serde(default)]
    pub bnn: BnnConfig,

    /// Latent-prior sampling.
    #[validate(nested)]
    #[serde(default)]
    pub sampling: SamplingConfig,

    /// Rendering output.
    #[validate(nested)]
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

impl SuiteConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> McResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> McResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Schema and semantic validation.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for schema violations and `Config` for semantic
    /// ones.
    pub fn check(&self) -> McResult<()> {
        self.validate()?;
        self.validate_semantic()
    }

    /// Create a builder for configuration.
    #[must_use]
    pub fn builder() -> SuiteConfigBuilder {
        SuiteConfigBuilder::default()
    }

    /// Serialize back to YAML.
    ///
    /// # Errors
    ///
    /// Returns `YamlParse` if serialization fails.
    pub fn to_yaml(&self) -> McResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate semantic constraints beyond schema.
    fn validate_semantic(&self) -> McResult<()> {
        self.estimator.physics.check()?;

        if self.bnn.grid_min >= self.bnn.grid_max {
            return Err(McError::config(format!(
                "bnn.grid_min ({}) must be below bnn.grid_max ({})",
                self.bnn.grid_min, self.bnn.grid_max
            )));
        }
        if !(0.0..1.0).contains(&self.bnn.dropout) {
            return Err(McError::config(format!(
                "bnn.dropout must be in [0, 1), got {}",
                self.bnn.dropout
            )));
        }

        make_env(&self.reinforce.env, self.reinforce.max_steps)
            .map_err(|e| McError::config(format!("reinforce.env: {e}")))?;

        if let Some(path) = &self.output.plot_path {
            if path.extension().and_then(|e| e.to_str()) != Some("svg") {
                return Err(McError::config(format!(
                    "output.plot_path must end in .svg, got {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            reproducibility: ReproducibilityConfig::default(),
            estimator: EstimatorConfig::default(),
            reinforce: ReinforceConfig::default(),
            bnn: BnnConfig::default(),
            sampling: SamplingConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct SuiteConfigBuilder {
    seed: Option<u64>,
    episodes: Option<usize>,
    mc_samples: Option<usize>,
    plot_path: Option<PathBuf>,
}

impl SuiteConfigBuilder {
    /// Set the master seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the number of training episodes.
    #[must_use]
    pub const fn episodes(mut self, episodes: usize) -> Self {
        self.episodes = Some(episodes);
        self
    }

    /// Set the MC-Dropout pass count.
    #[must_use]
    pub const fn mc_samples(mut self, passes: usize) -> Self {
        self.mc_samples = Some(passes);
        self
    }

    /// Render the uncertainty plot to this SVG file.
    #[must_use]
    pub fn plot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.plot_path = Some(path.into());
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> SuiteConfig {
        let mut config = SuiteConfig::default();

        if let Some(seed) = self.seed {
            config.reproducibility.seed = Some(seed);
        }
        if let Some(episodes) = self.episodes {
            config.reinforce.episodes = episodes;
        }
        if let Some(passes) = self.mc_samples {
            config.bnn.mc_samples = passes;
        }
        if self.plot_path.is_some() {
            config.output.plot_path = self.plot_path;
        }

        config
    }
}

/// Reproducibility settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ReproducibilityConfig {
    /// Master seed for the training and inference streams; entropy-seeded
    /// when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Beam-efficiency estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Beam constants.
    #[validate(nested)]
    #[serde(default)]
    pub physics: BeamPhysics,
    /// Number of sampled directions.
    #[validate(range(min = 1))]
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Probe the accelerated backend first.
    #[serde(default)]
    pub use_accelerated: bool,
}

const fn default_samples() -> usize {
    DEFAULT_SAMPLES
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            physics: BeamPhysics::default(),
            samples: DEFAULT_SAMPLES,
            use_accelerated: false,
        }
    }
}

/// Rendering output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// SVG destination; a text summary is printed when absent.
    #[serde(default)]
    pub plot_path: Option<PathBuf>,
    /// Plot width in pixels.
    #[validate(range(min = 100, max = 8192))]
    #[serde(default = "default_width")]
    pub width: u32,
    /// Plot height in pixels.
    #[validate(range(min = 100, max = 8192))]
    #[serde(default = "default_height")]
    pub height: u32,
}

const fn default_width() -> u32 {
    800
}

const fn default_height() -> u32 {
    600
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            plot_path: None,
            width: default_width(),
            height: default_height(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SuiteConfig::default();

        assert_eq!(config.schema_version, "1.0");
        assert_eq!(config.reproducibility.seed, None);
        assert_eq!(config.estimator.samples, 10_000);
        assert_eq!(config.reinforce.episodes, 1000);
        assert_eq!(config.bnn.mc_samples, 100);
        assert_eq!(config.sampling.seed, 0);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SuiteConfig::builder()
            .seed(12345)
            .episodes(5)
            .mc_samples(10)
            .plot_path("band.svg")
            .build();

        assert_eq!(config.reproducibility.seed, Some(12345));
        assert_eq!(config.reinforce.episodes, 5);
        assert_eq!(config.bnn.mc_samples, 10);
        assert_eq!(config.output.plot_path, Some(PathBuf::from("band.svg")));
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = SuiteConfig::from_yaml("{}");
        assert!(config.is_ok());
    }

    #[test]
    fn test_config_yaml_parse() {
        let yaml = r"
reproducibility:
  seed: 42
reinforce:
  episodes: 20
  gamma: 0.95
bnn:
  mc_samples: 50
sampling:
  latent_dim: 2
";
        let config = SuiteConfig::from_yaml(yaml).ok();
        assert!(config.is_some());
        let config = config.unwrap_or_default();
        assert_eq!(config.reproducibility.seed, Some(42));
        assert_eq!(config.reinforce.episodes, 20);
        assert_eq!(config.reinforce.hidden, 16);
        assert_eq!(config.bnn.mc_samples, 50);
        assert_eq!(config.sampling.latent_dim, 2);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = SuiteConfig::from_yaml("reinforce:\n  episods: 3\n");
        assert!(matches!(result, Err(McError::YamlParse(_))));
    }

    #[test]
    fn test_schema_violation_rejected() {
        let result = SuiteConfig::from_yaml("estimator:\n  samples: 0\n");
        assert!(matches!(result, Err(McError::Validation(_))));
    }

    #[test]
    fn test_unordered_grid_rejected() {
        let yaml = "bnn:\n  grid_min: 2.0\n  grid_max: -2.0\n";
        assert!(matches!(SuiteConfig::from_yaml(yaml), Err(McError::Config { .. })));
    }

    #[test]
    fn test_unknown_env_rejected() {
        let yaml = "reinforce:\n  env: Acrobot-v1\n";
        assert!(matches!(SuiteConfig::from_yaml(yaml), Err(McError::Config { .. })));
    }

    #[test]
    fn test_plot_path_must_be_svg() {
        let yaml = "output:\n  plot_path: out.png\n";
        assert!(SuiteConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suite.yaml");
        std::fs::write(&path, "reproducibility:\n  seed: 7\n").unwrap();

        let config = SuiteConfig::load(&path).unwrap();
        assert_eq!(config.reproducibility.seed, Some(7));

        assert!(matches!(
            SuiteConfig::load(dir.path().join("missing.yaml")),
            Err(McError::Io(_))
        ));
    }

    #[test]
    fn test_yaml_round_trip_preserves_sections() {
        let config = SuiteConfig::builder().seed(3).episodes(9).build();
        let yaml = config.to_yaml().unwrap();
        let parsed = SuiteConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.reproducibility.seed, Some(3));
        assert_eq!(parsed.reinforce.episodes, 9);
    }
}
