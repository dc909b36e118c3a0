//! Seeded draws from a standard multivariate normal latent prior.

use ndarray::{Array2, Axis};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::rng::SimRng;
use crate::error::{McError, McResult};

/// Latent-sampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SamplingConfig {
    /// Latent dimension.
    #[validate(range(min = 1))]
    #[serde(default = "default_latent_dim")]
    pub latent_dim: usize,
    /// Number of draws.
    #[validate(range(min = 1))]
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,
    /// Sampler seed.
    #[serde(default)]
    pub seed: u64,
}

const fn default_latent_dim() -> usize {
    4
}

const fn default_n_samples() -> usize {
    1000
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            latent_dim: default_latent_dim(),
            n_samples: default_n_samples(),
            seed: 0,
        }
    }
}

/// Draws from the latent prior, `n × d`, plus per-dimension means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentSamples {
    seed: u64,
    samples: Array2<f64>,
    means: Vec<f64>,
}

impl LatentSamples {
    /// Seed used for the draws.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Sample matrix, one row per draw.
    #[must_use]
    pub const fn samples(&self) -> &Array2<f64> {
        &self.samples
    }

    /// Empirical mean of each latent dimension.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// BLAKE3 digest (hex) of the sample matrix.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn fingerprint(&self) -> McResult<String> {
        let bytes = bincode::serialize(&self.samples)
            .map_err(|e| McError::serialization(e.to_string()))?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}

/// Draw `n_samples` vectors from `N(0, I_latent_dim)` with a fixed seed.
///
/// # Errors
///
/// Returns `InvalidInput` if either dimension is zero.
pub fn sample_latent(seed: u64, latent_dim: usize, n_samples: usize) -> McResult<LatentSamples> {
    if latent_dim == 0 || n_samples == 0 {
        return Err(McError::invalid_input(format!(
            "latent sampling needs positive sizes, got {n_samples} x {latent_dim}"
        )));
    }
    let prior = Normal::new(0.0, 1.0).map_err(|e| McError::invalid_input(e.to_string()))?;
    let mut rng = SimRng::new(seed);

    // Row-major fill keeps draw order independent of the latent layout.
    let samples = Array2::from_shape_fn((n_samples, latent_dim), |_| rng.sample(&prior));
    let means = samples
        .mean_axis(Axis(0))
        .ok_or_else(|| McError::invalid_input("latent sample matrix is empty"))?
        .to_vec();

    Ok(LatentSamples {
        seed,
        samples,
        means,
    })
}

/// Render per-dimension means as `[0.0123, -0.0045, ...]`.
#[must_use]
pub fn format_means(means: &[f64]) -> String {
    let parts: Vec<String> = means.iter().map(|m| format!("{m:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

/// [`sample_latent`] driven by a config section.
///
/// # Errors
///
/// See [`sample_latent`].
pub fn sample_from_config(config: &SamplingConfig) -> McResult<LatentSamples> {
    sample_latent(config.seed, config.latent_dim, config.n_samples)
}
