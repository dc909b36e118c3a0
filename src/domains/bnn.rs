//! Epistemic uncertainty via Monte Carlo Dropout.
//!
//! Dropout stays active at inference; repeated stochastic passes are reduced
//! to a per-point mean and standard deviation.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::nn::{relu, Dense};
use super::stats::RollingStats;
use crate::engine::rng::SimRng;
use crate::error::{McError, McResult};

/// MC-Dropout experiment configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BnnConfig {
    /// Hidden layer width.
    #[validate(range(min = 1))]
    #[serde(default = "default_hidden")]
    pub hidden: usize,
    /// Dropout probability, in `[0, 1)`.
    #[validate(range(min = 0.0, exclusive_max = 1.0))]
    #[serde(default = "default_dropout")]
    pub dropout: f64,
    /// Stochastic passes per prediction.
    #[validate(range(min = 1))]
    #[serde(default = "default_mc_samples")]
    pub mc_samples: usize,
    /// Grid lower bound.
    #[serde(default = "default_grid_min")]
    pub grid_min: f64,
    /// Grid upper bound.
    #[serde(default = "default_grid_max")]
    pub grid_max: f64,
    /// Grid size.
    #[validate(range(min = 1))]
    #[serde(default = "default_grid_points")]
    pub grid_points: usize,
}

const fn default_hidden() -> usize {
    64
}

const fn default_dropout() -> f64 {
    0.1
}

const fn default_mc_samples() -> usize {
    100
}

const fn default_grid_min() -> f64 {
    -3.0
}

const fn default_grid_max() -> f64 {
    3.0
}

const fn default_grid_points() -> usize {
    100
}

impl Default for BnnConfig {
    fn default() -> Self {
        Self {
            hidden: default_hidden(),
            dropout: default_dropout(),
            mc_samples: default_mc_samples(),
            grid_min: default_grid_min(),
            grid_max: default_grid_max(),
            grid_points: default_grid_points(),
        }
    }
}

/// Regression network `1 → hidden (ReLU) → Dropout(p) → 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McDropoutNet {
    fc1: Dense,
    fc2: Dense,
    dropout: f64,
}

impl McDropoutNet {
    /// Randomly initialized network.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if `dropout` is outside `[0, 1)` or `hidden`
    /// is zero.
    pub fn new(hidden: usize, dropout: f64, rng: &mut SimRng) -> McResult<Self> {
        if hidden == 0 {
            return Err(McError::invalid_input("hidden width must be positive"));
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(McError::invalid_input(format!(
                "dropout must be in [0, 1), got {dropout}"
            )));
        }
        Ok(Self {
            fc1: Dense::new(1, hidden, rng),
            fc2: Dense::new(hidden, 1, rng),
            dropout,
        })
    }

    /// Dropout probability.
    #[must_use]
    pub const fn dropout(&self) -> f64 {
        self.dropout
    }

    /// One stochastic forward pass over a `[B, 1]` batch, with inverted
    /// dropout scaling.
    pub fn forward_stochastic(&self, x: ArrayView2<'_, f64>, rng: &mut SimRng) -> Array2<f64> {
        let mut hidden = relu(&self.fc1.forward(x));
        let keep_scale = 1.0 / (1.0 - self.dropout);
        hidden.mapv_inplace(|h| if rng.gen_bool(self.dropout) { 0.0 } else { h * keep_scale });
        self.fc2.forward(hidden.view())
    }
}

/// Monte Carlo prediction over a `[B, 1]` batch.
///
/// Returns `(mean, std)`, each `[B, 1]`. The deviation uses the sample
/// (n − 1) estimator and is zero for a single pass.
///
/// # Errors
///
/// Returns `ShapeMismatch` unless `x` has exactly one column,
/// `InvalidInput` for `n_samples == 0`, and `NonFiniteValue` if a pass
/// produces a non-finite output.
pub fn predict_mc(
    model: &McDropoutNet,
    x: &Array2<f64>,
    n_samples: usize,
    rng: &mut SimRng,
) -> McResult<(Array2<f64>, Array2<f64>)> {
    let (rows, cols) = x.dim();
    if cols != 1 {
        return Err(McError::ShapeMismatch {
            expected: "[B, 1]".to_string(),
            found: format!("[{rows}, {cols}]"),
        });
    }
    if n_samples == 0 {
        return Err(McError::invalid_input("n_samples must be at least 1"));
    }

    let mut stats = vec![RollingStats::new(0); rows];
    for _ in 0..n_samples {
        let y = model.forward_stochastic(x.view(), rng);
        for (acc, &v) in stats.iter_mut().zip(y.iter()) {
            if !v.is_finite() {
                return Err(McError::non_finite("MC-Dropout forward pass"));
            }
            acc.update(v);
        }
    }

    let mean = Array2::from_shape_fn((rows, 1), |(i, _)| stats[i].mean());
    let std = Array2::from_shape_fn((rows, 1), |(i, _)| stats[i].std_dev());
    Ok((mean, std))
}

/// Predictive mean and spread over an input grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyBand {
    /// Grid points.
    pub x: Vec<f64>,
    /// Predictive mean per point.
    pub mean: Vec<f64>,
    /// Predictive standard deviation per point.
    pub std: Vec<f64>,
}

impl UncertaintyBand {
    /// Number of grid points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the band is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// `mean − 2σ` per point.
    #[must_use]
    pub fn lower(&self) -> Vec<f64> {
        self.mean.iter().zip(&self.std).map(|(m, s)| m - 2.0 * s).collect()
    }

    /// `mean + 2σ` per point.
    #[must_use]
    pub fn upper(&self) -> Vec<f64> {
        self.mean.iter().zip(&self.std).map(|(m, s)| m + 2.0 * s).collect()
    }

    /// Largest σ on the grid.
    #[must_use]
    pub fn max_std(&self) -> f64 {
        self.std.iter().copied().fold(0.0, f64::max)
    }

    /// `(min, max)` of the mean curve, if non-empty.
    #[must_use]
    pub fn mean_range(&self) -> Option<(f64, f64)> {
        let min = self.mean.iter().copied().min_by(f64::total_cmp)?;
        let max = self.mean.iter().copied().max_by(f64::total_cmp)?;
        Some((min, max))
    }

    /// `(min, max)` over the ±2σ envelope, if non-empty.
    #[must_use]
    pub fn envelope(&self) -> Option<(f64, f64)> {
        let lo = self.lower().into_iter().min_by(f64::total_cmp)?;
        let hi = self.upper().into_iter().max_by(f64::total_cmp)?;
        Some((lo, hi))
    }
}

/// Build a fresh network and evaluate it on the configured grid.
///
/// # Errors
///
/// Returns `Config` for an unordered grid, otherwise propagates
/// construction and prediction errors.
pub fn uncertainty_band(config: &BnnConfig, rng: &mut SimRng) -> McResult<UncertaintyBand> {
    if config.grid_min >= config.grid_max {
        return Err(McError::config(format!(
            "bnn grid_min ({}) must be below grid_max ({})",
            config.grid_min, config.grid_max
        )));
    }
    let model = McDropoutNet::new(config.hidden, config.dropout, rng)?;
    let x = Array1::linspace(config.grid_min, config.grid_max, config.grid_points);
    let grid = x.clone().insert_axis(Axis(1));
    let (mean, std) = predict_mc(&model, &grid, config.mc_samples, rng)?;

    tracing::debug!(
        points = x.len(),
        passes = config.mc_samples,
        "mc-dropout prediction complete"
    );

    Ok(UncertaintyBand {
        x: x.to_vec(),
        mean: mean.iter().copied().collect(),
        std: std.iter().copied().collect(),
    })
}
