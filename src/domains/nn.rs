//! Minimal dense networks with hand-derived gradients.
//!
//! Just enough machinery for the policy and MC-Dropout networks: batched
//! fully connected layers with a manual backward pass, ReLU, row-wise
//! softmax and the Adam optimizer. Batches are `[B, features]`.

use ndarray::{Array1, Array2, ArrayD, ArrayView2, ArrayViewD, ArrayViewMutD, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::engine::rng::SimRng;
use crate::error::{McError, McResult};

/// Elementwise ReLU.
#[must_use]
pub fn relu(x: &Array2<f64>) -> Array2<f64> {
    x.mapv(|v| v.max(0.0))
}

/// Numerically stable softmax over each row.
#[must_use]
pub fn softmax_rows(logits: &Array2<f64>) -> Array2<f64> {
    let mut out = logits.clone();
    for mut row in out.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|z| (z - max).exp());
        let total = row.sum();
        row /= total;
    }
    out
}

/// Fully connected layer `y = x W + b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    /// `inputs × outputs`.
    pub(crate) weights: Array2<f64>,
    pub(crate) bias: Array1<f64>,
}

/// Gradient accumulator for one [`Dense`] layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseGrads {
    /// Weight gradients, same shape as the weights.
    pub weights: Array2<f64>,
    /// Bias gradients.
    pub bias: Array1<f64>,
}

impl DenseGrads {
    /// Squared L2 norm of all gradients.
    #[must_use]
    pub fn norm_sq(&self) -> f64 {
        self.weights.iter().chain(self.bias.iter()).map(|g| g * g).sum()
    }
}

impl Dense {
    /// Layer with weights and biases drawn from `U(−1/√in, 1/√in)`.
    #[must_use]
    pub fn new(inputs: usize, outputs: usize, rng: &mut SimRng) -> Self {
        let bound = 1.0 / (inputs.max(1) as f64).sqrt();
        let weights = Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range_f64(-bound, bound));
        let bias = Array1::from_shape_fn(outputs, |_| rng.gen_range_f64(-bound, bound));
        Self { weights, bias }
    }

    /// Input width.
    #[must_use]
    pub fn inputs(&self) -> usize {
        self.weights.nrows()
    }

    /// Output width.
    #[must_use]
    pub fn outputs(&self) -> usize {
        self.weights.ncols()
    }

    /// Zeroed gradient buffer matching this layer.
    #[must_use]
    pub fn zero_grads(&self) -> DenseGrads {
        DenseGrads {
            weights: Array2::zeros(self.weights.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    /// Forward pass over a `[B, inputs]` batch.
    #[must_use]
    pub fn forward(&self, input: ArrayView2<'_, f64>) -> Array2<f64> {
        input.dot(&self.weights) + &self.bias
    }

    /// Accumulate parameter gradients for a batch and return `dL/dx`.
    pub fn backward(
        &self,
        input: ArrayView2<'_, f64>,
        grad_out: ArrayView2<'_, f64>,
        grads: &mut DenseGrads,
    ) -> Array2<f64> {
        grads.weights += &input.t().dot(&grad_out);
        grads.bias += &grad_out.sum_axis(Axis(0));
        grad_out.dot(&self.weights.t())
    }
}

/// Adam optimizer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    /// Learning rate.
    pub learning_rate: f64,
    /// First-moment decay.
    pub beta1: f64,
    /// Second-moment decay.
    pub beta2: f64,
    /// Denominator epsilon.
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

/// Adam (Kingma & Ba, 2015) over an ordered list of parameter arrays.
///
/// Moment buffers are allocated lazily on the first step; later steps must
/// pass arrays of identical shapes in the same order.
#[derive(Debug, Clone)]
pub struct Adam {
    config: AdamConfig,
    m: Vec<ArrayD<f64>>,
    v: Vec<ArrayD<f64>>,
    t: u32,
}

impl Adam {
    /// Create a new Adam optimizer.
    #[must_use]
    pub fn new(config: AdamConfig) -> Self {
        Self {
            config,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    /// Steps taken.
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.t
    }

    /// Apply one update.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` when parameter and gradient lists disagree,
    /// or differ from the shapes seen on the first step.
    pub fn step(&mut self, params: &mut [ArrayViewMutD<'_, f64>], grads: &[ArrayViewD<'_, f64>]) -> McResult<()> {
        if params.len() != grads.len() || params.iter().zip(grads).any(|(p, g)| p.shape() != g.shape()) {
            return Err(McError::ShapeMismatch {
                expected: "one gradient per parameter, equal shapes".to_string(),
                found: format!("{} params, {} grads", params.len(), grads.len()),
            });
        }

        if self.m.is_empty() {
            self.m = params.iter().map(|p| ArrayD::zeros(p.raw_dim())).collect();
            self.v = self.m.clone();
        } else if self.m.len() != params.len()
            || self.m.iter().zip(params.iter()).any(|(m, p)| m.shape() != p.shape())
        {
            return Err(McError::ShapeMismatch {
                expected: format!("{} parameter groups", self.m.len()),
                found: format!("{} parameter groups", params.len()),
            });
        }

        self.t += 1;
        let AdamConfig {
            learning_rate: lr,
            beta1,
            beta2,
            epsilon: eps,
        } = self.config;
        let t = self.t as i32;
        let lr_t = lr * (1.0 - beta2.powi(t)).sqrt() / (1.0 - beta1.powi(t));

        for ((param, grad), (m, v)) in params
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            Zip::from(param)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    *p -= lr_t * *m / (v.sqrt() + eps);
                });
        }
        Ok(())
    }
}
