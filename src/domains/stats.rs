//! Streaming statistics shared by the experiments.

use serde::{Deserialize, Serialize};

/// Running mean and variance (Welford's algorithm) with an optional
/// trailing window for moving averages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollingStats {
    /// Number of observations.
    count: u64,
    /// Running mean.
    mean: f64,
    /// Running M2 for variance calculation.
    m2: f64,
    /// Window size (0 = unlimited).
    window_size: usize,
    /// Recent values for windowed stats.
    recent: std::collections::VecDeque<f64>,
}

impl RollingStats {
    /// Create new rolling stats with optional window.
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            ..Self::default()
        }
    }

    /// Update with new observation.
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;

        if self.window_size > 0 {
            self.recent.push_back(value);
            if self.recent.len() > self.window_size {
                self.recent.pop_front();
            }
        }
    }

    /// Number of observations.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Get current mean.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased sample variance; zero below two observations.
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).max(0.0)
    }

    /// Get current standard deviation.
    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Mean over the trailing window (all observations if unwindowed).
    #[must_use]
    pub fn window_mean(&self) -> f64 {
        if self.recent.is_empty() {
            return self.mean;
        }
        self.recent.iter().sum::<f64>() / self.recent.len() as f64
    }
}
