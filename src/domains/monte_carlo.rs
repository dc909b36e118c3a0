//! Monte Carlo beam-efficiency estimator.
//!
//! Samples isotropic emission directions for a monoenergetic ion beam and
//! estimates the mean forward velocity fraction:
//!
//! ```text
//! v0      = sqrt(2E / m)
//! θ_i     = arccos(1 − 2U_i),  U_i ~ U[0, 1)
//! vz_i    = v0 · cos θ_i
//! η       = mean(vz_i / v0 | vz_i > 0)
//! ```
//!
//! Inverse-CDF sampling of `θ` makes directions uniform over solid angle,
//! not uniform in angle. For an isotropic source η converges to 1/2.
//!
//! The accelerated backend is only probed, never dispatched: every estimate
//! runs on the CPU.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::stats::RollingStats;
use crate::accel::{CapabilityProber, TracingSink, WarningSink};
use crate::engine::rng::SimRng;
use crate::error::{McError, McResult};

/// Elementary charge in coulombs (exact, SI 2019).
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Default sample count.
pub const DEFAULT_SAMPLES: usize = 10_000;

/// Physical constants of the simulated beam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct BeamPhysics {
    /// Particle charge in coulombs.
    #[serde(default = "default_charge")]
    pub charge: f64,
    /// Particle mass in kilograms.
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_mass")]
    pub mass: f64,
    /// Kinetic energy in joules.
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_energy")]
    pub kinetic_energy: f64,
}

fn default_charge() -> f64 {
    20.0 * ELEMENTARY_CHARGE
}

const fn default_mass() -> f64 {
    1.6e-25
}

fn default_energy() -> f64 {
    100e6 * ELEMENTARY_CHARGE
}

impl Default for BeamPhysics {
    fn default() -> Self {
        Self {
            charge: default_charge(),
            mass: default_mass(),
            kinetic_energy: default_energy(),
        }
    }
}

impl BeamPhysics {
    /// Initial speed `sqrt(2E/m)` in m/s.
    #[must_use]
    pub fn initial_speed(&self) -> f64 {
        (2.0 * self.kinetic_energy / self.mass).sqrt()
    }

    /// Charge-to-mass ratio in C/kg.
    #[must_use]
    pub fn charge_to_mass(&self) -> f64 {
        self.charge / self.mass
    }

    /// Check that the derived speed is finite and positive.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for non-positive or non-finite mass or energy.
    pub fn check(&self) -> McResult<()> {
        for (name, value) in [("mass", self.mass), ("kinetic_energy", self.kinetic_energy)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(McError::invalid_input(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        let v0 = self.initial_speed();
        if !v0.is_finite() || v0 <= 0.0 {
            return Err(McError::invalid_input(format!(
                "initial speed must be positive and finite, got {v0}"
            )));
        }
        Ok(())
    }
}

/// Per-invocation simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Number of directions to sample.
    pub sample_count: usize,
    /// Probe for the accelerated backend before running.
    pub use_accelerated: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLES,
            use_accelerated: false,
        }
    }
}

impl SimulationParams {
    /// Parameters with the given sample count.
    #[must_use]
    pub const fn with_samples(sample_count: usize) -> Self {
        Self {
            sample_count,
            use_accelerated: false,
        }
    }

    /// Request an accelerator probe.
    #[must_use]
    pub const fn accelerated(mut self, use_accelerated: bool) -> Self {
        self.use_accelerated = use_accelerated;
        self
    }
}

/// Result of an efficiency estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfficiencyEstimate {
    /// Mean forward velocity fraction, in [0, 1].
    pub efficiency: f64,
    /// Samples with positive axial velocity.
    pub forward_samples: usize,
    /// Samples drawn.
    pub total_samples: usize,
    /// Standard error of the mean over forward samples.
    pub std_error: f64,
    /// 95% confidence interval (efficiency ± 1.96 · `std_error`).
    pub confidence_interval: (f64, f64),
    /// Initial speed in m/s.
    pub initial_speed: f64,
    /// Probe outcome; `None` when no probe was requested.
    pub accelerator: Option<bool>,
}

impl EfficiencyEstimate {
    /// Fraction of samples that landed in the forward hemisphere.
    #[must_use]
    pub fn acceptance(&self) -> f64 {
        self.forward_samples as f64 / self.total_samples as f64
    }

    /// Check if value is within confidence interval.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.confidence_interval.0 && value <= self.confidence_interval.1
    }
}

/// Isotropic-emission efficiency estimator.
#[derive(Debug, Clone)]
pub struct EfficiencyEstimator {
    physics: BeamPhysics,
    params: SimulationParams,
}

impl EfficiencyEstimator {
    /// Create an estimator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `sample_count < 1` or the physics is
    /// degenerate.
    pub fn new(physics: BeamPhysics, params: SimulationParams) -> McResult<Self> {
        if params.sample_count < 1 {
            return Err(McError::invalid_input(format!(
                "sample_count must be at least 1, got {}",
                params.sample_count
            )));
        }
        physics.check()?;
        Ok(Self { physics, params })
    }

    /// Beam constants in use.
    #[must_use]
    pub const fn physics(&self) -> &BeamPhysics {
        &self.physics
    }

    /// Simulation parameters in use.
    #[must_use]
    pub const fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Run the estimate.
    ///
    /// When `use_accelerated` is set the prober is consulted first; the CPU
    /// path runs whatever it reports.
    ///
    /// # Errors
    ///
    /// Returns `NoForwardSamples` when no draw has positive axial velocity,
    /// or `NonFiniteValue` if the estimate is not finite.
    pub fn run(
        &self,
        rng: &mut SimRng,
        prober: &CapabilityProber,
        sink: &mut dyn WarningSink,
    ) -> McResult<EfficiencyEstimate> {
        let accelerator = if self.params.use_accelerated {
            let available = prober.warn_if_unavailable(sink);
            tracing::info!(available, "accelerated path requested; running on CPU");
            Some(available)
        } else {
            None
        };

        let v0 = self.physics.initial_speed();
        let n = self.params.sample_count;

        let mut ratios = RollingStats::new(0);
        for _ in 0..n {
            let u = rng.gen_f64();
            let theta = (1.0 - 2.0 * u).acos();
            let vz = v0 * theta.cos();
            if vz > 0.0 {
                ratios.update(vz / v0);
            }
        }

        // Bounded by `n`, which is a usize.
        let forward = ratios.count() as usize;
        if forward == 0 {
            return Err(McError::NoForwardSamples { samples: n });
        }

        let mean = ratios.mean();
        if !mean.is_finite() {
            return Err(McError::non_finite("efficiency"));
        }
        let std_error = ratios.std_dev() / (forward as f64).sqrt();
        let ci_half = 1.96 * std_error;

        tracing::debug!(samples = n, forward, efficiency = mean, "efficiency estimated");

        Ok(EfficiencyEstimate {
            efficiency: mean,
            forward_samples: forward,
            total_samples: n,
            std_error,
            confidence_interval: (mean - ci_half, mean + ci_half),
            initial_speed: v0,
            accelerator,
        })
    }
}

/// Estimate the beam efficiency with default physics.
///
/// Uses an entropy-seeded RNG and the host's capability prober.
///
/// # Errors
///
/// See [`EfficiencyEstimator::new`] and [`EfficiencyEstimator::run`].
///
/// # Example
///
/// ```rust
/// use montecarlo_app::domains::monte_carlo::simulate;
///
/// let efficiency = simulate(10_000, false).unwrap();
/// assert!((0.0..=1.0).contains(&efficiency));
/// ```
pub fn simulate(sample_count: usize, use_accelerated: bool) -> McResult<f64> {
    let params = SimulationParams::with_samples(sample_count).accelerated(use_accelerated);
    let estimator = EfficiencyEstimator::new(BeamPhysics::default(), params)?;
    let mut rng = SimRng::from_entropy();
    let prober = CapabilityProber::system();
    estimator
        .run(&mut rng, &prober, &mut TracingSink)
        .map(|estimate| estimate.efficiency)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::accel::testing::{missing_prober, present_prober};
    use crate::accel::CollectingSink;
    use approx::assert_relative_eq;

    fn estimate(samples: usize, seed: u64) -> McResult<EfficiencyEstimate> {
        let estimator =
            EfficiencyEstimator::new(BeamPhysics::default(), SimulationParams::with_samples(samples))?;
        estimator.run(&mut SimRng::new(seed), &missing_prober(), &mut CollectingSink::default())
    }

    #[test]
    fn test_default_physics() {
        let physics = BeamPhysics::default();
        assert_relative_eq!(physics.charge, 20.0 * ELEMENTARY_CHARGE);
        assert_relative_eq!(physics.mass, 1.6e-25);
        // sqrt(2 · 100 MeV / 1.6e-25 kg) ≈ 1.4152e7 m/s
        assert_relative_eq!(physics.initial_speed(), 1.415_175_2e7, max_relative = 1e-6);
        assert!(physics.charge_to_mass() > 0.0);
    }

    #[test]
    fn test_converges_to_one_half() {
        let result = estimate(200_000, 42).unwrap();
        assert!(
            (result.efficiency - 0.5).abs() < 0.005,
            "efficiency {} far from 0.5",
            result.efficiency
        );
        assert!(result.contains(0.5) || (result.efficiency - 0.5).abs() < 4.0 * result.std_error);
        assert!((result.acceptance() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_zero_samples_rejected() {
        let err = EfficiencyEstimator::new(BeamPhysics::default(), SimulationParams::with_samples(0))
            .unwrap_err();
        assert!(matches!(err, McError::InvalidInput { .. }));
    }

    #[test]
    fn test_degenerate_physics_rejected() {
        let physics = BeamPhysics {
            mass: 0.0,
            ..BeamPhysics::default()
        };
        assert!(EfficiencyEstimator::new(physics, SimulationParams::default()).is_err());

        let physics = BeamPhysics {
            kinetic_energy: f64::NAN,
            ..BeamPhysics::default()
        };
        assert!(EfficiencyEstimator::new(physics, SimulationParams::default()).is_err());
    }

    #[test]
    fn test_estimate_is_independent_of_beam_constants() {
        let params = SimulationParams::with_samples(5_000);
        let heavy = BeamPhysics {
            mass: 1e-20,
            ..BeamPhysics::default()
        };
        let a = EfficiencyEstimator::new(BeamPhysics::default(), params)
            .unwrap()
            .run(&mut SimRng::new(9), &missing_prober(), &mut CollectingSink::default())
            .unwrap();
        let b = EfficiencyEstimator::new(heavy, params)
            .unwrap()
            .run(&mut SimRng::new(9), &missing_prober(), &mut CollectingSink::default())
            .unwrap();
        assert_relative_eq!(a.efficiency, b.efficiency, max_relative = 1e-12);
        assert!(a.initial_speed > b.initial_speed);
    }

    #[test]
    fn test_same_seed_same_estimate() {
        let a = estimate(1_000, 7).unwrap();
        let b = estimate(1_000, 7).unwrap();
        assert_eq!(a.efficiency.to_bits(), b.efficiency.to_bits());
    }

    #[test]
    fn test_accelerated_request_falls_back_with_one_warning() {
        let estimator = EfficiencyEstimator::new(
            BeamPhysics::default(),
            SimulationParams::with_samples(1_000).accelerated(true),
        )
        .unwrap();
        let mut sink = CollectingSink::default();
        let result = estimator
            .run(&mut SimRng::new(3), &missing_prober(), &mut sink)
            .unwrap();

        assert_eq!(result.accelerator, Some(false));
        assert!((0.0..=1.0).contains(&result.efficiency));
        assert_eq!(sink.warnings().len(), 1);
        assert!(sink.warnings()[0].contains("GPU support is unavailable"));
    }

    #[test]
    fn test_accelerated_available_still_runs_on_cpu() {
        let estimator = EfficiencyEstimator::new(
            BeamPhysics::default(),
            SimulationParams::with_samples(1_000).accelerated(true),
        )
        .unwrap();
        let mut sink = CollectingSink::default();
        let with_gpu = estimator
            .run(&mut SimRng::new(3), &present_prober(), &mut sink)
            .unwrap();
        let cpu_only = estimate(1_000, 3).unwrap();

        assert_eq!(with_gpu.accelerator, Some(true));
        assert_eq!(with_gpu.efficiency.to_bits(), cpu_only.efficiency.to_bits());
        assert!(sink.warnings().is_empty());
    }

    #[test]
    fn test_no_probe_without_request() {
        let result = estimate(100, 1).unwrap();
        assert_eq!(result.accelerator, None);
    }

    /// Standard error is the sample std (n − 1) of the forward ratios over √k.
    #[test]
    fn test_std_error_matches_replayed_draws() {
        let result = estimate(500, 11).unwrap();

        let mut replay = SimRng::new(11);
        let ratios: Vec<f64> = (0..500)
            .map(|_| (1.0 - 2.0 * replay.gen_f64()).acos().cos())
            .filter(|r| *r > 0.0)
            .collect();
        let k = ratios.len() as f64;
        let mean = ratios.iter().sum::<f64>() / k;
        let variance = ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (k - 1.0);

        assert_eq!(result.forward_samples, ratios.len());
        assert_relative_eq!(result.efficiency, mean, max_relative = 1e-12);
        assert_relative_eq!(result.std_error, (variance / k).sqrt(), max_relative = 1e-9);
    }

    #[test]
    fn test_single_sample_branches() {
        let mut saw_forward = false;
        let mut saw_empty = false;

        for seed in 0..64 {
            let u = SimRng::new(seed).gen_f64();
            match estimate(1, seed) {
                Ok(result) => {
                    saw_forward = true;
                    assert!(1.0 - 2.0 * u > 0.0);
                    assert_eq!(result.forward_samples, 1);
                    assert_relative_eq!(result.efficiency, 1.0 - 2.0 * u, max_relative = 1e-9);
                    assert!(result.efficiency > 0.0 && result.efficiency <= 1.0);
                    assert_eq!(result.std_error, 0.0);
                }
                Err(McError::NoForwardSamples { samples }) => {
                    saw_empty = true;
                    assert_eq!(samples, 1);
                    assert!(1.0 - 2.0 * u <= 0.0);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert!(saw_forward, "no seed produced a forward sample");
        assert!(saw_empty, "no seed produced an empty forward hemisphere");
    }

    #[test]
    fn test_u_zero_boundary_gives_exactly_one() {
        // U = 0 → θ = 0 → vz = v0, the upper edge of the range.
        let v0 = BeamPhysics::default().initial_speed();
        let theta = (1.0_f64 - 2.0 * 0.0).acos();
        assert_eq!(v0 * theta.cos() / v0, 1.0);
    }

    #[test]
    fn test_simulate_entry_point() {
        let efficiency = simulate(2_000, false).unwrap();
        assert!((0.0..=1.0).contains(&efficiency));
        assert!(simulate(0, false).is_err());
    }
}
