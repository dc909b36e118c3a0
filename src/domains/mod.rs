//! Experiment engines.
//!
//! - Monte Carlo: beam-efficiency estimation by isotropic direction sampling
//! - Reinforce: policy-gradient training on an episodic control task
//! - BNN: MC-Dropout epistemic uncertainty
//! - Sampling: seeded latent-prior draws

pub mod bnn;
pub mod monte_carlo;
pub mod nn;
pub mod reinforce;
pub mod sampling;
pub mod stats;

pub use bnn::{predict_mc, uncertainty_band, BnnConfig, McDropoutNet, UncertaintyBand};
pub use monte_carlo::{
    simulate, BeamPhysics, EfficiencyEstimate, EfficiencyEstimator, SimulationParams,
    DEFAULT_SAMPLES, ELEMENTARY_CHARGE,
};
pub use nn::{Adam, AdamConfig, Dense};
pub use reinforce::{
    make_env, reinforce_with_baseline, CartPole, ControlEnv, EpisodeStats, PolicyNetwork,
    ReinforceConfig, ReinforceTrainer, StepOutcome, TrainingReport,
};
pub use sampling::{format_means, sample_from_config, sample_latent, LatentSamples, SamplingConfig};
pub use stats::RollingStats;
