//! # montecarlo-app
//!
//! Monte Carlo beam-efficiency estimation with an accelerated-backend probe,
//! plus a small suite of stochastic ML experiments:
//! - Isotropic direction sampling of a charged-particle beam
//! - REINFORCE with a learned baseline on cart-pole
//! - MC-Dropout epistemic uncertainty with a ±2σ band
//! - Seeded latent-prior sampling with reproducibility fingerprints
//!
//! ## Example
//!
//! ```rust
//! use montecarlo_app::prelude::*;
//!
//! let config = SuiteConfig::builder()
//!     .seed(42)
//!     .episodes(10)
//!     .build();
//! assert!(config.check().is_ok());
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops,  // Written as the formulas read
    clippy::imprecise_flops,
    clippy::too_many_lines,
    clippy::missing_const_for_fn,
    clippy::needless_range_loop,
)]

pub mod accel;
pub mod cli;
pub mod config;
pub mod domains;
pub mod engine;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod visualization;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::accel::{Capability, CapabilityProber, WarningSink};
    pub use crate::config::{SuiteConfig, SuiteConfigBuilder};
    pub use crate::domains::monte_carlo::{
        simulate, BeamPhysics, EfficiencyEstimate, EfficiencyEstimator, SimulationParams,
    };
    pub use crate::engine::rng::SimRng;
    pub use crate::error::{McError, McResult};
    pub use crate::orchestrator::{run_all, Orchestrator, SuiteReport};
    pub use crate::visualization::{PlotSurface, SummarySurface, SvgSurface};
}

/// Re-export for public API
pub use error::{McError, McResult};
