//! Core engine support.
//!
//! Deterministic RNG (PCG with partitioned streams) shared by every
//! experiment.

pub mod rng;

pub use rng::SimRng;
