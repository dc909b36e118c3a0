//! Fixed-order experiment suite.
//!
//! Runs policy-gradient training, MC-Dropout inference (rendered to a
//! [`PlotSurface`]) and latent-prior sampling, whose per-dimension means are
//! written to the run's output stream. Steps share no data; the first
//! failure aborts the run.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{OutputConfig, SuiteConfig};
use crate::domains::bnn::{uncertainty_band, UncertaintyBand};
use crate::domains::reinforce::{reinforce_with_baseline, TrainingReport};
use crate::domains::sampling::{format_means, sample_from_config, LatentSamples};
use crate::engine::rng::SimRng;
use crate::error::{McError, McResult};
use crate::visualization::{PlotSurface, SummarySurface, SvgSurface};

/// Title of the uncertainty plot.
pub const UNCERTAINTY_TITLE: &str = "BNN MC-Dropout Uncertainty";

/// Records produced by one suite run, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Master seed of the training and inference streams.
    pub master_seed: u64,
    /// Policy-gradient training outcome.
    pub training: TrainingReport,
    /// MC-Dropout predictive band.
    pub uncertainty: UncertaintyBand,
    /// Latent-prior draws.
    pub latent: LatentSamples,
}

impl SuiteReport {
    /// BLAKE3 digest of the latent samples, stable for a fixed sampler seed.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn fingerprint(&self) -> McResult<String> {
        self.latent.fingerprint()
    }

    /// Write the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be created or flushed and
    /// `Serialization` if encoding fails.
    pub fn write_json(&self, path: &Path) -> McResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| McError::serialization(format!("JSON serialization failed: {e}")))?;
        writer.flush()?;
        Ok(())
    }
}

/// Drives the experiment suite.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: SuiteConfig,
}

impl Orchestrator {
    /// Create an orchestrator for a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `config` is invalid.
    pub fn new(config: SuiteConfig) -> McResult<Self> {
        config.check()?;
        Ok(Self { config })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Run every experiment, rendering the band on `surface` and writing the
    /// latent means line to `out`.
    ///
    /// # Errors
    ///
    /// Propagates the first failing step; `Io` if `out` cannot be written.
    pub fn run(&self, surface: &mut dyn PlotSurface, out: &mut dyn Write) -> McResult<SuiteReport> {
        let mut master = SimRng::from_optional_seed(self.config.reproducibility.seed);
        let master_seed = master.master_seed();
        let [mut rl_rng, mut bnn_rng]: [SimRng; 2] = master
            .partition(2)
            .try_into()
            .map_err(|_| McError::invalid_input("failed to partition the master rng"))?;

        tracing::info!(
            seed = master_seed,
            episodes = self.config.reinforce.episodes,
            env = %self.config.reinforce.env,
            "starting policy-gradient training"
        );
        let (_policy, training) = reinforce_with_baseline(&self.config.reinforce, &mut rl_rng)?;

        tracing::info!(
            passes = self.config.bnn.mc_samples,
            points = self.config.bnn.grid_points,
            "running mc-dropout inference"
        );
        let uncertainty = uncertainty_band(&self.config.bnn, &mut bnn_rng)?;
        surface.draw_uncertainty(&uncertainty, UNCERTAINTY_TITLE)?;

        let latent = sample_from_config(&self.config.sampling)?;
        tracing::info!(
            seed = latent.seed(),
            samples = self.config.sampling.n_samples,
            "latent sampling complete"
        );
        writeln!(out, "Sampled latent MC mean: {}", format_means(latent.means()))?;

        Ok(SuiteReport {
            master_seed,
            training,
            uncertainty,
            latent,
        })
    }

    /// Run on the surface chosen by the output section, printing to stdout.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::run`].
    pub fn run_with_configured_surface(&self) -> McResult<SuiteReport> {
        let mut surface = surface_for(&self.config.output);
        self.run(surface.as_mut(), &mut io::stdout())
    }
}

/// SVG when a plot path is configured, text summary otherwise.
#[must_use]
pub fn surface_for(output: &OutputConfig) -> Box<dyn PlotSurface> {
    match &output.plot_path {
        Some(path) => Box::new(SvgSurface::new(path, output.width, output.height)),
        None => Box::new(SummarySurface::stdout()),
    }
}

/// Run the whole suite with default settings.
///
/// # Errors
///
/// Propagates the first failing step.
pub fn run_all() -> McResult<SuiteReport> {
    Orchestrator::new(SuiteConfig::default())?.run_with_configured_surface()
}
