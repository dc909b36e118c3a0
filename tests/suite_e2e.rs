//! Experiment suite end-to-end tests.
//!
//! Runs the orchestrator on reduced configurations and checks what each
//! step hands back, including the SVG artifact.

use montecarlo_app::cli::{verify_sampling, Args, Command};
use montecarlo_app::domains::bnn::UncertaintyBand;
use montecarlo_app::domains::sampling::SamplingConfig;
use montecarlo_app::orchestrator::UNCERTAINTY_TITLE;
use montecarlo_app::prelude::*;

#[derive(Default)]
struct RecordingSurface {
    bands: Vec<(String, UncertaintyBand)>,
}

impl PlotSurface for RecordingSurface {
    fn draw_uncertainty(&mut self, band: &UncertaintyBand, title: &str) -> McResult<()> {
        self.bands.push((title.to_string(), band.clone()));
        Ok(())
    }
}

fn small_config(seed: u64) -> SuiteConfig {
    let mut config = SuiteConfig::builder().seed(seed).episodes(4).mc_samples(8).build();
    config.reinforce.max_steps = 60;
    config.bnn.grid_points = 25;
    config.sampling.n_samples = 100;
    config
}

#[test]
fn e2e_suite_runs_in_order_and_renders_once() {
    let orchestrator = Orchestrator::new(small_config(42)).unwrap();
    let mut surface = RecordingSurface::default();
    let mut out = Vec::new();
    let report = orchestrator.run(&mut surface, &mut out).unwrap();

    assert_eq!(report.training.env, "CartPole-v1");
    assert_eq!(report.training.episodes.len(), 4);
    assert_eq!(surface.bands.len(), 1);
    let (title, band) = &surface.bands[0];
    assert_eq!(title, UNCERTAINTY_TITLE);
    assert_eq!(band, &report.uncertainty);
    assert_eq!(report.latent.means().len(), 4);
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.starts_with("Sampled latent MC mean: ["), "{printed}");
}

#[test]
fn e2e_svg_artifact_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uncertainty.svg");
    let mut config = small_config(1);
    config.output.plot_path = Some(path.clone());

    let report = Orchestrator::new(config)
        .unwrap()
        .run_with_configured_surface()
        .unwrap();

    let svg = std::fs::read_to_string(&path).unwrap();
    assert!(svg.contains(UNCERTAINTY_TITLE));
    assert_eq!(report.uncertainty.len(), 25);
}

#[test]
fn e2e_yaml_config_drives_suite() {
    let yaml = r"
reproducibility:
  seed: 5
reinforce:
  episodes: 2
  max_steps: 30
bnn:
  mc_samples: 4
  grid_points: 10
sampling:
  latent_dim: 3
  n_samples: 50
";
    let config = SuiteConfig::from_yaml(yaml).unwrap();
    let report = Orchestrator::new(config)
        .unwrap()
        .run(&mut RecordingSurface::default(), &mut std::io::sink())
        .unwrap();
    assert_eq!(report.master_seed, 5);
    assert_eq!(report.latent.samples().dim(), (50, 3));
}

#[test]
fn e2e_verify_command_fingerprints_match() {
    let args = Args::parse_from(["montecarlo-app", "verify", "--runs", "4"]);
    let Command::Verify { runs } = args.command else {
        panic!("expected verify, got {:?}", args.command);
    };
    let summary = verify_sampling(&SamplingConfig::default(), runs).unwrap();
    assert!(summary.passed());
    assert_eq!(summary.run_hashes.len(), 4);
}
