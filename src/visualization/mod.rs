//! Rendering of the MC-Dropout uncertainty band.
//!
//! Provides two surfaces:
//! - SVG: mean line over a shaded ±2σ band, drawn with `plotters`
//! - Summary: a short text report for headless runs
//!
//! # Example
//!
//! ```rust
//! use montecarlo_app::domains::UncertaintyBand;
//! use montecarlo_app::visualization::{PlotSurface, SummarySurface};
//!
//! let band = UncertaintyBand { x: vec![0.0, 1.0], mean: vec![0.1, 0.2], std: vec![0.01, 0.02] };
//! let mut surface = SummarySurface::new(Vec::new());
//! surface.draw_uncertainty(&band, "demo").unwrap();
//! ```

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::domains::bnn::UncertaintyBand;
use crate::error::{McError, McResult};

/// Fill opacity of the ±2σ band.
pub const BAND_ALPHA: f64 = 0.3;

/// Something that can display an uncertainty band.
pub trait PlotSurface {
    /// Render `band` under `title`.
    ///
    /// # Errors
    ///
    /// Returns `Render` if drawing fails.
    fn draw_uncertainty(&mut self, band: &UncertaintyBand, title: &str) -> McResult<()>;
}

// ============================================================================
// SVG
// ============================================================================

/// Writes an SVG chart to a file.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    path: PathBuf,
    size: (u32, u32),
}

impl SvgSurface {
    /// Surface writing to `path` at `width × height` pixels.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            size: (width, height),
        }
    }

    /// Output path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlotSurface for SvgSurface {
    fn draw_uncertainty(&mut self, band: &UncertaintyBand, title: &str) -> McResult<()> {
        let (y_min, y_max) = band
            .envelope()
            .ok_or_else(|| McError::render("cannot plot an empty uncertainty band"))?;
        if band.x.len() != band.mean.len() || band.x.len() != band.std.len() {
            return Err(McError::render(format!(
                "uncertainty band columns disagree: {} x, {} mean, {} std",
                band.x.len(),
                band.mean.len(),
                band.std.len()
            )));
        }
        let x_min = *band.x.first().ok_or_else(|| McError::render("uncertainty band has no grid"))?;
        let x_max = *band.x.last().ok_or_else(|| McError::render("uncertainty band has no grid"))?;
        if ![x_min, x_max, y_min, y_max].iter().all(|v| v.is_finite()) {
            return Err(McError::render("uncertainty band has non-finite bounds"));
        }

        render_band(&self.path, self.size, band, title, (x_min, x_max), padded(y_min, y_max))
            .map_err(|e| McError::render(format!("{}: {e}", self.path.display())))?;

        tracing::info!(path = %self.path.display(), points = band.len(), "wrote uncertainty plot");
        Ok(())
    }
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    let pad = ((hi - lo) * 0.05).max(1e-6);
    (lo - pad, hi + pad)
}

fn render_band(
    path: &Path,
    size: (u32, u32),
    band: &UncertaintyBand,
    title: &str,
    (x_min, x_max): (f64, f64),
    (y_min, y_max): (f64, f64),
) -> Result<(), Box<dyn Error>> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart.configure_mesh().x_desc("x").y_desc("prediction").draw()?;

    // Upper edge left to right, lower edge right to left.
    let outline: Vec<(f64, f64)> = band
        .x
        .iter()
        .copied()
        .zip(band.upper())
        .chain(band.x.iter().copied().zip(band.lower()).rev())
        .collect();
    chart
        .draw_series(std::iter::once(Polygon::new(outline, BLUE.mix(BAND_ALPHA).filled())))?
        .label("±2σ")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(BAND_ALPHA).filled()));

    chart
        .draw_series(LineSeries::new(
            band.x.iter().copied().zip(band.mean.iter().copied()),
            &BLUE,
        ))?
        .label("mean")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

// ============================================================================
// Text summary
// ============================================================================

/// Prints grid size, mean range and peak σ.
#[derive(Debug)]
pub struct SummarySurface<W: Write> {
    out: W,
}

impl SummarySurface<io::Stdout> {
    /// Summary on standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> SummarySurface<W> {
    /// Summary written to `out`.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> PlotSurface for SummarySurface<W> {
    fn draw_uncertainty(&mut self, band: &UncertaintyBand, title: &str) -> McResult<()> {
        let (lo, hi) = band
            .mean_range()
            .ok_or_else(|| McError::render("cannot summarize an empty uncertainty band"))?;
        writeln!(self.out, "{title}")
            .and_then(|()| writeln!(self.out, "  grid points: {}", band.len()))
            .and_then(|()| writeln!(self.out, "  mean range:  [{lo:.4}, {hi:.4}]"))
            .and_then(|()| writeln!(self.out, "  max std:     {:.4}", band.max_std()))
            .map_err(|e| McError::render(e.to_string()))
    }
}
