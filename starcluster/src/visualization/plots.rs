//! PNG line charts for the CLI commands
//!
//! A [`LinePlot`] is a description (title, axis labels, log axes, series);
//! [`render`] and [`render_grid`] turn one or several of them into a PNG with
//! the `plotters` bitmap backend. Points that cannot be shown (non-finite,
//! or non-positive on a log axis) are dropped from their series.

use std::path::Path;

use plotters::coord::ranged1d::{AsRangedCoord, ValueFormatter};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::error::{Error, Result};

/// Size of a single chart in pixels
pub const PLOT_SIZE: (u32, u32) = (1200, 800);

/// Size of one panel of a grid
pub const PANEL_SIZE: (u32, u32) = (800, 600);

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub scatter: bool, // dots only, no connecting line
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            label: label.into(),
            points,
            scatter: false,
        }
    }

    pub fn scatter(label: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            scatter: true,
            ..Self::new(label, points)
        }
    }

    /// Pair up `xs` and `ys`, extra values of the longer one are ignored
    pub fn from_xy(label: impl Into<String>, xs: &[f64], ys: &[f64]) -> Self {
        Self::new(label, xs.iter().copied().zip(ys.iter().copied()).collect())
    }

    /// Histogram as a step line over `edges` (one more edge than heights)
    pub fn histogram(label: impl Into<String>, edges: &[f64], heights: &[f64]) -> Self {
        let mut points = Vec::with_capacity(2 * heights.len());
        for (k, h) in heights.iter().enumerate() {
            if k + 1 >= edges.len() {
                break;
            }
            points.push((edges[k], *h));
            points.push((edges[k + 1], *h));
        }
        Self::new(label, points)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinePlot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub log_x: bool,
    pub log_y: bool,
    pub markers: bool, // draw a dot at every point
    pub series: Vec<Series>,
}

impl LinePlot {
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            ..Default::default()
        }
    }

    pub fn log_x(mut self, on: bool) -> Self {
        self.log_x = on;
        self
    }

    pub fn log_y(mut self, on: bool) -> Self {
        self.log_y = on;
        self
    }

    pub fn markers(mut self, on: bool) -> Self {
        self.markers = on;
        self
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.series.push(series);
        self
    }

    fn shows(&self, p: &(f64, f64)) -> bool {
        p.0.is_finite()
            && p.1.is_finite()
            && (!self.log_x || p.0 > 0.0)
            && (!self.log_y || p.1 > 0.0)
    }

    fn visible(&self, series: &Series) -> Vec<(f64, f64)> {
        series.points.iter().copied().filter(|p| self.shows(p)).collect()
    }

    /// Axis ranges covering every visible point
    fn ranges(&self) -> Result<((f64, f64), (f64, f64))> {
        let points: Vec<(f64, f64)> = self.series.iter().flat_map(|s| self.visible(s)).collect();
        if points.is_empty() {
            return Err(Error::Validation(format!(
                "plot '{}' has no points to draw",
                self.title
            )));
        }
        let x = span(points.iter().map(|p| p.0), self.log_x);
        let y = span(points.iter().map(|p| p.1), self.log_y);
        Ok((x, y))
    }
}

/// Min/max with some headroom; never an empty interval
fn span(values: impl Iterator<Item = f64>, log: bool) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if log {
        if lo == hi {
            (lo / 10.0, hi * 10.0)
        } else {
            (lo / 1.2, hi * 1.2)
        }
    } else if lo == hi {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.1 };
        (lo - pad, hi + pad)
    } else {
        let pad = 0.05 * (hi - lo);
        (lo - pad, hi + pad)
    }
}

/// Legend label for a run stored as
/// `.../snap_mu{..}_s{..}_sigma{..}_r{..}_N{..}_{postfix}/out.nemo`
///
/// Falls back to the whole directory name when there is no postfix.
pub fn file_label(path: &Path) -> String {
    let dir = path
        .parent()
        .and_then(Path::file_name)
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default();
    let postfix = dir.split('_').skip(6).collect::<Vec<_>>().join("_");
    if postfix.is_empty() {
        dir
    } else {
        postfix
    }
}

fn plot_err(e: impl std::fmt::Display) -> Error {
    Error::Plot(e.to_string())
}

/// One chart in one PNG
pub fn render(plot: &LinePlot, path: &Path) -> Result<()> {
    render_grid(std::slice::from_ref(plot), path)
}

/// Several charts in a near-square grid in one PNG
pub fn render_grid(plots: &[LinePlot], path: &Path) -> Result<()> {
    if plots.is_empty() {
        return Err(Error::Validation("nothing to plot".into()));
    }
    // Fail before touching the output file
    let ranges = plots.iter().map(LinePlot::ranges).collect::<Result<Vec<_>>>()?;

    let n = plots.len();
    let cols = (n as f64).sqrt().ceil() as usize;
    let rows = n.div_ceil(cols);
    let size = if n == 1 {
        PLOT_SIZE
    } else {
        (PANEL_SIZE.0 * cols as u32, PANEL_SIZE.1 * rows as u32)
    };

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let panels = root.split_evenly((rows, cols));
    for ((plot, range), area) in plots.iter().zip(ranges).zip(panels.iter()) {
        draw_panel(area, plot, range)?;
    }

    root.present().map_err(plot_err)?;
    info!("saved {}", path.display());
    Ok(())
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    plot: &LinePlot,
    ((x0, x1), (y0, y1)): ((f64, f64), (f64, f64)),
) -> Result<()> {
    match (plot.log_x, plot.log_y) {
        (false, false) => draw_on(area, plot, x0..x1, y0..y1),
        (true, false) => draw_on(area, plot, (x0..x1).log_scale(), y0..y1),
        (false, true) => draw_on(area, plot, x0..x1, (y0..y1).log_scale()),
        (true, true) => draw_on(area, plot, (x0..x1).log_scale(), (y0..y1).log_scale()),
    }
}

fn draw_on<X, Y>(
    area: &DrawingArea<BitMapBackend, Shift>,
    plot: &LinePlot,
    x: X,
    y: Y,
) -> Result<()>
where
    X: AsRangedCoord<Value = f64>,
    Y: AsRangedCoord<Value = f64>,
    X::CoordDescType: ValueFormatter<f64>,
    Y::CoordDescType: ValueFormatter<f64>,
{
    let mut chart = ChartBuilder::on(area)
        .caption(&plot.title, ("sans-serif", 28))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(x, y)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(plot.x_label.as_str())
        .y_desc(plot.y_label.as_str())
        .label_style(("sans-serif", 16))
        .draw()
        .map_err(plot_err)?;

    for (i, series) in plot.series.iter().enumerate() {
        let color = Palette99::pick(i).mix(0.9);
        let points = plot.visible(series);

        if series.scatter {
            chart
                .draw_series(points.iter().map(|p| Circle::new(*p, 3, color.filled())))
                .map_err(plot_err)?
                .label(series.label.clone())
                .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));
            continue;
        }

        chart
            .draw_series(LineSeries::new(points.clone(), &color))
            .map_err(plot_err)?
            .label(series.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

        if plot.markers {
            chart
                .draw_series(points.iter().map(|p| Circle::new(*p, 3, color.filled())))
                .map_err(plot_err)?;
        }
    }

    if plot.series.iter().any(|s| !s.label.is_empty()) {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_err)?;
    }
    Ok(())
}
