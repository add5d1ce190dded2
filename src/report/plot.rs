//! Line plots of training curves, rendered to PNG with plotters.

use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;

use crate::error::{Result, SoftmaxError};

const PLOT_SIZE: (u32, u32) = (1024, 768);

/// A named curve, optionally with a shaded band of (x, low, high) around it
#[derive(Debug, Clone, Default)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub band: Vec<(f64, f64, f64)>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: &[(usize, f64)]) -> Series {
        Series {
            label: label.into(),
            points: points.iter().map(|&(x, y)| (x as f64, y)).collect(),
            band: Vec::new(),
        }
    }

    /// Mean over consecutive windows of `window` points, with a one standard deviation band
    pub fn averaged(label: impl Into<String>, points: &[(usize, f64)], window: usize) -> Series {
        if window <= 1 {
            return Series::new(label, points);
        }

        let label: String = label.into();
        let mut series = Series {
            label: format!("{} (mean over {} steps)", label, window),
            ..Series::default()
        };
        for stats in average_windows(points, window) {
            series.points.push((stats.step as f64, stats.mean));
            series
                .band
                .push((stats.step as f64, stats.mean - stats.std, stats.mean + stats.std));
        }

        series
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    /// Step at the middle of the window
    pub step: usize,
    pub mean: f64,
    pub std: f64,
}

/// Split `points` into full windows of `window` points; a trailing partial window is dropped
pub fn average_windows(points: &[(usize, f64)], window: usize) -> Vec<WindowStats> {
    if window == 0 {
        return Vec::new();
    }

    points
        .chunks_exact(window)
        .map(|chunk| {
            let n = chunk.len() as f64;
            let mean = chunk.iter().map(|&(_, y)| y).sum::<f64>() / n;
            let variance = chunk.iter().map(|&(_, y)| (y - mean).powi(2)).sum::<f64>() / n;

            WindowStats {
                step: chunk[window / 2].0,
                mean,
                std: variance.sqrt(),
            }
        })
        .collect()
}

fn plot_error<E: Display>(err: E) -> SoftmaxError {
    SoftmaxError::Plot(err.to_string())
}

/// (min, max) over all finite values, widened when degenerate and padded by 5%
fn axis_range(values: impl Iterator<Item = f64>, pad: bool) -> (f64, f64) {
    let (mut min, mut max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if min > max {
        return (0f64, 1f64);
    }
    if max - min < f64::EPSILON {
        min -= 0.5;
        max += 0.5;
    }
    if pad {
        let margin = (max - min) * 0.05;
        min -= margin;
        max += margin;
    }

    (min, max)
}

/// Draw every series into one chart and write it to `path`
pub fn line_plot(
    path: &Path,
    caption: &str,
    x_desc: &str,
    y_desc: &str,
    series: &[Series],
) -> Result<()> {
    let (x_min, x_max) = axis_range(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)), false);
    let (y_min, y_max) = axis_range(
        series.iter().flat_map(|s| {
            s.points
                .iter()
                .map(|p| p.1)
                .chain(s.band.iter().flat_map(|b| [b.1, b.2]))
        }),
        true,
    );

    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()
        .map_err(plot_error)?;

    for (idx, s) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();

        if !s.band.is_empty() {
            let outline: Vec<(f64, f64)> = s
                .band
                .iter()
                .map(|&(x, _, high)| (x, high))
                .chain(s.band.iter().rev().map(|&(x, low, _)| (x, low)))
                .collect();
            chart
                .draw_series(std::iter::once(Polygon::new(outline, color.mix(0.2).filled())))
                .map_err(plot_error)?;
        }

        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))
            .map_err(plot_error)?
            .label(s.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;

    Ok(())
}
