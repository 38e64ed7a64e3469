//! Chart drawing.
//!
//! Every public function here renders one report page into an in-memory RGB
//! [`PageImage`] using the [`plotters`] bitmap backend.  The buffer for a page
//! lives only for the duration of the call that draws it; committing pages to
//! the output document is the report's job.  Pure data preparation (bin
//! counts, cumulative grids, quantile resampling) is kept separate from the
//! drawing code so it can be tested without a backend.

use crate::stats::SummaryStats;
use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

pub const PAGE_WIDTH: u32 = 1200;
pub const PAGE_HEIGHT: u32 = 800;

/// One fully rendered page, as a tightly packed RGB8 pixel buffer.
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("failed to prepare drawing area: {0}")]
    Area(String),
    #[error("failed to configure chart: {0}")]
    Config(String),
    #[error("failed to draw chart elements: {0}")]
    Draw(String),
}

type Result<T> = core::result::Result<T, ChartError>;

/// Renders one page: fills a fresh white canvas, hands it to `draw`, and
/// returns the finished pixels.
fn render<F>(draw: F) -> Result<PageImage>
where
    F: for<'a, 'b> FnOnce(&'b DrawingArea<BitMapBackend<'a>, Shift>) -> Result<()>,
{
    let mut rgb = vec![0u8; (PAGE_WIDTH * PAGE_HEIGHT * 3) as usize];
    {
        let area =
            BitMapBackend::with_buffer(&mut rgb, (PAGE_WIDTH, PAGE_HEIGHT)).into_drawing_area();
        area.fill(&WHITE)
            .map_err(|e| ChartError::Area(e.to_string()))?;
        draw(&area)?;
        area.present().map_err(|e| ChartError::Area(e.to_string()))?;
    }
    Ok(PageImage {
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT,
        rgb,
    })
}

fn format_stat(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.2}", value)
    }
}

/// A text-only page listing the six summary statistics, two decimal places.
/// NaN cells (a column with no defined values) render as "n/a".
pub fn summary_page(title: &str, stats: &SummaryStats) -> Result<PageImage> {
    let lines = [
        ("Mean upload", stats.mean_up),
        ("Mean download", stats.mean_down),
        ("Std dev upload", stats.std_dev_up),
        ("Std dev download", stats.std_dev_down),
        ("Variance upload", stats.var_up),
        ("Variance download", stats.var_down),
    ];
    render(|area| {
        area.draw(&Text::new(title.to_string(), (80, 60), ("sans-serif", 40)))
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        for (i, (label, value)) in lines.iter().enumerate() {
            let y = 170 + 70 * i as i32;
            let line = format!("{}: {}", label, format_stat(*value));
            area.draw(&Text::new(line, (110, y), ("sans-serif", 28)))
                .map_err(|e| ChartError::Draw(e.to_string()))?;
        }
        Ok(())
    })
}

/// Box-and-whisker series side by side on one page.  A series with no
/// defined values leaves its slot empty; the page itself always renders.
pub fn box_plot_page(title: &str, series: &[(String, Vec<f64>)]) -> Result<PageImage> {
    let labels: Vec<&str> = series.iter().map(|(label, _)| label.as_str()).collect();
    let (lo, hi) = padded_range(series.iter().flat_map(|(_, values)| values.iter().copied()));
    render(|area| {
        let mut chart = ChartBuilder::on(area)
            .caption(title, ("sans-serif", 36))
            .margin(20)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(labels[..].into_segmented(), lo as f32..hi as f32)
            .map_err(|e| ChartError::Config(e.to_string()))?;
        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc("log10 bytes")
            .axis_desc_style(("sans-serif", 20))
            .label_style(("sans-serif", 16))
            .draw()
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        for (label, (_, values)) in labels.iter().zip(series) {
            if values.is_empty() {
                continue;
            }
            let quartiles = Quartiles::new(values);
            chart
                .draw_series(std::iter::once(
                    Boxplot::new_vertical(SegmentValue::CenterOf(label), &quartiles).width(40),
                ))
                .map_err(|e| ChartError::Draw(e.to_string()))?;
        }
        Ok(())
    })
}

/// A 6x4 grid of per-hour box plots, hours 00..23 in order.  An hour with no
/// defined values keeps its captioned slot in the grid, just with no boxes.
pub fn hourly_grid_page(title: &str, hours: &[(Vec<f64>, Vec<f64>)]) -> Result<PageImage> {
    let pair = ["up", "down"];
    debug_assert_eq!(hours.len(), 24);
    let (lo, hi) = padded_range(
        hours
            .iter()
            .flat_map(|(up, down)| up.iter().chain(down.iter()).copied()),
    );
    render(|area| {
        let area = area
            .titled(title, ("sans-serif", 30))
            .map_err(|e| ChartError::Area(e.to_string()))?;
        let cells = area.split_evenly((6, 4));
        for (hour, cell) in cells.iter().enumerate() {
            let (up, down) = &hours[hour];
            let mut chart = ChartBuilder::on(cell)
                .caption(format!("{:02}h", hour), ("sans-serif", 14))
                .margin(4)
                .x_label_area_size(16)
                .y_label_area_size(30)
                .build_cartesian_2d(pair[..].into_segmented(), lo as f32..hi as f32)
                .map_err(|e| ChartError::Config(e.to_string()))?;
            chart
                .configure_mesh()
                .disable_mesh()
                .y_labels(3)
                .label_style(("sans-serif", 10))
                .draw()
                .map_err(|e| ChartError::Draw(e.to_string()))?;
            for (label, values) in pair.iter().zip([up, down]) {
                if values.is_empty() {
                    continue;
                }
                let quartiles = Quartiles::new(values);
                chart
                    .draw_series(std::iter::once(
                        Boxplot::new_vertical(SegmentValue::CenterOf(label), &quartiles).width(18),
                    ))
                    .map_err(|e| ChartError::Draw(e.to_string()))?;
            }
        }
        Ok(())
    })
}

/// Empirical CDF: the sorted sample against a uniform probability grid.
pub fn ecdf_page(title: &str, points: &[(f64, f64)]) -> Result<PageImage> {
    let (lo, hi) = padded_range(points.iter().map(|&(x, _)| x));
    render(|area| {
        let mut chart = ChartBuilder::on(area)
            .caption(title, ("sans-serif", 36))
            .margin(20)
            .x_label_area_size(55)
            .y_label_area_size(70)
            .build_cartesian_2d(lo..hi, -0.02..1.02)
            .map_err(|e| ChartError::Config(e.to_string()))?;
        chart
            .configure_mesh()
            .x_desc("log10 bytes")
            .y_desc("Cumulative probability")
            .axis_desc_style(("sans-serif", 20))
            .label_style(("sans-serif", 16))
            .draw()
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, p)| Circle::new((x, p), 2, BLUE.filled())),
            )
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        Ok(())
    })
}

/// Histogram of `values` with the bin count given by `sturges_bins`.
pub fn histogram_page(title: &str, values: &[f64]) -> Result<PageImage> {
    let bins = histogram_bins(values, sturges_bins(values.len()));
    let x_lo = bins.first().map_or(0.0, |b| b.lo);
    let x_hi = bins.last().map_or(1.0, |b| b.hi);
    let y_hi = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64 * 1.05;
    render(|area| {
        let mut chart = ChartBuilder::on(area)
            .caption(title, ("sans-serif", 36))
            .margin(20)
            .x_label_area_size(55)
            .y_label_area_size(70)
            .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi.max(1.0))
            .map_err(|e| ChartError::Config(e.to_string()))?;
        chart
            .configure_mesh()
            .x_desc("log10 bytes")
            .y_desc("Frequency")
            .axis_desc_style(("sans-serif", 20))
            .label_style(("sans-serif", 16))
            .draw()
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        chart
            .draw_series(bins.iter().map(|b| {
                Rectangle::new([(b.lo, 0.0), (b.hi, b.count as f64)], BLUE.mix(0.7).filled())
            }))
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        Ok(())
    })
}

/// Quantile-quantile comparison of two sorted samples.  The second sample is
/// resampled onto the first one's probability grid; the identity line runs
/// corner to corner over the raw (unpadded) value range.
pub fn qq_page(
    title: &str,
    x_label: &str,
    y_label: &str,
    xs_sorted: &[f64],
    ys_sorted: &[f64],
) -> Result<PageImage> {
    let ys = resample_quantiles(ys_sorted, xs_sorted.len());
    let min = xs_sorted
        .iter()
        .chain(ys.iter())
        .copied()
        .fold(f64::INFINITY, f64::min);
    let max = xs_sorted
        .iter()
        .chain(ys.iter())
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi) = padded_range([min, max].into_iter().filter(|x| x.is_finite()));
    render(|area| {
        let mut chart = ChartBuilder::on(area)
            .caption(title, ("sans-serif", 36))
            .margin(20)
            .x_label_area_size(55)
            .y_label_area_size(70)
            .build_cartesian_2d(lo..hi, lo..hi)
            .map_err(|e| ChartError::Config(e.to_string()))?;
        chart
            .configure_mesh()
            .x_desc(x_label)
            .y_desc(y_label)
            .axis_desc_style(("sans-serif", 20))
            .label_style(("sans-serif", 16))
            .draw()
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        chart
            .draw_series(LineSeries::new([(min, min), (max, max)], &RED))
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        chart
            .draw_series(
                xs_sorted
                    .iter()
                    .zip(&ys)
                    .map(|(&x, &y)| Circle::new((x, y), 3, BLUE.mix(0.8).filled())),
            )
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        Ok(())
    })
}

/// Per-record scatter of log upload against log download.
pub fn scatter_page(title: &str, pairs: &[(f64, f64)]) -> Result<PageImage> {
    let (x_lo, x_hi) = padded_range(pairs.iter().map(|&(x, _)| x));
    let (y_lo, y_hi) = padded_range(pairs.iter().map(|&(_, y)| y));
    render(|area| {
        let mut chart = ChartBuilder::on(area)
            .caption(title, ("sans-serif", 36))
            .margin(20)
            .x_label_area_size(55)
            .y_label_area_size(70)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
            .map_err(|e| ChartError::Config(e.to_string()))?;
        chart
            .configure_mesh()
            .x_desc("log10 bytes uploaded")
            .y_desc("log10 bytes downloaded")
            .axis_desc_style(("sans-serif", 20))
            .label_style(("sans-serif", 16))
            .draw()
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        chart
            .draw_series(
                pairs
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 2, BLUE.mix(0.4).filled())),
            )
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        Ok(())
    })
}

/// Sturges' rule: ceil(log2(n) + 1) bins for a sample of size n.
pub fn sturges_bins(n: usize) -> usize {
    ((n as f64).log2() + 1.0).ceil().max(1.0) as usize
}

/// Pairs each sorted value with its cumulative probability on the inclusive
/// uniform grid over [0, 1].  A singleton sits at probability 0.
pub fn ecdf_points(sorted: &[f64]) -> Vec<(f64, f64)> {
    let n = sorted.len();
    sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| {
            let p = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            (x, p)
        })
        .collect()
}

/// Resamples a sorted series onto a uniform probability grid of length `n`,
/// interpolating linearly between adjacent order statistics.
pub fn resample_quantiles(sorted: &[f64], n: usize) -> Vec<f64> {
    assert!(!sorted.is_empty());
    let m = sorted.len();
    (0..n)
        .map(|i| {
            let q = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            let pos = q * (m - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Equal-width bins over [min, max].  A zero-width sample (all values equal)
/// is widened to a unit interval around the value.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut span = max - min;
    if span <= 0.0 {
        min -= 0.5;
        span = 1.0;
    }
    let width = span / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lo: min + width * i as f64,
            hi: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}

/// An axis range covering `values` with a little headroom.  Falls back to
/// (0, 1) when there is nothing to cover.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let margin = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
    (lo - margin, hi + margin)
}
