//! Page orchestration.
//!
//! Renders the report pages in a fixed, deterministic order: per-device
//! summaries, the comparative box plot, per-hour grids, CDFs, peak-hour
//! histograms, QQ plots, scatter plots.  Pages whose input has no usable
//! values are skipped individually; everything else about the run carries on.

use crate::charts;
use crate::dataset::{Dataset, Device, Direction};
use crate::report::{PageKind, Report, ReportError};
use crate::stats::{hourly_stats, peak_hours, PeakHours, SummaryStats};
use anyhow::{Context, Result};
use log::*;
use std::path::Path;

/// Loads both datasets, renders every page, and writes the report.  Returns
/// the kinds of the pages that ended up in the document, in order.
pub fn generate_report(
    smart_tv_csv: &Path,
    chromecast_csv: &Path,
    output_pdf: &Path,
) -> Result<Vec<PageKind>> {
    let smart_tv = Dataset::from_csv_path(Device::SmartTv, smart_tv_csv)
        .with_context(|| format!("failed to load {}", smart_tv_csv.display()))?;
    let chromecast = Dataset::from_csv_path(Device::Chromecast, chromecast_csv)
        .with_context(|| format!("failed to load {}", chromecast_csv.display()))?;

    let mut report = Report::new("Traffic statistics report");
    render_report(&smart_tv, &chromecast, &mut report)?;

    let pages = report.pages().to_vec();
    info!("writing {} pages to {}", pages.len(), output_pdf.display());
    report
        .save(output_pdf)
        .with_context(|| format!("failed to write {}", output_pdf.display()))?;
    Ok(pages)
}

pub fn render_report(
    smart_tv: &Dataset,
    chromecast: &Dataset,
    report: &mut Report,
) -> Result<(), ReportError> {
    let devices = [smart_tv, chromecast];

    for ds in devices {
        summary(report, ds)?;
    }
    comparative_box(report, smart_tv, chromecast)?;
    for ds in devices {
        hourly_grid(report, ds)?;
    }
    for ds in devices {
        for direction in Direction::BOTH {
            cdf(report, ds, direction)?;
        }
    }
    for ds in devices {
        let peaks = peak_hours(&hourly_stats(ds));
        info!(
            "{}: peak hours: upload {:?}, download {:?}",
            ds.device, peaks.upload, peaks.download
        );
        for direction in Direction::BOTH {
            peak_histogram(report, ds, &peaks, direction)?;
        }
    }
    for direction in Direction::BOTH {
        qq(report, smart_tv, chromecast, direction)?;
    }
    for ds in devices {
        scatter(report, ds)?;
    }
    Ok(())
}

fn summary(report: &mut Report, ds: &Dataset) -> Result<(), ReportError> {
    let stats = SummaryStats::of(ds);
    let title = format!("Overall statistics - {}", ds.device);
    let image = charts::summary_page(&title, &stats)?;
    report.append_page(PageKind::Summary(ds.device), image);
    Ok(())
}

fn comparative_box(
    report: &mut Report,
    smart_tv: &Dataset,
    chromecast: &Dataset,
) -> Result<(), ReportError> {
    let mut series = Vec::with_capacity(4);
    for direction in Direction::BOTH {
        for ds in [smart_tv, chromecast] {
            let label = format!("{} {}", ds.device, direction);
            series.push((label, ds.logs(direction).collect()));
        }
    }
    let image = charts::box_plot_page("Comparative box plots", &series)?;
    report.append_page(PageKind::ComparativeBox, image);
    Ok(())
}

fn hourly_grid(report: &mut Report, ds: &Dataset) -> Result<(), ReportError> {
    let hours: Vec<(Vec<f64>, Vec<f64>)> = (0..24)
        .map(|hour| {
            (
                ds.hour_logs(hour, Direction::Upload).collect(),
                ds.hour_logs(hour, Direction::Download).collect(),
            )
        })
        .collect();
    let title = format!("Hourly distributions - {}", ds.device);
    let image = charts::hourly_grid_page(&title, &hours)?;
    report.append_page(PageKind::HourlyGrid(ds.device), image);
    Ok(())
}

/// The sorted defined values of one log column paired with their cumulative
/// probabilities, or `None` when the column has nothing to plot.
fn cdf_series(ds: &Dataset, direction: Direction) -> Option<Vec<(f64, f64)>> {
    let mut values: Vec<f64> = ds.logs(direction).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    Some(charts::ecdf_points(&values))
}

fn cdf(report: &mut Report, ds: &Dataset, direction: Direction) -> Result<(), ReportError> {
    let Some(points) = cdf_series(ds, direction) else {
        info!(
            "skipping {} CDF for {}: no defined values",
            direction, ds.device
        );
        return Ok(());
    };
    let title = format!("Empirical distribution ({}) - {}", direction, ds.device);
    let image = charts::ecdf_page(&title, &points)?;
    report.append_page(PageKind::Cdf(ds.device, direction), image);
    Ok(())
}

fn peak_histogram(
    report: &mut Report,
    ds: &Dataset,
    peaks: &PeakHours,
    direction: Direction,
) -> Result<(), ReportError> {
    let Some(hour) = peaks.get(direction) else {
        info!(
            "skipping {} peak histogram for {}: no peak hour",
            direction, ds.device
        );
        return Ok(());
    };
    let values: Vec<f64> = ds.hour_logs(hour, direction).collect();
    if values.is_empty() {
        info!(
            "skipping {} peak histogram for {}: no defined values at {:02}h",
            direction, ds.device, hour
        );
        return Ok(());
    }
    let title = format!("Peak-hour {} histogram ({:02}h) - {}", direction, hour, ds.device);
    let image = charts::histogram_page(&title, &values)?;
    report.append_page(PageKind::PeakHistogram(ds.device, direction), image);
    Ok(())
}

fn qq(
    report: &mut Report,
    smart_tv: &Dataset,
    chromecast: &Dataset,
    direction: Direction,
) -> Result<(), ReportError> {
    let mut xs: Vec<f64> = smart_tv.logs(direction).collect();
    let mut ys: Vec<f64> = chromecast.logs(direction).collect();
    if xs.is_empty() || ys.is_empty() {
        info!(
            "skipping {} QQ plot: a series has no defined values",
            direction
        );
        return Ok(());
    }
    xs.sort_by(f64::total_cmp);
    ys.sort_by(f64::total_cmp);
    let title = format!("Quantile-quantile ({})", direction);
    let x_label = format!("{} quantiles", smart_tv.device);
    let y_label = format!("{} quantiles", chromecast.device);
    let image = charts::qq_page(&title, &x_label, &y_label, &xs, &ys)?;
    report.append_page(PageKind::QuantileQuantile(direction), image);
    Ok(())
}

fn scatter(report: &mut Report, ds: &Dataset) -> Result<(), ReportError> {
    let pairs: Vec<(f64, f64)> = ds.log_pairs().collect();
    let title = format!("Upload vs download - {}", ds.device);
    let image = charts::scatter_page(&title, &pairs)?;
    report.append_page(PageKind::Scatter(ds.device), image);
    Ok(())
}
