use crate::error::ReportError;
use crate::monitoring::report::sorted_by_rate;
use crate::shared_data::{Metric, RunResult};
use plotters::prelude::*;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

fn plot_err<E: Display>(e: E) -> ReportError {
    ReportError::Plot(e.to_string())
}

/// Y-axis bounds covering every run's series for `metric`, padded by 5%.
/// Flat or empty data still produces a non-degenerate range.
pub fn value_range(results: &[RunResult], metric: Metric) -> (f64, f64) {
    let (min, max) = results
        .iter()
        .flat_map(|r| r.metrics.series(metric).values().iter().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    if span <= f64::EPSILON {
        return (min - 1.0, max + 1.0);
    }
    let pad = span * 0.05;
    (min - pad, max + pad)
}

/// Draws `metric` over time, one line per penetration rate.
pub fn plot_metric(path: &Path, metric: Metric, results: &[RunResult]) -> Result<(), ReportError> {
    let steps = results
        .iter()
        .map(|r| r.metrics.steps())
        .max()
        .unwrap_or(0)
        .max(1);
    let (y_min, y_max) = value_range(results, metric);

    let root = BitMapBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!(
                "{} Over Time for Different AV Penetration Rates",
                metric.title()
            ),
            ("sans-serif", 20),
        )
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0usize..steps, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Time Step")
        .y_desc(metric.unit_label())
        .draw()
        .map_err(plot_err)?;

    for (idx, result) in sorted_by_rate(results).into_iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points = result
            .metrics
            .series(metric)
            .values()
            .iter()
            .enumerate()
            .map(|(step, &value)| (step, value));
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))
            .map_err(plot_err)?
            .label(format!("AV Rate {}", result.rate_label()))
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Writes `<metric>.png` for every tracked metric into `output_dir`.
pub fn plot_all(output_dir: &Path, results: &[RunResult]) -> Result<Vec<PathBuf>, ReportError> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();
    for metric in Metric::ALL {
        let path = output_dir.join(format!("{}.png", metric.key()));
        plot_metric(&path, metric, results)?;
        log::info!("{} plot saved to {}", metric.title(), path.display());
        written.push(path);
    }
    Ok(written)
}
