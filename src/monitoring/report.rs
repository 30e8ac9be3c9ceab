use crate::error::ReportError;
use crate::shared_data::{Metric, MetricSummary, RunResult};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Statistics of one metric for one penetration rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub rate: f64,
    pub rate_label: String,
    pub summary: Option<MetricSummary>,
}

/// One metric's statistics across all rates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricTable {
    pub metric: Metric,
    pub rows: Vec<SummaryRow>,
}

/// Runs ordered by ascending penetration rate.
pub fn sorted_by_rate(results: &[RunResult]) -> Vec<&RunResult> {
    let mut sorted: Vec<&RunResult> = results.iter().collect();
    sorted.sort_by(|a, b| a.penetration_rate.total_cmp(&b.penetration_rate));
    sorted
}

pub fn summarize(results: &[RunResult]) -> Vec<MetricTable> {
    let sorted = sorted_by_rate(results);
    Metric::ALL
        .iter()
        .map(|&metric| MetricTable {
            metric,
            rows: sorted
                .iter()
                .map(|r| SummaryRow {
                    rate: r.penetration_rate,
                    rate_label: r.rate_label(),
                    summary: r.metrics.series(metric).summary(),
                })
                .collect(),
        })
        .collect()
}

fn fmt2(value: f64) -> String {
    format!("{:.2}", value)
}

fn section_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new().flexible(true).from_writer(writer)
}

/// Writes the sectioned CSV report: metric statistics, signal adaptations and
/// emergency braking, one row per rate in each section. Sections are
/// separated by empty lines.
pub fn write_report<W: Write>(mut writer: W, results: &[RunResult]) -> Result<(), ReportError> {
    {
        let mut wtr = section_writer(&mut writer);
        wtr.write_record(["Metric Statistics by AV Penetration Rate"])?;
        wtr.flush()?;
    }
    writer.write_all(b"\n")?;

    for table in summarize(results) {
        {
            let mut wtr = section_writer(&mut writer);
            wtr.write_record([table.metric.title()])?;
            wtr.write_record(["AV Rate", "Average", "Maximum", "Minimum", "Final Value"])?;
            for row in &table.rows {
                match row.summary {
                    Some(s) => wtr.write_record([
                        row.rate_label.clone(),
                        fmt2(s.average),
                        fmt2(s.maximum),
                        fmt2(s.minimum),
                        fmt2(s.final_value),
                    ])?,
                    None => {
                        wtr.write_record([row.rate_label.as_str(), "n/a", "n/a", "n/a", "n/a"])?
                    }
                }
            }
            wtr.flush()?;
        }
        writer.write_all(b"\n")?;
    }

    let sorted = sorted_by_rate(results);
    {
        let mut wtr = section_writer(&mut writer);
        wtr.write_record(["Traffic Light Adaptations"])?;
        wtr.write_record(["AV Rate", "Total Adaptations"])?;
        for r in &sorted {
            wtr.write_record([r.rate_label(), r.adaptation_count.to_string()])?;
        }
        wtr.flush()?;
    }
    writer.write_all(b"\n")?;

    let mut wtr = section_writer(&mut writer);
    wtr.write_record(["Emergency Braking Events"])?;
    wtr.write_record(["AV Rate", "Total", "Autonomous", "Human"])?;
    for r in &sorted {
        let braking = r.emergency_braking;
        wtr.write_record([
            r.rate_label(),
            braking.total().to_string(),
            braking.autonomous().to_string(),
            braking.human().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Local-time stamp used in output file names.
pub fn report_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Saves `simulation_metrics_<stamp>.csv` under `output_dir`.
pub fn save_report(
    output_dir: &Path,
    results: &[RunResult],
    stamp: &str,
) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("simulation_metrics_{}.csv", stamp));
    write_report(File::create(&path)?, results)?;
    log::info!("Metrics report saved to {}", path.display());
    Ok(path)
}

/// Saves every run's raw series as `simulation_metrics_<stamp>.json`.
pub fn save_raw_metrics(
    output_dir: &Path,
    results: &[RunResult],
    stamp: &str,
) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("simulation_metrics_{}.json", stamp));
    serde_json::to_writer_pretty(File::create(&path)?, &results)?;
    log::info!("Raw metrics saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_data::{EmergencyBrakingCounts, MetricSeries, RunMetrics, VehicleClass};
    use std::collections::BTreeSet;

    fn result(rate: f64, speeds: Vec<f64>) -> RunResult {
        let steps = speeds.len();
        let mut metrics = RunMetrics::new();
        metrics.mean_speed = MetricSeries::from(speeds);
        for series in [
            &mut metrics.number_of_stops,
            &mut metrics.fuel_consumption,
            &mut metrics.average_travel_time,
            &mut metrics.traffic_flow_rate,
            &mut metrics.congestion_levels,
        ] {
            *series = MetricSeries::from(vec![0.0; steps]);
        }
        let mut braking = EmergencyBrakingCounts::default();
        braking.record(VehicleClass::Human);
        RunResult {
            scenario: PathBuf::from("test.sumocfg"),
            penetration_rate: rate,
            steps: steps as u64,
            metrics,
            adaptation_count: 4,
            emergency_braking: braking,
            autonomous_vehicles: BTreeSet::new(),
            adjustments: Vec::new(),
        }
    }

    fn records(results: &[RunResult]) -> Vec<Vec<String>> {
        let mut out = Vec::new();
        write_report(&mut out, results).unwrap();
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(out.as_slice())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    fn section(rows: &[Vec<String>], title: &str) -> usize {
        rows.iter()
            .position(|r| r.first().map(String::as_str) == Some(title))
            .unwrap()
    }

    #[test]
    fn mean_speed_row_shows_statistics() {
        let rows = records(&[result(0.5, vec![10.0, 20.0, 30.0])]);
        let title = section(&rows, "Mean Speed");
        assert_eq!(rows[title + 1][0], "AV Rate");
        assert_eq!(rows[title + 2], vec!["50.0%", "20.00", "30.00", "10.00", "30.00"]);
    }

    #[test]
    fn rows_sorted_by_rate() {
        let tables = summarize(&[result(1.0, vec![1.0]), result(0.0, vec![2.0])]);
        let labels: Vec<_> = tables[0].rows.iter().map(|r| r.rate_label.as_str()).collect();
        assert_eq!(labels, vec!["0.0%", "100.0%"]);
        assert_eq!(tables.len(), Metric::ALL.len());
    }

    #[test]
    fn adaptation_and_braking_sections() {
        let rows = records(&[result(0.0, vec![5.0])]);
        let adapt = section(&rows, "Traffic Light Adaptations");
        assert_eq!(rows[adapt + 2], vec!["0.0%", "4"]);
        let braking = section(&rows, "Emergency Braking Events");
        assert_eq!(rows[braking + 1], vec!["AV Rate", "Total", "Autonomous", "Human"]);
        assert_eq!(rows[braking + 2], vec!["0.0%", "1", "0", "1"]);
    }

    #[test]
    fn sections_separated_by_empty_lines() {
        let mut out = Vec::new();
        write_report(&mut out, &[result(0.0, vec![5.0])]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Metric Statistics by AV Penetration Rate\n\nNumber Of Stops\n"));
        assert!(text.contains("\n\nTraffic Light Adaptations\n"));
        assert!(text.contains("\n\nEmergency Braking Events\n"));
        assert!(!text.lines().any(|line| line == "\"\""));
    }

    #[test]
    fn empty_run_reports_not_available() {
        let rows = records(&[result(0.5, vec![])]);
        let title = section(&rows, "Mean Speed");
        assert_eq!(rows[title + 2], vec!["50.0%", "n/a", "n/a", "n/a", "n/a"]);
    }

    #[test]
    fn saves_csv_and_json() {
        let dir = std::env::temp_dir().join(format!("av_report_{}", std::process::id()));
        let results = [result(0.0, vec![1.0, 2.0])];
        let csv_path = save_report(&dir, &results, "20240101_000000").unwrap();
        let json_path = save_raw_metrics(&dir, &results, "20240101_000000").unwrap();
        assert!(csv_path.ends_with("simulation_metrics_20240101_000000.csv"));

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(raw[0]["metrics"]["mean_speed"], serde_json::json!([1.0, 2.0]));
        assert_eq!(raw[0]["adaptation_count"], 4);
        fs::remove_dir_all(&dir).unwrap();
    }
}
