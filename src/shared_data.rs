// src/shared_data.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// The per-step metrics tracked for every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    NumberOfStops,
    FuelConsumption,
    MeanSpeed,
    AverageTravelTime,
    TrafficFlowRate,
    CongestionLevels,
}

impl Metric {
    /// Report order.
    pub const ALL: [Metric; 6] = [
        Metric::NumberOfStops,
        Metric::FuelConsumption,
        Metric::AverageTravelTime,
        Metric::TrafficFlowRate,
        Metric::CongestionLevels,
        Metric::MeanSpeed,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::NumberOfStops => "number_of_stops",
            Metric::FuelConsumption => "fuel_consumption",
            Metric::MeanSpeed => "mean_speed",
            Metric::AverageTravelTime => "average_travel_time",
            Metric::TrafficFlowRate => "traffic_flow_rate",
            Metric::CongestionLevels => "congestion_levels",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Metric::NumberOfStops => "Number Of Stops",
            Metric::FuelConsumption => "Fuel Consumption",
            Metric::MeanSpeed => "Mean Speed",
            Metric::AverageTravelTime => "Average Travel Time",
            Metric::TrafficFlowRate => "Traffic Flow Rate",
            Metric::CongestionLevels => "Congestion Levels",
        }
    }

    /// Y-axis label used by the plots.
    pub fn unit_label(self) -> &'static str {
        match self {
            Metric::NumberOfStops => "Stopped Vehicles",
            Metric::FuelConsumption => "Fuel Consumption (mg/s)",
            Metric::MeanSpeed => "Mean Speed (m/s)",
            Metric::AverageTravelTime => "Average Travel Time (s)",
            Metric::TrafficFlowRate => "Vehicles / s",
            Metric::CongestionLevels => "Congested Vehicles",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Time series of one metric, one value per executed step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSeries(Vec<f64>);

impl MetricSeries {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, value: f64) {
        self.0.push(value);
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Average, maximum, minimum and final value. `None` for an empty series.
    pub fn summary(&self) -> Option<MetricSummary> {
        let final_value = *self.0.last()?;
        let sum: f64 = self.0.iter().sum();
        Some(MetricSummary {
            average: sum / self.0.len() as f64,
            maximum: self.0.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            minimum: self.0.iter().cloned().fold(f64::INFINITY, f64::min),
            final_value,
        })
    }
}

impl From<Vec<f64>> for MetricSeries {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub average: f64,
    pub maximum: f64,
    pub minimum: f64,
    pub final_value: f64,
}

/// Aggregates derived from one simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StepMetrics {
    pub number_of_stops: f64,
    pub fuel_consumption: f64,
    pub mean_speed: f64,
    pub average_travel_time: f64,
    pub traffic_flow_rate: f64,
    pub congestion_levels: f64,
}

impl StepMetrics {
    /// Value recorded for a step with no vehicles in the network.
    pub const NEUTRAL: StepMetrics = StepMetrics {
        number_of_stops: 0.0,
        fuel_consumption: 0.0,
        mean_speed: 0.0,
        average_travel_time: 0.0,
        traffic_flow_rate: 0.0,
        congestion_levels: 0.0,
    };
}

/// One named series per tracked metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub number_of_stops: MetricSeries,
    pub fuel_consumption: MetricSeries,
    pub mean_speed: MetricSeries,
    pub average_travel_time: MetricSeries,
    pub traffic_flow_rate: MetricSeries,
    pub congestion_levels: MetricSeries,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one step to every series so they always stay the same length.
    pub fn push(&mut self, step: &StepMetrics) {
        self.number_of_stops.push(step.number_of_stops);
        self.fuel_consumption.push(step.fuel_consumption);
        self.mean_speed.push(step.mean_speed);
        self.average_travel_time.push(step.average_travel_time);
        self.traffic_flow_rate.push(step.traffic_flow_rate);
        self.congestion_levels.push(step.congestion_levels);
    }

    pub fn series(&self, metric: Metric) -> &MetricSeries {
        match metric {
            Metric::NumberOfStops => &self.number_of_stops,
            Metric::FuelConsumption => &self.fuel_consumption,
            Metric::MeanSpeed => &self.mean_speed,
            Metric::AverageTravelTime => &self.average_travel_time,
            Metric::TrafficFlowRate => &self.traffic_flow_rate,
            Metric::CongestionLevels => &self.congestion_levels,
        }
    }

    /// Number of recorded steps.
    pub fn steps(&self) -> usize {
        self.mean_speed.len()
    }
}

/// Whether a vehicle was reclassified as autonomous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleClass {
    Autonomous,
    Human,
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VehicleClass::Autonomous => write!(f, "AV"),
            VehicleClass::Human => write!(f, "human"),
        }
    }
}

/// Emergency braking counters. The total is always the sum of both classes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyBrakingCounts {
    total: u64,
    autonomous: u64,
    human: u64,
}

impl EmergencyBrakingCounts {
    pub fn record(&mut self, class: VehicleClass) {
        self.total += 1;
        match class {
            VehicleClass::Autonomous => self.autonomous += 1,
            VehicleClass::Human => self.human += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn autonomous(&self) -> u64 {
        self.autonomous
    }

    pub fn human(&self) -> u64 {
        self.human
    }
}

/// A deceleration at or beyond the braking threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrakingEvent {
    pub vehicle_id: String,
    pub class: VehicleClass,
    pub acceleration: f64,
    pub time: f64,
}

/// Record of one phase extension applied to an intersection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightAdjustment {
    pub step: u64,
    pub intersection_id: String,
    pub phase: i32,
    pub total_waiting_time: f64,
    pub new_duration: f64,
}

/// Final, immutable outcome of one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub scenario: PathBuf,
    pub penetration_rate: f64,
    pub steps: u64,
    pub metrics: RunMetrics,
    pub adaptation_count: u64,
    pub emergency_braking: EmergencyBrakingCounts,
    pub autonomous_vehicles: BTreeSet<String>,
    /// Every phase extension in the order it was applied.
    pub adjustments: Vec<LightAdjustment>,
}

impl RunResult {
    /// Rate label as used in reports, e.g. `50.0%`.
    pub fn rate_label(&self) -> String {
        rate_label(self.penetration_rate)
    }
}

pub fn rate_label(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_mean_speed_series() {
        let series = MetricSeries::from(vec![10.0, 20.0, 30.0]);
        let summary = series.summary().unwrap();
        assert_eq!(summary.average, 20.0);
        assert_eq!(summary.maximum, 30.0);
        assert_eq!(summary.minimum, 10.0);
        assert_eq!(summary.final_value, 30.0);
    }

    #[test]
    fn empty_series_has_no_summary() {
        assert!(MetricSeries::new().summary().is_none());
    }

    #[test]
    fn run_metrics_series_stay_aligned() {
        let mut metrics = RunMetrics::new();
        metrics.push(&StepMetrics::NEUTRAL);
        metrics.push(&StepMetrics {
            mean_speed: 12.5,
            ..StepMetrics::NEUTRAL
        });
        for metric in Metric::ALL {
            assert_eq!(metrics.series(metric).len(), 2, "{metric}");
        }
        assert_eq!(metrics.mean_speed.values(), &[0.0, 12.5]);
    }

    #[test]
    fn braking_subcounts_sum_to_total() {
        let mut counts = EmergencyBrakingCounts::default();
        counts.record(VehicleClass::Human);
        counts.record(VehicleClass::Autonomous);
        counts.record(VehicleClass::Human);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.autonomous() + counts.human(), counts.total());
        assert_eq!(counts.human(), 2);
    }

    #[test]
    fn rate_labels() {
        assert_eq!(rate_label(0.0), "0.0%");
        assert_eq!(rate_label(0.5), "50.0%");
        assert_eq!(rate_label(1.0), "100.0%");
    }
}
