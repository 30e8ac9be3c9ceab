//! Mixed-traffic experiments on top of an external microscopic traffic
//! simulator: a share of departing vehicles is turned autonomous, congested
//! signals get their active phase extended, and per-step traffic metrics are
//! collected for every penetration rate of a batch.

pub mod config;
pub mod control_system;
pub mod engine;
pub mod error;
pub mod flow_analyzer;
pub mod global_variables;
pub mod monitoring;
pub mod shared_data;
pub mod simulation_engine;

pub use config::BatchConfig;
pub use engine::{BatchRunner, RunSettings, SimulationRun};
pub use error::{ConfigError, EngineError, ReportError, SimError};
pub use shared_data::{Metric, MetricSeries, RunMetrics, RunResult};
pub use simulation_engine::{EngineLauncher, TrafficEngine};
