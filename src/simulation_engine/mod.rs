// simulation_engine/mod.rs
pub mod population;
pub mod scripted;
pub mod traci;
pub mod vehicles;

use crate::error::EngineResult;
use std::path::Path;

pub use vehicles::VehicleState;

/// Narrow view of the external traffic engine used by the control loop.
///
/// Every call blocks until the engine has answered. The engine is
/// authoritative for vehicle dynamics, routing and signal execution; this
/// crate only observes and nudges it.
pub trait TrafficEngine {
    /// Advances simulated time by one step.
    fn simulation_step(&mut self) -> EngineResult<()>;

    /// Current simulated time in seconds.
    fn simulation_time(&mut self) -> EngineResult<f64>;

    /// Vehicles that entered the network during the last step, in engine order.
    fn departed_vehicle_ids(&mut self) -> EngineResult<Vec<String>>;

    /// Vehicles currently in the network.
    fn vehicle_ids(&mut self) -> EngineResult<Vec<String>>;

    fn vehicle_state(&mut self, vehicle_id: &str) -> EngineResult<VehicleState>;

    /// Seconds the vehicle has been standing since it last moved.
    fn vehicle_waiting_time(&mut self, vehicle_id: &str) -> EngineResult<f64>;

    fn set_vehicle_type(&mut self, vehicle_id: &str, type_id: &str) -> EngineResult<()>;

    fn traffic_light_ids(&mut self) -> EngineResult<Vec<String>>;

    /// Lanes controlled by a signal, one entry per signal link (may repeat).
    fn controlled_lanes(&mut self, tls_id: &str) -> EngineResult<Vec<String>>;

    fn lane_vehicle_ids(&mut self, lane_id: &str) -> EngineResult<Vec<String>>;

    fn current_phase(&mut self, tls_id: &str) -> EngineResult<i32>;

    /// Sets the remaining duration of the active phase.
    fn set_phase_duration(&mut self, tls_id: &str, duration: f64) -> EngineResult<()>;

    /// Releases all engine-side resources. Called exactly once per run.
    fn close(&mut self) -> EngineResult<()>;
}

/// Creates a fresh engine instance for a scenario.
pub trait EngineLauncher {
    type Engine: TrafficEngine;

    fn start(&self, scenario: &Path) -> EngineResult<Self::Engine>;
}
