use serde::{Deserialize, Serialize};

/// Per-step state of one vehicle as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleState {
    /// m/s
    pub speed: f64,
    /// Longitudinal acceleration in m/s^2 (negative while braking).
    pub acceleration: f64,
    /// Instantaneous fuel consumption, engine units per second.
    pub fuel_consumption: f64,
    /// Engine stop-state bit field; zero while driving.
    pub stop_state: i32,
    pub waiting_time: f64,
    /// Total waiting time since departure.
    pub accumulated_waiting_time: f64,
}

impl VehicleState {
    /// A moving vehicle with the given speed and everything else at zero.
    pub fn moving(speed: f64) -> Self {
        Self {
            speed,
            ..Self::default()
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_state != 0
    }
}

/// A vehicle and its state at one step.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub id: String,
    pub state: VehicleState,
}
