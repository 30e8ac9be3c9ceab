//! In-memory engine that replays a fixed script of steps.
//!
//! Used by the tests and benches to drive the control loop without a live
//! simulation process. Every write the control loop makes is recorded so it
//! can be asserted on afterwards.

use crate::error::{EngineError, EngineResult};
use crate::simulation_engine::{EngineLauncher, TrafficEngine, VehicleState};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedVehicle {
    pub id: String,
    pub lane: String,
    pub state: VehicleState,
}

impl ScriptedVehicle {
    pub fn new(id: impl Into<String>, lane: impl Into<String>, state: VehicleState) -> Self {
        Self {
            id: id.into(),
            lane: lane.into(),
            state,
        }
    }
}

/// Network contents right after one step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptedStep {
    /// Simulated time reported after this step; `None` means the step number.
    pub time: Option<f64>,
    pub departed: Vec<String>,
    pub vehicles: Vec<ScriptedVehicle>,
}

impl ScriptedStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn depart(mut self, id: impl Into<String>) -> Self {
        self.departed.push(id.into());
        self
    }

    pub fn vehicle(mut self, vehicle: ScriptedVehicle) -> Self {
        self.vehicles.push(vehicle);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseDurationChange {
    pub step: usize,
    pub tls_id: String,
    pub duration: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    steps: Vec<ScriptedStep>,
    traffic_lights: BTreeMap<String, Vec<String>>,
    phases: BTreeMap<String, i32>,
    /// Number of steps executed so far.
    executed: usize,
    closed: bool,
    close_calls: usize,
    type_changes: Vec<(String, String)>,
    phase_duration_changes: Vec<PhaseDurationChange>,
}

impl ScriptedEngine {
    pub fn new(steps: Vec<ScriptedStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Registers a signal controlling the given lanes.
    pub fn with_traffic_light(mut self, tls_id: &str, lanes: &[&str]) -> Self {
        self.traffic_lights.insert(
            tls_id.to_string(),
            lanes.iter().map(|l| l.to_string()).collect(),
        );
        self.phases.insert(tls_id.to_string(), 0);
        self
    }

    pub fn executed_steps(&self) -> usize {
        self.executed
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    pub fn type_changes(&self) -> &[(String, String)] {
        &self.type_changes
    }

    pub fn phase_duration_changes(&self) -> &[PhaseDurationChange] {
        &self.phase_duration_changes
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed {
            Err(EngineError::Closed)
        } else {
            Ok(())
        }
    }

    /// The step the engine currently sits on. Past the end of the script the
    /// network is empty.
    fn current(&self) -> Option<&ScriptedStep> {
        self.executed
            .checked_sub(1)
            .and_then(|index| self.steps.get(index))
    }

    fn find_vehicle(&self, vehicle_id: &str) -> EngineResult<&ScriptedVehicle> {
        self.current()
            .and_then(|step| step.vehicles.iter().find(|v| v.id == vehicle_id))
            .ok_or_else(|| EngineError::UnknownId {
                kind: "vehicle",
                id: vehicle_id.to_string(),
            })
    }

    fn unknown_tls(tls_id: &str) -> EngineError {
        EngineError::UnknownId {
            kind: "traffic light",
            id: tls_id.to_string(),
        }
    }
}

impl TrafficEngine for ScriptedEngine {
    fn simulation_step(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        self.executed += 1;
        Ok(())
    }

    fn simulation_time(&mut self) -> EngineResult<f64> {
        self.ensure_open()?;
        Ok(self
            .current()
            .and_then(|step| step.time)
            .unwrap_or(self.executed as f64))
    }

    fn departed_vehicle_ids(&mut self) -> EngineResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self
            .current()
            .map(|step| step.departed.clone())
            .unwrap_or_default())
    }

    fn vehicle_ids(&mut self) -> EngineResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self
            .current()
            .map(|step| step.vehicles.iter().map(|v| v.id.clone()).collect())
            .unwrap_or_default())
    }

    fn vehicle_state(&mut self, vehicle_id: &str) -> EngineResult<VehicleState> {
        self.ensure_open()?;
        Ok(self.find_vehicle(vehicle_id)?.state)
    }

    fn vehicle_waiting_time(&mut self, vehicle_id: &str) -> EngineResult<f64> {
        self.ensure_open()?;
        Ok(self.find_vehicle(vehicle_id)?.state.waiting_time)
    }

    fn set_vehicle_type(&mut self, vehicle_id: &str, type_id: &str) -> EngineResult<()> {
        self.ensure_open()?;
        let departed_now = self
            .current()
            .map(|step| step.departed.iter().any(|id| id == vehicle_id))
            .unwrap_or(false);
        if !departed_now && self.find_vehicle(vehicle_id).is_err() {
            return Err(EngineError::UnknownId {
                kind: "vehicle",
                id: vehicle_id.to_string(),
            });
        }
        self.type_changes
            .push((vehicle_id.to_string(), type_id.to_string()));
        Ok(())
    }

    fn traffic_light_ids(&mut self) -> EngineResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.traffic_lights.keys().cloned().collect())
    }

    fn controlled_lanes(&mut self, tls_id: &str) -> EngineResult<Vec<String>> {
        self.ensure_open()?;
        self.traffic_lights
            .get(tls_id)
            .cloned()
            .ok_or_else(|| Self::unknown_tls(tls_id))
    }

    fn lane_vehicle_ids(&mut self, lane_id: &str) -> EngineResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self
            .current()
            .map(|step| {
                step.vehicles
                    .iter()
                    .filter(|v| v.lane == lane_id)
                    .map(|v| v.id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn current_phase(&mut self, tls_id: &str) -> EngineResult<i32> {
        self.ensure_open()?;
        self.phases
            .get(tls_id)
            .copied()
            .ok_or_else(|| Self::unknown_tls(tls_id))
    }

    fn set_phase_duration(&mut self, tls_id: &str, duration: f64) -> EngineResult<()> {
        self.ensure_open()?;
        if !self.traffic_lights.contains_key(tls_id) {
            return Err(Self::unknown_tls(tls_id));
        }
        self.phase_duration_changes.push(PhaseDurationChange {
            step: self.executed,
            tls_id: tls_id.to_string(),
            duration,
        });
        Ok(())
    }

    fn close(&mut self) -> EngineResult<()> {
        self.close_calls += 1;
        self.ensure_open()?;
        self.closed = true;
        Ok(())
    }
}

/// Hands out a fresh copy of the same script for every run.
#[derive(Debug, Clone)]
pub struct ScriptedLauncher {
    template: ScriptedEngine,
}

impl ScriptedLauncher {
    pub fn new(template: ScriptedEngine) -> Self {
        Self { template }
    }
}

impl EngineLauncher for ScriptedLauncher {
    type Engine = ScriptedEngine;

    fn start(&self, _scenario: &Path) -> EngineResult<ScriptedEngine> {
        Ok(self.template.clone())
    }
}
