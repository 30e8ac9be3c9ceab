use crate::error::EngineResult;
use crate::shared_data::VehicleClass;
use crate::simulation_engine::TrafficEngine;
use rand::Rng;
use std::collections::BTreeSet;

/// Reclassifies a share of newly departed vehicles as autonomous.
///
/// The autonomous set only ever grows during a run.
#[derive(Debug)]
pub struct PopulationManager<R: Rng> {
    penetration_rate: f64,
    autonomous_type: String,
    autonomous: BTreeSet<String>,
    rng: R,
}

impl<R: Rng> PopulationManager<R> {
    pub fn new(penetration_rate: f64, autonomous_type: impl Into<String>, rng: R) -> Self {
        Self {
            penetration_rate,
            autonomous_type: autonomous_type.into(),
            autonomous: BTreeSet::new(),
            rng,
        }
    }

    pub fn penetration_rate(&self) -> f64 {
        self.penetration_rate
    }

    /// Draws one sample per departed vehicle (in engine order) and retypes the
    /// vehicle when the sample falls below the penetration rate. Returns the
    /// number of vehicles converted this step.
    pub fn classify_departures<E: TrafficEngine>(&mut self, engine: &mut E) -> EngineResult<usize> {
        let mut converted = 0;
        for vehicle_id in engine.departed_vehicle_ids()? {
            let sample: f64 = self.rng.random();
            if sample >= self.penetration_rate || self.autonomous.contains(&vehicle_id) {
                continue;
            }
            engine.set_vehicle_type(&vehicle_id, &self.autonomous_type)?;
            log::trace!("Vehicle {} reclassified as {}", vehicle_id, self.autonomous_type);
            self.autonomous.insert(vehicle_id);
            converted += 1;
        }
        Ok(converted)
    }

    pub fn vehicle_class(&self, vehicle_id: &str) -> VehicleClass {
        if self.autonomous.contains(vehicle_id) {
            VehicleClass::Autonomous
        } else {
            VehicleClass::Human
        }
    }

    pub fn autonomous_vehicles(&self) -> &BTreeSet<String> {
        &self.autonomous
    }

    pub fn into_autonomous_vehicles(self) -> BTreeSet<String> {
        self.autonomous
    }
}
