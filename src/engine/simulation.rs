// simulation.rs
use crate::config::{BatchConfig, CollectorConfig, SignalPolicyConfig};
use crate::control_system::traffic_light_controller::TrafficLightController;
use crate::error::EngineResult;
use crate::flow_analyzer::{
    collect_traffic_snapshot, compute_step_metrics, detect_emergency_braking,
};
use crate::shared_data::{
    rate_label, EmergencyBrakingCounts, LightAdjustment, RunMetrics, RunResult,
};
use crate::simulation_engine::population::PopulationManager;
use crate::simulation_engine::TrafficEngine;
use rand::Rng;
use std::path::PathBuf;

/// Settings shared by every run of a batch.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    pub autonomous_type: String,
    pub policy: SignalPolicyConfig,
    pub collector: CollectorConfig,
}

impl RunSettings {
    pub fn from_config(config: &BatchConfig) -> Self {
        Self {
            autonomous_type: config.autonomous_type.clone(),
            policy: config.policy.clone(),
            collector: config.collector.clone(),
        }
    }
}

/// One simulation run for a (scenario, penetration rate) pair.
///
/// Mutated once per step by the control loop; [`SimulationRun::execute`]
/// consumes it and hands back the finished [`RunResult`].
pub struct SimulationRun<R: Rng> {
    scenario: PathBuf,
    population: PopulationManager<R>,
    controller: TrafficLightController,
    collector: CollectorConfig,
    metrics: RunMetrics,
    adaptation_count: u64,
    adjustments: Vec<LightAdjustment>,
    emergency_braking: EmergencyBrakingCounts,
    steps_executed: u64,
}

impl<R: Rng> SimulationRun<R> {
    pub fn new(
        scenario: impl Into<PathBuf>,
        penetration_rate: f64,
        rng: R,
        settings: &RunSettings,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            population: PopulationManager::new(
                penetration_rate,
                settings.autonomous_type.clone(),
                rng,
            ),
            controller: TrafficLightController::new(settings.policy.clone()),
            collector: settings.collector.clone(),
            metrics: RunMetrics::new(),
            adaptation_count: 0,
            adjustments: Vec::new(),
            emergency_braking: EmergencyBrakingCounts::default(),
            steps_executed: 0,
        }
    }

    /// Runs `steps` steps and closes the engine, also when a step fails.
    pub fn execute<E: TrafficEngine>(mut self, engine: &mut E, steps: u64) -> EngineResult<RunResult> {
        log::info!(
            "Running {} with AV penetration rate {}",
            self.scenario.display(),
            rate_label(self.population.penetration_rate())
        );
        let outcome = (0..steps).try_for_each(|step| self.step(engine, step));
        let closed = engine.close();
        outcome?;
        closed?;
        log::info!(
            "Completed {} steps at rate {}: {} adaptations, {} emergency braking events",
            self.steps_executed,
            rate_label(self.population.penetration_rate()),
            self.adaptation_count,
            self.emergency_braking.total()
        );
        Ok(self.finish())
    }

    /// One iteration of the control loop: advance, classify departures,
    /// adapt signals on check steps, then record metrics.
    pub fn step<E: TrafficEngine>(&mut self, engine: &mut E, step: u64) -> EngineResult<()> {
        engine.simulation_step()?;
        self.population.classify_departures(engine)?;

        let adjustments = self.controller.adapt_traffic_lights(engine, step)?;
        self.adaptation_count += adjustments.len() as u64;
        self.adjustments.extend(adjustments);

        let snapshot = collect_traffic_snapshot(engine)?;
        self.metrics
            .push(&compute_step_metrics(&snapshot, &self.collector));

        let population = &self.population;
        for event in detect_emergency_braking(&snapshot, &self.collector, |id| {
            population.vehicle_class(id)
        }) {
            log::warn!(
                "Emergency braking: vehicle {} ({}) at {:.2} m/s^2, t={:.1}s",
                event.vehicle_id,
                event.class,
                event.acceleration,
                event.time
            );
            self.emergency_braking.record(event.class);
        }

        self.steps_executed += 1;
        Ok(())
    }

    fn finish(self) -> RunResult {
        RunResult {
            scenario: self.scenario,
            penetration_rate: self.population.penetration_rate(),
            steps: self.steps_executed,
            metrics: self.metrics,
            adaptation_count: self.adaptation_count,
            emergency_braking: self.emergency_braking,
            autonomous_vehicles: self.population.into_autonomous_vehicles(),
            adjustments: self.adjustments,
        }
    }
}
