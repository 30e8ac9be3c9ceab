use crate::config::SignalPolicyConfig;
use crate::error::EngineResult;
use crate::shared_data::LightAdjustment;
use crate::simulation_engine::TrafficEngine;
use std::collections::HashSet;

/// Fixed-threshold signal adaptation.
///
/// Every `check_interval` steps each signal is inspected; when the vehicles
/// queued on its controlled lanes have waited more than the threshold in
/// total, the active phase is held for `extended_phase_duration`. The active
/// phase itself is never changed, and nothing carries over between checks.
#[derive(Debug, Clone, Default)]
pub struct TrafficLightController {
    config: SignalPolicyConfig,
}

impl TrafficLightController {
    pub fn new(config: SignalPolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalPolicyConfig {
        &self.config
    }

    /// A zero interval never checks.
    pub fn is_check_step(&self, step: u64) -> bool {
        step.checked_rem(self.config.check_interval) == Some(0)
    }

    pub fn needs_adaptation(&self, total_waiting_time: f64) -> bool {
        total_waiting_time > self.config.waiting_time_threshold
    }

    /// Sum of the waiting time of every vehicle on a lane this signal controls.
    /// Lanes listed more than once (one entry per link) are counted once.
    pub fn total_waiting_time<E: TrafficEngine>(
        &self,
        engine: &mut E,
        tls_id: &str,
    ) -> EngineResult<f64> {
        let mut seen = HashSet::new();
        let mut total = 0.0;
        for lane_id in engine.controlled_lanes(tls_id)? {
            if !seen.insert(lane_id.clone()) {
                continue;
            }
            for vehicle_id in engine.lane_vehicle_ids(&lane_id)? {
                total += engine.vehicle_waiting_time(&vehicle_id)?;
            }
        }
        Ok(total)
    }

    /// Runs the check for `step`. Returns the adjustments applied, empty on
    /// non-check steps.
    pub fn adapt_traffic_lights<E: TrafficEngine>(
        &self,
        engine: &mut E,
        step: u64,
    ) -> EngineResult<Vec<LightAdjustment>> {
        if !self.is_check_step(step) {
            return Ok(Vec::new());
        }
        let mut adjustments = Vec::new();
        for tls_id in engine.traffic_light_ids()? {
            let waiting = self.total_waiting_time(engine, &tls_id)?;
            if !self.needs_adaptation(waiting) {
                continue;
            }
            let phase = engine.current_phase(&tls_id)?;
            engine.set_phase_duration(&tls_id, self.config.extended_phase_duration)?;
            log::info!(
                "Step {}: extended phase {} at {} to {}s (total waiting {:.1}s)",
                step,
                phase,
                tls_id,
                self.config.extended_phase_duration,
                waiting
            );
            adjustments.push(LightAdjustment {
                step,
                intersection_id: tls_id,
                phase,
                total_waiting_time: waiting,
                new_duration: self.config.extended_phase_duration,
            });
        }
        Ok(adjustments)
    }
}
