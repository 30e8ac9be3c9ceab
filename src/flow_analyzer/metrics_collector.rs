use crate::config::CollectorConfig;
use crate::error::EngineResult;
use crate::shared_data::{BrakingEvent, StepMetrics, VehicleClass};
use crate::simulation_engine::vehicles::VehicleSnapshot;
use crate::simulation_engine::TrafficEngine;

/// Vehicle states read from the engine at one step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrafficSnapshot {
    pub time: f64,
    pub vehicles: Vec<VehicleSnapshot>,
}

/// Read every vehicle currently in the network.
pub fn collect_traffic_snapshot<E: TrafficEngine>(engine: &mut E) -> EngineResult<TrafficSnapshot> {
    let time = engine.simulation_time()?;
    let mut vehicles = Vec::new();
    for id in engine.vehicle_ids()? {
        let state = engine.vehicle_state(&id)?;
        vehicles.push(VehicleSnapshot { id, state });
    }
    Ok(TrafficSnapshot { time, vehicles })
}

/// Derive the per-step aggregates. An empty network yields the neutral value.
pub fn compute_step_metrics(snapshot: &TrafficSnapshot, config: &CollectorConfig) -> StepMetrics {
    if snapshot.vehicles.is_empty() {
        return StepMetrics::NEUTRAL;
    }
    let count = snapshot.vehicles.len() as f64;
    let states = || snapshot.vehicles.iter().map(|v| &v.state);

    let stops = states().filter(|s| s.is_stopped()).count();
    let fuel: f64 = states().map(|s| s.fuel_consumption).sum();
    let speed_sum: f64 = states().map(|s| s.speed).sum();
    let waiting_sum: f64 = states().map(|s| s.accumulated_waiting_time).sum();
    let congested = states()
        .filter(|s| s.speed < config.congestion_speed_threshold)
        .count();

    StepMetrics {
        number_of_stops: stops as f64,
        fuel_consumption: fuel,
        mean_speed: speed_sum / count,
        average_travel_time: waiting_sum / count,
        // Floor at one second so the first step cannot divide by zero.
        traffic_flow_rate: count / snapshot.time.max(1.0),
        congestion_levels: congested as f64,
    }
}

/// Vehicles decelerating at or beyond the braking threshold.
pub fn detect_emergency_braking(
    snapshot: &TrafficSnapshot,
    config: &CollectorConfig,
    classify: impl Fn(&str) -> VehicleClass,
) -> Vec<BrakingEvent> {
    snapshot
        .vehicles
        .iter()
        .filter(|v| v.state.acceleration <= config.emergency_braking_threshold)
        .map(|v| BrakingEvent {
            vehicle_id: v.id.clone(),
            class: classify(&v.id),
            acceleration: v.state.acceleration,
            time: snapshot.time,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation_engine::VehicleState;

    fn snapshot(time: f64, states: Vec<VehicleState>) -> TrafficSnapshot {
        TrafficSnapshot {
            time,
            vehicles: states
                .into_iter()
                .enumerate()
                .map(|(i, state)| VehicleSnapshot {
                    id: format!("veh{}", i),
                    state,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_network_is_neutral() {
        let metrics = compute_step_metrics(&snapshot(12.0, vec![]), &CollectorConfig::default());
        assert_eq!(metrics, StepMetrics::NEUTRAL);
    }

    #[test]
    fn aggregates_vehicle_states() {
        let states = vec![
            VehicleState {
                speed: 0.0,
                stop_state: 1,
                fuel_consumption: 1.5,
                accumulated_waiting_time: 20.0,
                ..VehicleState::default()
            },
            VehicleState {
                speed: 4.0,
                fuel_consumption: 2.5,
                accumulated_waiting_time: 10.0,
                ..VehicleState::default()
            },
            VehicleState {
                speed: 14.0,
                fuel_consumption: 4.0,
                ..VehicleState::default()
            },
        ];
        let metrics = compute_step_metrics(&snapshot(30.0, states), &CollectorConfig::default());
        assert_eq!(metrics.number_of_stops, 1.0);
        assert_eq!(metrics.fuel_consumption, 8.0);
        assert_eq!(metrics.mean_speed, 6.0);
        assert_eq!(metrics.average_travel_time, 10.0);
        assert_eq!(metrics.traffic_flow_rate, 0.1);
        // 0.0 and 4.0 are under 5 m/s
        assert_eq!(metrics.congestion_levels, 2.0);
    }

    #[test]
    fn flow_rate_at_time_zero_is_finite() {
        let metrics = compute_step_metrics(
            &snapshot(0.0, vec![VehicleState::moving(10.0)]),
            &CollectorConfig::default(),
        );
        assert_eq!(metrics.traffic_flow_rate, 1.0);
    }

    #[test]
    fn speed_at_congestion_threshold_is_not_congested() {
        let metrics = compute_step_metrics(
            &snapshot(5.0, vec![VehicleState::moving(5.0)]),
            &CollectorConfig::default(),
        );
        assert_eq!(metrics.congestion_levels, 0.0);
    }

    #[test]
    fn braking_threshold_is_inclusive() {
        let hard = VehicleState {
            acceleration: -7.5,
            ..VehicleState::default()
        };
        let soft = VehicleState {
            acceleration: -7.4,
            ..VehicleState::default()
        };
        let config = CollectorConfig::default();

        let events = detect_emergency_braking(&snapshot(3.0, vec![hard]), &config, |_| {
            VehicleClass::Human
        });
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].vehicle_id, "veh0");
        assert_eq!(events[0].time, 3.0);

        let events = detect_emergency_braking(&snapshot(3.0, vec![soft]), &config, |_| {
            VehicleClass::Human
        });
        assert!(events.is_empty());
    }

    #[test]
    fn braking_events_carry_vehicle_class() {
        let hard = VehicleState {
            acceleration: -9.0,
            ..VehicleState::default()
        };
        let events = detect_emergency_braking(
            &snapshot(1.0, vec![hard, hard]),
            &CollectorConfig::default(),
            |id| {
                if id == "veh1" {
                    VehicleClass::Autonomous
                } else {
                    VehicleClass::Human
                }
            },
        );
        let classes: Vec<_> = events.iter().map(|e| e.class).collect();
        assert_eq!(classes, vec![VehicleClass::Human, VehicleClass::Autonomous]);
    }
}
