pub mod metrics_collector;

// Re-export the items from metrics_collector
pub use metrics_collector::{
    collect_traffic_snapshot, compute_step_metrics, detect_emergency_braking, TrafficSnapshot,
};
