// Signal adaptation
pub const ADAPTATION_CHECK_INTERVAL: u64 = 30;
pub const WAITING_TIME_THRESHOLD: f64 = 120.0;
pub const EXTENDED_PHASE_DURATION: f64 = 10.0;

// Metrics collection
pub const CONGESTION_SPEED_THRESHOLD: f64 = 5.0;
pub const EMERGENCY_BRAKING_THRESHOLD: f64 = -7.5;

// Vehicle population
pub const AUTONOMOUS_VEHICLE_TYPE: &str = "autonomous_passenger";

// Batch defaults
pub const DEFAULT_STEPS: u64 = 3600;
pub const DEFAULT_PENETRATION_RATES: [f64; 3] = [0.0, 0.5, 1.0];
pub const DEFAULT_OUTPUT_DIR: &str = "results";
pub const DEFAULT_CONFIG_FILE: &str = "simulation.json";

// Engine discovery
pub const SUMO_HOME_ENV: &str = "SUMO_HOME";
pub const SUMO_BINARY_NAME: &str = "sumo";
// SUMO 1.0
pub const MIN_TRACI_API: i32 = 18;
