use crate::error::ConfigError;
use crate::global_variables::{
    ADAPTATION_CHECK_INTERVAL, AUTONOMOUS_VEHICLE_TYPE, CONGESTION_SPEED_THRESHOLD,
    DEFAULT_OUTPUT_DIR, DEFAULT_PENETRATION_RATES, DEFAULT_STEPS, EMERGENCY_BRAKING_THRESHOLD,
    EXTENDED_PHASE_DURATION, WAITING_TIME_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Thresholds for the reactive signal adaptation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalPolicyConfig {
    /// Steps between two adaptation checks.
    pub check_interval: u64,
    /// Adapt only when the summed waiting time is strictly above this.
    pub waiting_time_threshold: f64,
    pub extended_phase_duration: f64,
}

impl Default for SignalPolicyConfig {
    fn default() -> Self {
        Self {
            check_interval: ADAPTATION_CHECK_INTERVAL,
            waiting_time_threshold: WAITING_TIME_THRESHOLD,
            extended_phase_duration: EXTENDED_PHASE_DURATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub congestion_speed_threshold: f64,
    /// Accelerations at or below this count as emergency braking.
    pub emergency_braking_threshold: f64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            congestion_speed_threshold: CONGESTION_SPEED_THRESHOLD,
            emergency_braking_threshold: EMERGENCY_BRAKING_THRESHOLD,
        }
    }
}

/// Everything needed to run one batch of simulations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub scenario: PathBuf,
    #[serde(default = "default_steps")]
    pub steps: u64,
    #[serde(default = "default_rates")]
    pub penetration_rates: Vec<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub sumo_binary: Option<PathBuf>,
    #[serde(default = "default_autonomous_type")]
    pub autonomous_type: String,
    #[serde(default)]
    pub policy: SignalPolicyConfig,
    #[serde(default)]
    pub collector: CollectorConfig,
}

fn default_steps() -> u64 {
    DEFAULT_STEPS
}

fn default_rates() -> Vec<f64> {
    DEFAULT_PENETRATION_RATES.to_vec()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_autonomous_type() -> String {
    AUTONOMOUS_VEHICLE_TYPE.to_string()
}

impl BatchConfig {
    /// Config with every optional field at its default.
    pub fn new(scenario: impl Into<PathBuf>) -> Self {
        Self {
            scenario: scenario.into(),
            steps: default_steps(),
            penetration_rates: default_rates(),
            seed: None,
            output_dir: default_output_dir(),
            sumo_binary: None,
            autonomous_type: default_autonomous_type(),
            policy: SignalPolicyConfig::default(),
            collector: CollectorConfig::default(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: BatchConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps == 0 {
            return Err(ConfigError::Invalid("steps must be greater than 0".into()));
        }
        if self.penetration_rates.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one penetration rate is required".into(),
            ));
        }
        if let Some(rate) = self
            .penetration_rates
            .iter()
            .find(|r| !(0.0..=1.0).contains(*r))
        {
            return Err(ConfigError::Invalid(format!(
                "penetration rate {} is outside [0, 1]",
                rate
            )));
        }
        if self.policy.check_interval == 0 {
            return Err(ConfigError::Invalid(
                "policy.check_interval must be greater than 0".into(),
            ));
        }
        if self.autonomous_type.is_empty() {
            return Err(ConfigError::Invalid("autonomous_type cannot be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = BatchConfig::from_json(r#"{ "scenario": "due.actuated.sumocfg" }"#).unwrap();
        assert_eq!(config.scenario, PathBuf::from("due.actuated.sumocfg"));
        assert_eq!(config.steps, 3600);
        assert_eq!(config.penetration_rates, vec![0.0, 0.5, 1.0]);
        assert_eq!(config.autonomous_type, "autonomous_passenger");
        assert_eq!(config.policy.check_interval, 30);
        assert_eq!(config.policy.waiting_time_threshold, 120.0);
        assert_eq!(config.collector.emergency_braking_threshold, -7.5);
        assert!(config.seed.is_none());
    }

    #[test]
    fn partial_policy_keeps_other_defaults() {
        let config = BatchConfig::from_json(
            r#"{ "scenario": "a.sumocfg", "seed": 7, "policy": { "check_interval": 10 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.policy.check_interval, 10);
        assert_eq!(config.policy.extended_phase_duration, 10.0);
    }

    #[test]
    fn rejects_out_of_range_rate() {
        let err = BatchConfig::from_json(
            r#"{ "scenario": "a.sumocfg", "penetration_rates": [0.0, 1.5] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_steps_and_empty_rates() {
        let mut config = BatchConfig::new("a.sumocfg");
        config.steps = 0;
        assert!(config.validate().is_err());

        let mut config = BatchConfig::new("a.sumocfg");
        config.penetration_rates.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_scenario_is_a_parse_error() {
        let err = BatchConfig::from_json(r#"{ "steps": 10 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
