use crate::config::BatchConfig;
use crate::engine::simulation::{RunSettings, SimulationRun};
use crate::error::{ConfigError, EngineResult};
use crate::shared_data::{rate_label, RunResult};
use crate::simulation_engine::EngineLauncher;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Runs one simulation per penetration rate, strictly one after another.
pub struct BatchRunner<L: EngineLauncher> {
    launcher: L,
    config: BatchConfig,
}

impl<L: EngineLauncher> BatchRunner<L> {
    /// Rejects an invalid config before any engine is started.
    pub fn new(launcher: L, config: BatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { launcher, config })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Every run gets its own generator. With a configured seed all rates
    /// share the same random stream, otherwise each run draws OS entropy.
    fn run_rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Results come back in configured rate order. The first engine failure
    /// aborts the whole batch.
    pub fn run_all(&self) -> EngineResult<Vec<RunResult>> {
        let settings = RunSettings::from_config(&self.config);
        let mut results = Vec::with_capacity(self.config.penetration_rates.len());
        for &rate in &self.config.penetration_rates {
            log::info!(
                "Running simulation with AV penetration rate: {}",
                rate_label(rate)
            );
            let mut engine = self.launcher.start(&self.config.scenario)?;
            let run = SimulationRun::new(&self.config.scenario, rate, self.run_rng(), &settings);
            let result = run.execute(&mut engine, self.config.steps)?;
            log::info!("Simulation completed for AV rate: {}", rate_label(rate));
            results.push(result);
        }
        Ok(results)
    }
}
