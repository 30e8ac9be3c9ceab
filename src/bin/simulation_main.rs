// simulation_main.rs
use av_mixed_traffic::config::BatchConfig;
use av_mixed_traffic::engine::BatchRunner;
use av_mixed_traffic::error::SimError;
use av_mixed_traffic::global_variables::DEFAULT_CONFIG_FILE;
use av_mixed_traffic::monitoring::{plot_all, report_timestamp, save_raw_metrics, save_report};
use av_mixed_traffic::simulation_engine::traci::SumoLauncher;
use std::path::PathBuf;
use std::process;

fn run(config_path: PathBuf) -> Result<(), SimError> {
    let config = BatchConfig::load(&config_path)?;
    let launcher = SumoLauncher::from_config(&config)?;
    log::info!("Using engine binary {}", launcher.binary().display());

    let runner = BatchRunner::new(launcher, config)?;
    let results = runner.run_all()?;

    let output_dir = &runner.config().output_dir;
    let stamp = report_timestamp();
    let report = save_report(output_dir, &results, &stamp)?;
    save_raw_metrics(output_dir, &results, &stamp)?;
    plot_all(output_dir, &results)?;
    println!("Metrics report saved to {}", report.display());
    Ok(())
}

fn main() {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    println!("Starting mixed traffic batch from {}...", config_path.display());

    if let Err(e) = run(config_path) {
        eprintln!("Simulation error: {}", e);
        process::exit(1);
    }
}
