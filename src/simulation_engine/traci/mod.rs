pub mod connection;
pub mod protocol;

pub use connection::TraciConnection;

use crate::config::BatchConfig;
use crate::error::{EngineError, EngineResult, SimError};
use crate::global_variables::{MIN_TRACI_API, SUMO_BINARY_NAME, SUMO_HOME_ENV};
use crate::simulation_engine::EngineLauncher;
use std::ffi::OsString;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

/// Starts one engine process per run and connects to it over TCP.
#[derive(Debug, Clone)]
pub struct SumoLauncher {
    binary: PathBuf,
    connect_attempts: u32,
    retry_delay: Duration,
}

impl SumoLauncher {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            connect_attempts: 60,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Resolves the engine binary from the config or `$SUMO_HOME`.
    pub fn from_config(config: &BatchConfig) -> Result<Self, SimError> {
        let binary = resolve_sumo_binary(
            config.sumo_binary.as_deref(),
            std::env::var_os(SUMO_HOME_ENV),
        )?;
        Ok(Self::new(binary))
    }

    pub fn with_connect_attempts(mut self, attempts: u32, delay: Duration) -> Self {
        self.connect_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

/// An explicit binary wins; otherwise the engine must be found under `sumo_home`.
pub fn resolve_sumo_binary(
    explicit: Option<&Path>,
    sumo_home: Option<OsString>,
) -> Result<PathBuf, SimError> {
    if let Some(binary) = explicit {
        return Ok(binary.to_path_buf());
    }
    match sumo_home {
        Some(home) if !home.is_empty() => {
            Ok(PathBuf::from(home).join("bin").join(SUMO_BINARY_NAME))
        }
        _ => Err(SimError::Environment(format!(
            "Please declare the {} environment variable or set sumo_binary in the config",
            SUMO_HOME_ENV
        ))),
    }
}

/// Engines older than [`MIN_TRACI_API`] lack some of the variables read here.
pub fn check_api_version(api: i32) -> EngineResult<()> {
    if api < MIN_TRACI_API {
        return Err(EngineError::UnsupportedApi {
            found: api,
            minimum: MIN_TRACI_API,
        });
    }
    Ok(())
}

fn abandon(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn free_port() -> EngineResult<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

impl EngineLauncher for SumoLauncher {
    type Engine = TraciConnection;

    fn start(&self, scenario: &Path) -> EngineResult<TraciConnection> {
        let port = free_port()?;
        log::debug!(
            "Launching {} -c {} on port {}",
            self.binary.display(),
            scenario.display(),
            port
        );
        let mut child = Command::new(&self.binary)
            .arg("-c")
            .arg(scenario)
            .arg("--remote-port")
            .arg(port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|source| EngineError::Launch {
                binary: self.binary.clone(),
                source,
            })?;

        let mut stream = None;
        for attempt in 1..=self.connect_attempts {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return Err(EngineError::Exited {
                        status: status.to_string(),
                    })
                }
                Ok(None) => {}
                Err(e) => {
                    abandon(&mut child);
                    return Err(e.into());
                }
            }
            match TcpStream::connect(("127.0.0.1", port)) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => {
                    log::debug!("Connect attempt {} to port {} failed: {}", attempt, port, e);
                    thread::sleep(self.retry_delay);
                }
            }
        }
        let Some(stream) = stream else {
            abandon(&mut child);
            return Err(EngineError::Connect {
                port,
                attempts: self.connect_attempts,
            });
        };

        let mut connection = TraciConnection::new(stream, Some(child))?;
        let (api, identifier) = connection.version()?;
        log::info!("Connected to {} (API version {})", identifier, api);
        check_api_version(api)?;
        Ok(connection)
    }
}
