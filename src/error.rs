//! Error types shared across the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to (or launching) the external traffic engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to launch engine binary {binary}: {source}")]
    Launch {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not connect to engine on port {port} after {attempts} attempts")]
    Connect { port: u16, attempts: u32 },

    #[error("Engine process exited before accepting a connection: {status}")]
    Exited { status: String },

    #[error("Engine speaks TraCI API {found}, at least {minimum} is required")]
    UnsupportedApi { found: i32, minimum: i32 },

    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine rejected command 0x{command:02x} (status 0x{status:02x}): {description}")]
    Command {
        command: u8,
        status: u8,
        description: String,
    },

    #[error("Malformed engine response: {0}")]
    Protocol(String),

    #[error("Unknown {kind} id '{id}'")]
    UnknownId { kind: &'static str, id: String },

    #[error("Engine connection already closed")]
    Closed,
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Problems with the batch configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Failures while writing the report, raw dump or plots.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plot error: {0}")]
    Plot(String),
}

/// Top-level error for a batch invocation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Environment misconfigured: {0}")]
    Environment(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Report(#[from] ReportError),
}
