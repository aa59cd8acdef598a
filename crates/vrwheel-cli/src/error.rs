//! Error types for vrwheelctl

use thiserror::Error;
use vrwheel_engine::EngineError;
use vrwheel_errors::ReportError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Refusing to overwrite {0} (pass --force)")]
    AlreadyExists(String),

    #[error("Report {index} is not valid hex: {source}")]
    InvalidHex {
        index: usize,
        #[source]
        source: hex::FromHexError,
    },

    #[error("Report {index} could not be decoded: {source}")]
    InvalidReport {
        index: usize,
        #[source]
        source: ReportError,
    },

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
