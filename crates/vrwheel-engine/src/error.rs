//! Errors raised outside the tick: configuration, threads, runner lifecycle.

use thiserror::Error;
use vrwheel_errors::VrWheelError;
use vrwheel_shifter::ShifterError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Frame loop already running")]
    AlreadyRunning,

    #[error("{0} thread panicked")]
    ThreadPanicked(String),

    #[error(transparent)]
    Core(#[from] VrWheelError),

    #[error(transparent)]
    Shifter(#[from] ShifterError),
}

pub type EngineResult<T> = Result<T, EngineError>;
