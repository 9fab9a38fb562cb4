use crate::config::ConfigError;
use crate::drive::MotorError;
use crate::input::CollectorError;
use thiserror::Error;

/// Errors that end a drive session
///
/// None of them are retried. A half-applied motor command is worse than
/// stopping, so every variant leads to an orderly shutdown.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Motor outputs could not be initialized or a write failed
    #[error("Motor hardware unavailable: {0}")]
    HardwareUnavailable(#[from] MotorError),

    /// The input source terminated while driving
    #[error("Input event source lost: {0}")]
    EventSourceLost(String),

    #[error("Input collector error: {0}")]
    Collector(#[from] CollectorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task error: {0}")]
    TaskError(String),
}
