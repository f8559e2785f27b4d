//! Error types for rank jobs

use linkrank_engine::{ConfigurationError, RoundExecutionError};
use thiserror::Error;

/// Job errors
#[derive(Error, Debug)]
pub enum JobError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid job configuration
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Config file could not be parsed
    #[error("Config file error: {0}")]
    ConfigFile(#[from] serde_yaml::Error),

    /// Report serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A round failed
    #[error(transparent)]
    Round(#[from] RoundExecutionError),
}

pub type JobResult<T> = Result<T, JobError>;
