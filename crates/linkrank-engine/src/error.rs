//! Error types for the propagation engine

use thiserror::Error;

/// A record (text line or shuffle bytes) that does not parse into the expected shape
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Line has fewer fields than a record needs
    #[error("Expected at least {expected} tab-separated fields, found {found}")]
    MissingFields { expected: usize, found: usize },

    /// Vertex id field is empty
    #[error("Empty vertex id")]
    EmptyId,

    /// Rank field is not a float
    #[error("Invalid rank '{0}'")]
    InvalidRank(String),

    /// Binary record is truncated or carries unknown content
    #[error("Malformed binary record: {0}")]
    Binary(String),
}

impl From<bincode::Error> for DecodeError {
    fn from(err: bincode::Error) -> Self {
        DecodeError::Binary(err.to_string())
    }
}

/// The substrate failed to complete a round
#[derive(Error, Debug)]
#[error("Round {round} failed: {reason}")]
pub struct RoundExecutionError {
    /// 1-based round number
    pub round: usize,
    /// What went wrong
    pub reason: String,
}

impl RoundExecutionError {
    pub fn new(round: usize, reason: impl Into<String>) -> Self {
        Self {
            round,
            reason: reason.into(),
        }
    }
}

/// Invalid configuration, rejected before any round executes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// `max_rounds` must be at least 1
    #[error("max_rounds must be positive, got {0}")]
    InvalidMaxRounds(usize),

    /// The substrate needs at least one partition
    #[error("partitions must be positive, got {0}")]
    InvalidPartitions(usize),

    /// Input path was not supplied or does not exist
    #[error("Missing input path: {0}")]
    MissingInput(String),

    /// Anything else the caller got wrong
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Round(#[from] RoundExecutionError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

pub type EngineResult<T> = Result<T, EngineError>;
