//! Error types shared across the calibration engine.

use chrono::NaiveDate;
use thiserror::Error;

/// Which side of a chronological split came up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Test,
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Errors raised by the calibration core.
///
/// Only genuine data absence, malformed input and I/O failures surface here.
/// Numeric degeneracy (empty fits, singular Hessians) is recovered locally.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// American odds could not be interpreted as a number.
    #[error("invalid american odds: {0}")]
    InvalidOdds(String),

    /// A split partition holds zero observations.
    #[error("{partition} partition {start}..={end} contains no observations")]
    DataSufficiency {
        partition: Partition,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// A run parameter is out of its accepted domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An input record violates the observation model.
    #[error("invalid observation: {0}")]
    InvalidObservation(String),

    /// The pack could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing durable storage failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
