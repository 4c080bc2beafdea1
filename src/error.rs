//! Error taxonomy shared by the analysis pipeline and the prediction service

use thiserror::Error;

/// Errors raised by ecolabel operations
///
/// Every variant is terminal for the operation that produced it. The HTTP
/// layer turns them into `{"error": ...}` responses; the CLI aborts the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("Invalid reference data: {0}")]
    InvalidReferenceData(String),

    #[error(
        "Invalid hypergeometric domain: population={population}, marked={marked}, \
         draws={draws}, threshold={threshold}"
    )]
    InvalidDomain {
        population: i64,
        marked: i64,
        draws: i64,
        threshold: i64,
    },

    #[error("Insufficient sample size: {auto} auto and {manual} manual records (need at least {required} of each)")]
    InsufficientSampleSize {
        auto: usize,
        manual: usize,
        required: usize,
    },

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Statistical test failed: {0}")]
    Statistics(String),

    #[error("Model persistence failed: {0}")]
    Persistence(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ecolabel operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a [`Error::MalformedRecord`]
    pub fn malformed(line: u64, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    /// True when the failure was caused by the caller's input rather than
    /// by the service's own assets
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRecord { .. } | Self::UnknownDomain(_) | Self::InvalidDomain { .. }
        )
    }
}
