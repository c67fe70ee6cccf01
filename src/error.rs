use std::fmt;
use thiserror::Error;

/// Failures of the admission gate and its replenishment schedule.
///
/// Kept apart from [`AppError`] so that downstream transport failures never flow
/// through the gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LimiterError {
    #[error("Admission interrupted before a permit was granted")]
    Interrupted,

    #[error("Replenishment scheduler failed to start: {0}")]
    SchedulerInit(String),

    #[error("Request limit must be greater than zero")]
    InvalidCapacity,
}

/// Which half of a document submission a reply belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Document,
    Signature,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Document => f.write_str("document"),
            Stage::Signature => f.write_str("signature"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Rate limiter error: {0}")]
    Limiter(#[from] LimiterError),

    #[error("API request for {stage} failed with status {status}: {body}")]
    Rejected {
        stage: Stage,
        status: u16,
        body: String,
    },

    #[error("Initialization error: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
