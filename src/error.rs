use thiserror::Error;

pub type Result<T> = std::result::Result<T, QcError>;

#[derive(Error, Debug)]
pub enum QcError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Computation failure in {check}: {message}")]
    ComputationFailure { check: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid quality flag: {0}")]
    InvalidFlag(u8),

    #[error("Station batch deadline exceeded after {elapsed_ms} ms")]
    DeadlineExceeded { elapsed_ms: u64 },
}
