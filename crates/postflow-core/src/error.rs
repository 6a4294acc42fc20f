//! Postflow error type.

use thiserror::Error;

/// Errors surfaced by Postflow subsystems.
#[derive(Debug, Error)]
pub enum PostflowError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PostflowError>;
