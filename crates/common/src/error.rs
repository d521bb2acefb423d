//! Error types for SheetProbe

use thiserror::Error;

/// Result type alias using SheetProbe Error
pub type Result<T> = std::result::Result<T, Error>;

/// SheetProbe configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid date format pattern: {0} (expected e.g. DD/MM/YYYY, MM/DD/YYYY or YYYY-MM-DD)")]
    InvalidDateFormat(String),
}
