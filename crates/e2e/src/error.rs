//! Error types for E2E runs

use thiserror::Error;

use crate::session::SessionState;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(#[from] sheetprobe_common::Error),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Driver protocol error: {0}")]
    Protocol(String),

    #[error("Step '{operation}' requires state {expected}, session is in {actual}")]
    Precondition {
        operation: &'static str,
        expected: String,
        actual: SessionState,
    },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Page or frame was closed: {0}")]
    TargetClosed(String),

    #[error("Clipboard access denied: {0}")]
    ClipboardDenied(String),

    #[error("No valid date read from the clipboard after {attempts} attempt(s); last value: {last_value:?}")]
    VerificationExhausted {
        attempts: u32,
        last_value: Option<String>,
    },

    #[error("Assertion failed: expected {expected:?}, got {actual:?}")]
    AssertionFailed { expected: String, actual: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl E2eError {
    /// True for errors that mean the hosting tab or frame is gone.
    pub fn is_target_closed(&self) -> bool {
        matches!(self, E2eError::TargetClosed(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
