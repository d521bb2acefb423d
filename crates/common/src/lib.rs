//! SheetProbe Common Library
//!
//! Browser-free building blocks shared by the SheetProbe E2E crate:
//! - `date`: strict, calendar-aware validation of clipboard date strings
//! - `retry`: bounded, strictly sequential polling with hard-failure escape
//! - `config`: credentials sourced from the process environment

pub mod config;
pub mod date;
pub mod error;
pub mod retry;

// Re-export commonly used types
pub use config::Credentials;
pub use date::{DateFormat, DateOrder, DateToken};
pub use error::{Error, Result};
pub use retry::{poll, PollOutcome, RetryBudget, Sampler};

/// SheetProbe version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
