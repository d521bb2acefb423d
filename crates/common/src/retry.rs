//! Bounded, sequential polling
//!
//! A [`Sampler`] produces one raw value per attempt. Its result is tagged:
//! `Ok(value)` means "a value was read, judge it", `Err(e)` is a hard
//! failure that aborts the whole poll immediately. Only values rejected by
//! the validator are retried.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Attempt budget for a poll sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
    delay: Duration,
}

impl RetryBudget {
    /// Create a budget; `max_attempts` must be at least 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "retry budget needs at least one attempt".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between a rejected attempt and the next one
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(1),
        }
    }
}

/// Terminal result of a poll sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The validator accepted a value on attempt number `attempts`.
    Success { value: T, attempts: u32 },

    /// Every attempt produced a value the validator rejected.
    Exhausted {
        attempts: u32,
        last_value: Option<String>,
    },
}

impl<T> PollOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Success { attempts, .. } | PollOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Produces one raw sample per poll attempt
#[async_trait]
pub trait Sampler: Send {
    type Error: Send;

    /// Take a fresh sample. `attempt` is 1-based.
    async fn sample(&mut self, attempt: u32) -> std::result::Result<String, Self::Error>;
}

/// Drive `sampler` until `validate` accepts a sample or the budget runs out.
///
/// Attempts never overlap: each sample is awaited before the next starts.
/// A sampler error is returned as-is without consuming further attempts.
pub async fn poll<S, T, V>(
    budget: &RetryBudget,
    sampler: &mut S,
    mut validate: V,
) -> std::result::Result<PollOutcome<T>, S::Error>
where
    S: Sampler + ?Sized,
    V: FnMut(&str) -> Option<T>,
{
    let mut last_value = None;

    for attempt in 1..=budget.max_attempts {
        let sample = sampler.sample(attempt).await?;

        if let Some(value) = validate(&sample) {
            debug!("Attempt {} accepted {:?}", attempt, sample);
            return Ok(PollOutcome::Success {
                value,
                attempts: attempt,
            });
        }

        if attempt < budget.max_attempts {
            warn!(
                "Attempt {}/{} read {:?}, retrying in {:?}...",
                attempt, budget.max_attempts, sample, budget.delay
            );
            tokio::time::sleep(budget.delay).await;
        } else {
            warn!(
                "Attempt {}/{} read {:?}, budget exhausted",
                attempt, budget.max_attempts, sample
            );
        }
        last_value = Some(sample);
    }

    Ok(PollOutcome::Exhausted {
        attempts: budget.max_attempts,
        last_value,
    })
}
