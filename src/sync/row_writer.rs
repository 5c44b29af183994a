//! Appends response rows with bounded exponential backoff.
//!
//! Retries only transient failures:
//! - 429 rate limiting and 500 server errors
//! - errors whose message mentions "quota" or "rate limit"
//!
//! Everything else fails on the first attempt. Each call appends a new row;
//! there is no deduplication.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::attendance::ResponseRow;
use crate::sync::sheets_api::{SheetsApi, SheetsError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

#[derive(Debug, Error)]
#[error("Writing response row failed after {attempts} attempt(s): {source}")]
pub struct TerminalWriteError {
    pub attempts: u32,
    #[source]
    pub source: SheetsError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }

    pub fn no_retry() -> Self {
        Self::new(1, DEFAULT_BASE_DELAY_MS)
    }

    /// Wait before attempt `attempt` (1-based): `base_delay * 2^(attempt-1)`.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

pub fn is_retryable(error: &SheetsError) -> RetryDecision {
    if matches!(error.status(), Some(429) | Some(500)) {
        return RetryDecision::Retry;
    }

    let message = error.message();
    if message.contains("quota") || message.contains("rate limit") {
        return RetryDecision::Retry;
    }

    RetryDecision::NoRetry
}

pub struct RowWriter {
    sheets: Arc<dyn SheetsApi>,
    spreadsheet_id: String,
    range: String,
    policy: RetryPolicy,
}

impl RowWriter {
    pub fn new(
        sheets: Arc<dyn SheetsApi>,
        spreadsheet_id: String,
        range: String,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            sheets,
            spreadsheet_id,
            range,
            policy,
        }
    }

    pub async fn append(&self, row: &ResponseRow) -> Result<(), TerminalWriteError> {
        let cells = row.cells();
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            if attempt > 1 {
                let delay = self.policy.delay_before(attempt);
                tracing::info!("Retry attempt {} of {}, waiting {:?}", attempt, max_attempts, delay);
                tokio::time::sleep(delay).await;
            }

            let error = match self.sheets.append_row(&self.spreadsheet_id, &self.range, &cells).await {
                Ok(()) => {
                    if attempt > 1 {
                        tracing::info!("Response row written after {} attempts", attempt);
                    }
                    return Ok(());
                }
                Err(error) => error,
            };

            tracing::error!(
                attempt,
                max_attempts,
                status = ?error.status(),
                "Error writing to sheet: {}",
                error
            );

            if attempt >= max_attempts || is_retryable(&error) == RetryDecision::NoRetry {
                return Err(TerminalWriteError {
                    attempts: attempt,
                    source: error,
                });
            }
        }
    }
}
