//! Retry logic with exponential backoff and jitter.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::config::duration_ms;
use crate::{ConfigError, DataError};

/// Configuration for the automatic retry mechanism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// The maximum number of retries to attempt.
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry, before jitter.
    #[serde(rename = "base_delay_ms", with = "duration_ms")]
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    pub max_delay: Duration,
    /// Multiplicative growth per attempt.
    pub exponential_base: f64,
    /// Fraction of the delay added as random jitter, in `[0, 1]`.
    pub jitter_factor: f64,
    /// HTTP status codes that should trigger a retry.
    pub retryable_status_codes: BTreeSet<u16>,
    /// Network error codes that should trigger a retry.
    pub retryable_error_codes: BTreeSet<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
            jitter_factor: 0.1,
            retryable_status_codes: BTreeSet::from([408, 429, 500, 502, 503, 504]),
            retryable_error_codes: [
                "ECONNRESET",
                "ECONNREFUSED",
                "ENOTFOUND",
                "ETIMEDOUT",
                "ECONNABORTED",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl RetryConfig {
    /// Disable retries: one attempt only.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.exponential_base >= 1.0 && self.exponential_base.is_finite()) {
            return Err(ConfigError::InvalidExponentialBase {
                value: self.exponential_base,
            });
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ConfigError::InvalidJitterFactor {
                value: self.jitter_factor,
            });
        }
        if self.base_delay > self.max_delay {
            return Err(ConfigError::BaseDelayExceedsMax {
                base_ms: self.base_delay.as_millis(),
                max_ms: self.max_delay.as_millis(),
            });
        }
        Ok(())
    }
}

/// Backoff calculator and retry-loop driver.
#[derive(Debug, Clone)]
pub struct RetryManager {
    config: RetryConfig,
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryManager {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay before retrying after the 0-based `attempt` failed.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.calculate_delay_with_jitter(attempt, fastrand::f64())
    }

    /// Deterministic form of [`calculate_delay`](Self::calculate_delay);
    /// `sample` is clamped to `[0, 1]`.
    ///
    /// `min(max_delay, base_delay * exponential_base^attempt * (1 + jitter_factor * sample))`
    pub fn calculate_delay_with_jitter(&self, attempt: u32, sample: f64) -> Duration {
        let sample = sample.clamp(0.0, 1.0);
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scale = self.config.exponential_base.powi(exponent);
        let jitter = 1.0 + self.config.jitter_factor * sample;
        let seconds = self.config.base_delay.as_secs_f64() * scale * jitter;
        let capped = seconds.min(self.config.max_delay.as_secs_f64());

        if capped.is_finite() {
            Duration::from_secs_f64(capped)
        } else {
            self.config.max_delay
        }
    }

    /// Whether `error` is a transient upstream failure worth another attempt.
    ///
    /// Only transport errors qualify; rate-limit and circuit-open rejections
    /// mean "try later", not "try again now".
    pub fn is_retryable_error(&self, error: &DataError) -> bool {
        let Some(transport) = error.transport_error() else {
            return false;
        };

        if let Some(status) = transport.status() {
            if self.config.retryable_status_codes.contains(&status) {
                return true;
            }
        }
        if let Some(code) = transport.code() {
            if self.config.retryable_error_codes.contains(code) {
                return true;
            }
        }
        transport.message().to_ascii_lowercase().contains("timeout")
    }

    /// Run `operation` until it succeeds, fails fatally, or the retry budget is
    /// spent. At most `max_retries + 1` attempts are made; there is no sleep
    /// after a non-retryable or final failure.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        mut operation: F,
        label: &str,
        cancel: &CancelToken,
    ) -> Result<T, DataError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DataError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(DataError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DataError::Cancelled),
                outcome = operation() => outcome,
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            operation = label,
                            attempts = attempt + 1,
                            "succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if attempt >= self.config.max_retries || !self.is_retryable_error(&error) {
                return Err(error);
            }

            let delay = self.delay_for(&error, attempt);
            tracing::warn!(
                operation = label,
                attempt = attempt + 1,
                max_attempts = self.config.max_retries + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed; retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(DataError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    fn delay_for(&self, error: &DataError, attempt: u32) -> Duration {
        let calculated = self.calculate_delay(attempt);
        match error.retry_after() {
            Some(hint) => calculated.max(hint).min(self.config.max_delay),
            None => calculated,
        }
    }
}
