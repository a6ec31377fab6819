use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::duration_ms;
use crate::{ConfigError, DataError, UtcDateTime};

/// Runtime circuit state for one upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Failures while closed before the circuit opens.
    pub failure_threshold: u32,
    /// Cooldown after the last failure before a probe is allowed.
    #[serde(rename = "recovery_timeout_ms", with = "duration_ms")]
    pub recovery_timeout: Duration,
    /// Successful probes required to close from half-open.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if self.half_open_max_calls == 0 {
            return Err(ConfigError::ZeroHalfOpenCalls);
        }
        Ok(())
    }
}

/// Introspection snapshot of a breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitBreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u64,
    pub total_calls: u64,
    /// `failure_count / total_calls`; diagnostic only.
    pub failure_rate: f64,
    pub is_open: bool,
    /// Earliest wall-clock time a probe will be admitted, while open.
    pub next_retry_at: Option<UtcDateTime>,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u64,
    total_calls: u64,
    last_failure_time: Option<Instant>,
    half_open_calls: u32,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            total_calls: 0,
            last_failure_time: None,
            half_open_calls: 0,
        }
    }
}

impl CircuitInner {
    fn remaining_cooldown(&self, recovery_timeout: Duration, now: Instant) -> Duration {
        self.last_failure_time
            .map(|failed_at| {
                recovery_timeout.saturating_sub(now.saturating_duration_since(failed_at))
            })
            .unwrap_or(Duration::ZERO)
    }
}

/// Thread-safe failure-isolation state machine for one upstream source.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Whether a call may proceed now. Moves an open circuit to half-open once
    /// the recovery timeout has elapsed.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => inner.half_open_calls < self.config.half_open_max_calls,
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure_time
                    .map(|failed_at| failed_at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(false);

                if cooled_down {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_calls = 0;
                    tracing::info!(
                        breaker = %self.name,
                        "circuit breaker half-open; probing upstream"
                    );
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.success_count = inner.success_count.saturating_add(1);
        inner.total_calls = inner.total_calls.saturating_add(1);

        match inner.state {
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::HalfOpen => {
                inner.half_open_calls = inner.half_open_calls.saturating_add(1);
                if inner.half_open_calls >= self.config.half_open_max_calls {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.half_open_calls = 0;
                    tracing::info!(breaker = %self.name, "circuit breaker closed");
                }
            }
            // A call admitted before the circuit opened; it does not close it.
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.total_calls = inner.total_calls.saturating_add(1);
        inner.last_failure_time = Some(Instant::now());

        match inner.state {
            CircuitState::Closed if inner.failure_count >= self.config.failure_threshold => {
                inner.state = CircuitState::Open;
                tracing::warn!(
                    breaker = %self.name,
                    failures = inner.failure_count,
                    recovery_timeout_ms = self.config.recovery_timeout.as_millis() as u64,
                    "circuit breaker opened"
                );
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.half_open_calls = 0;
                tracing::warn!(breaker = %self.name, "probe failed; circuit breaker reopened");
            }
            CircuitState::Closed | CircuitState::Open => {}
        }
    }

    /// Run `operation` under the breaker.
    ///
    /// Fails fast with [`DataError::CircuitOpen`] without invoking `operation`
    /// when the circuit refuses the call. Cancellation and rejected
    /// credentials (401/403) are not counted as upstream failures.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, DataError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DataError>>,
    {
        if !self.can_execute() {
            let retry_in = {
                let inner = self.lock();
                inner.remaining_cooldown(self.config.recovery_timeout, Instant::now())
            };
            return Err(DataError::CircuitOpen {
                breaker: self.name.clone(),
                retry_in,
            });
        }

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(DataError::Cancelled) => Err(DataError::Cancelled),
            Err(error) if error.is_auth_failure() => Err(error),
            Err(error) => {
                self.record_failure();
                Err(error)
            }
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    pub fn status(&self) -> CircuitBreakerStatus {
        let inner = self.lock();
        let is_open = inner.state == CircuitState::Open;
        let failure_rate = if inner.total_calls == 0 {
            0.0
        } else {
            f64::from(inner.failure_count) / inner.total_calls as f64
        };
        let next_retry_at = is_open.then(|| {
            UtcDateTime::now_plus(
                inner.remaining_cooldown(self.config.recovery_timeout, Instant::now()),
            )
        });

        CircuitBreakerStatus {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            total_calls: inner.total_calls,
            failure_rate,
            is_open,
            next_retry_at,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CircuitInner> {
        self.inner
            .lock()
            .expect("circuit breaker lock is not poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportError;

    fn breaker(
        failure_threshold: u32,
        recovery_timeout: Duration,
        half_open_max_calls: u32,
    ) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold,
                recovery_timeout,
                half_open_max_calls,
            },
        )
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = breaker(2, Duration::from_secs(10), 1);

        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn success_while_closed_resets_failure_count() {
        let breaker = breaker(3, Duration::from_secs(10), 1);

        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transitions_to_half_open_after_timeout_then_closes_on_probe_successes() {
        let breaker = breaker(1, Duration::from_secs(30), 2);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_failure_reopens_and_restarts_cooldown() {
        let breaker = breaker(1, Duration::from_secs(30), 3);
        breaker.record_failure();
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(breaker.can_execute());

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!breaker.can_execute());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(breaker.can_execute());
    }

    #[tokio::test]
    async fn execute_fails_fast_without_invoking_operation() {
        let breaker = breaker(1, Duration::from_secs(60), 1);
        breaker.record_failure();

        let mut invoked = false;
        let result: Result<(), DataError> = breaker
            .execute(|| {
                invoked = true;
                async { Ok(()) }
            })
            .await;

        assert!(!invoked);
        match result {
            Err(DataError::CircuitOpen { breaker, retry_in }) => {
                assert_eq!(breaker, "test");
                assert!(retry_in <= Duration::from_secs(60));
            }
            other => panic!("expected CircuitOpen, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_records_outcomes_and_propagates_original_error() {
        let breaker = breaker(5, Duration::from_secs(60), 1);

        let ok: Result<u8, DataError> = breaker.execute(|| async { Ok(7) }).await;
        assert_eq!(ok.expect("success"), 7);

        let err: Result<u8, DataError> = breaker
            .execute(|| async { Err(TransportError::http(500, "boom").into()) })
            .await;
        let err = err.expect_err("failure");
        assert_eq!(err.to_string(), "status 500: boom");

        let status = breaker.status();
        assert_eq!(status.success_count, 1);
        assert_eq!(status.total_calls, 2);
        assert_eq!(status.failure_count, 1);
        assert!((status.failure_rate - 0.5).abs() < f64::EPSILON);
        assert!(!status.is_open);
        assert!(status.next_retry_at.is_none());
    }

    #[tokio::test]
    async fn cancellation_is_not_recorded_as_failure() {
        let breaker = breaker(1, Duration::from_secs(60), 1);

        let result: Result<(), DataError> =
            breaker.execute(|| async { Err(DataError::Cancelled) }).await;

        assert!(matches!(result, Err(DataError::Cancelled)));
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.status().total_calls, 0);
    }

    #[tokio::test]
    async fn rejected_credentials_are_not_recorded_as_failure() {
        let breaker = breaker(1, Duration::from_secs(60), 1);

        for _ in 0..3 {
            let result: Result<(), DataError> = breaker
                .execute(|| async {
                    Err(DataError::from(TransportError::http(401, "invalid api key")))
                })
                .await;
            assert!(result.is_err());
        }

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn open_status_reports_next_retry_time() {
        let breaker = breaker(1, Duration::from_secs(120), 1);
        breaker.record_failure();

        let status = breaker.status();
        assert!(status.is_open);
        let next = status.next_retry_at.expect("open breaker has retry time");
        assert!(next > UtcDateTime::now());
    }

    #[test]
    fn config_validation_rejects_zero_values() {
        let config = CircuitBreakerConfig {
            half_open_max_calls: 0,
            ..CircuitBreakerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroHalfOpenCalls)));
    }
}
