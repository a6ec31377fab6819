//! Behavior-driven tests for the resilience primitives
//!
//! These tests verify HOW the breaker, retry loop, rate limiter and cache
//! behave on their own, driven by a paused tokio clock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use finlens_core::{
    CancelToken, CircuitBreaker, CircuitBreakerConfig, CircuitState, DataError, DataErrorKind,
    RateLimitConfig, RateLimiter, ResponseCache, RetryConfig, RetryManager, SourceId,
    TransportError,
};
use serde_json::json;

fn breaker(failure_threshold: u32, half_open_max_calls: u32) -> CircuitBreaker {
    CircuitBreaker::new(
        "fmp",
        CircuitBreakerConfig {
            failure_threshold,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls,
        },
    )
}

fn retry_manager(max_retries: u32) -> RetryManager {
    RetryManager::new(RetryConfig {
        max_retries,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(5),
        jitter_factor: 0.0,
        ..RetryConfig::default()
    })
}

async fn failing_call(calls: &AtomicUsize, error: TransportError) -> Result<(), DataError> {
    calls.fetch_add(1, Ordering::SeqCst);
    Err(error.into())
}

// =============================================================================
// Circuit Breaker: State Machine
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_threshold_failures_accumulate_breaker_opens_for_every_threshold() {
    for threshold in 1..=6 {
        // Given: A closed breaker
        let breaker = breaker(threshold, 1);

        // When: threshold - 1 failures are recorded
        for _ in 0..threshold - 1 {
            breaker.record_failure();
        }

        // Then: It stays closed until the threshold-th failure
        assert_eq!(breaker.state(), CircuitState::Closed, "threshold={threshold}");
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open, "threshold={threshold}");
    }
}

#[tokio::test(start_paused = true)]
async fn when_breaker_is_open_no_operation_runs_until_cooldown_elapses() {
    // Given: An open breaker
    let breaker = breaker(2, 1);
    breaker.record_failure();
    breaker.record_failure();
    let calls = AtomicUsize::new(0);

    // When: Calls are attempted throughout the cooldown
    for _ in 0..5 {
        tokio::time::advance(Duration::from_secs(11)).await;
        let result = breaker
            .execute(|| failing_call(&calls, TransportError::http(500, "boom")))
            .await;

        // Then: Each is refused with a wait hint and never reaches the operation
        let error = result.expect_err("open breaker refuses");
        assert_eq!(error.kind(), DataErrorKind::CircuitOpen);
        assert!(error.retry_after().is_some_and(|wait| wait <= Duration::from_secs(60)));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!breaker.can_execute());
}

#[tokio::test(start_paused = true)]
async fn when_cooldown_elapses_breaker_admits_exactly_the_probe_budget() {
    // Given: An open breaker allowing two probes
    let breaker = breaker(1, 2);
    breaker.record_failure();

    // When: The recovery timeout passes
    tokio::time::advance(Duration::from_secs(60)).await;

    // Then: The first check moves it to half-open
    assert!(breaker.can_execute());
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    // And: Two successful probes close it with a clean failure count
    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    assert!(breaker.can_execute());
    breaker.record_success();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn when_a_probe_fails_breaker_reopens_with_fresh_cooldown() {
    // Given: A half-open breaker
    let breaker = breaker(1, 3);
    breaker.record_failure();
    tokio::time::advance(Duration::from_secs(60)).await;
    assert!(breaker.can_execute());

    // When: One probe succeeds and the next fails
    breaker.record_success();
    breaker.record_failure();

    // Then: The circuit is open again and the cooldown restarts
    assert_eq!(breaker.state(), CircuitState::Open);
    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(!breaker.can_execute());
    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(breaker.can_execute());
}

#[tokio::test(start_paused = true)]
async fn when_old_failure_precedes_recent_burst_counter_does_not_decay() {
    // Given: One failure recorded a day ago
    let breaker = breaker(3, 1);
    breaker.record_failure();
    tokio::time::advance(Duration::from_secs(24 * 60 * 60)).await;
    assert_eq!(breaker.state(), CircuitState::Closed);

    // When: Two more failures arrive now (no rolling window)
    breaker.record_failure();
    breaker.record_failure();

    // Then: The simple counter opens the circuit
    assert_eq!(breaker.state(), CircuitState::Open);
    let status = breaker.status();
    assert!(status.is_open);
    assert_eq!(status.failure_count, 3);
    assert_eq!(status.total_calls, 3);
}

// =============================================================================
// Retry Manager: Backoff and Attempt Budget
// =============================================================================

#[test]
fn when_delay_is_computed_it_is_monotonic_bounded_and_above_the_floor() {
    // Given: A manager with jitter
    let manager = RetryManager::new(RetryConfig {
        base_delay: Duration::from_millis(250),
        max_delay: Duration::from_secs(10),
        jitter_factor: 0.25,
        ..RetryConfig::default()
    });

    let mut previous = Duration::ZERO;
    for attempt in 0..12 {
        // When: The delay is computed with the same jitter sample
        let delay = manager.calculate_delay_with_jitter(attempt, 0.5);

        // Then: It never shrinks, never drops under the floor, never exceeds the cap
        let floor = Duration::from_secs_f64((0.25 * 2_f64.powi(attempt as i32)).min(10.0));
        assert!(delay >= previous, "attempt={attempt}");
        assert!(delay >= floor, "attempt={attempt}");
        assert!(delay <= Duration::from_secs(10), "attempt={attempt}");
        previous = delay;
    }
}

#[tokio::test(start_paused = true)]
async fn when_errors_stay_retryable_loop_makes_max_retries_plus_one_attempts() {
    // Given: A manager allowing three retries
    let manager = retry_manager(3);
    let calls = AtomicUsize::new(0);
    let started = tokio::time::Instant::now();

    // When: Every attempt fails with a 503
    let result = manager
        .execute_with_retry(
            || failing_call(&calls, TransportError::http(503, "unavailable")),
            "company profile AAPL",
            &CancelToken::new(),
        )
        .await;

    // Then: Four attempts were made and only the three backoffs were slept
    assert_eq!(result.expect_err("exhausted").kind(), DataErrorKind::Transport);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(started.elapsed(), Duration::from_millis(100 + 200 + 400));
}

#[tokio::test(start_paused = true)]
async fn when_error_is_fatal_loop_stops_without_sleeping() {
    // Given: A manager with retries available
    let manager = retry_manager(5);

    for status in [400, 401, 403, 404] {
        let calls = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();

        // When: The upstream answers with a client error
        let result = manager
            .execute_with_retry(
                || failing_call(&calls, TransportError::http(status, "client error")),
                "market data AAPL",
                &CancelToken::new(),
            )
            .await;

        // Then: Exactly one attempt, no sleep
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "status={status}");
        assert_eq!(started.elapsed(), Duration::ZERO, "status={status}");
    }
}

#[tokio::test(start_paused = true)]
async fn when_transient_failure_clears_loop_returns_the_value() {
    // Given: An upstream that resets the connection twice
    let manager = retry_manager(3);
    let calls = AtomicUsize::new(0);

    // When: The third attempt succeeds
    let result = manager
        .execute_with_retry(
            || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(TransportError::network("ECONNRESET", "connection reset").into())
                    } else {
                        Ok("payload")
                    }
                }
            },
            "peer comparables AAPL",
            &CancelToken::new(),
        )
        .await;

    // Then: The value is returned after three attempts
    assert_eq!(result.expect("recovered"), "payload");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn when_cancelled_during_backoff_loop_returns_cancelled_without_more_attempts() {
    // Given: A long backoff and a cancellation token
    let manager = RetryManager::new(RetryConfig {
        max_retries: 3,
        base_delay: Duration::from_secs(10),
        max_delay: Duration::from_secs(30),
        jitter_factor: 0.0,
        ..RetryConfig::default()
    });
    let calls = AtomicUsize::new(0);
    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    // When: The first attempt fails and the loop starts sleeping
    let started = tokio::time::Instant::now();
    let result = manager
        .execute_with_retry(
            || failing_call(&calls, TransportError::http(502, "bad gateway")),
            "financial statements AAPL",
            &cancel,
        )
        .await;

    // Then: The sleep is cut short and no further attempt is made
    assert_eq!(result.expect_err("cancelled").kind(), DataErrorKind::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(10));
}

// =============================================================================
// Rate Limiter: Sliding Window
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_five_per_minute_is_exhausted_sixth_call_waits_for_the_oldest_to_slide_out() {
    // Given: A limiter allowing five calls per minute
    let limiter = RateLimiter::new(BTreeMap::from([(
        SourceId::AlphaVantage,
        RateLimitConfig::new(5, Duration::from_secs(60)),
    )]))
    .expect("valid limits");

    // When: Five calls are spread over ten seconds
    for _ in 0..5 {
        limiter.check(SourceId::AlphaVantage).expect("within budget");
        tokio::time::advance(Duration::from_secs(2)).await;
    }

    // Then: The sixth is rejected with the time left on the oldest entry
    let error = limiter
        .check(SourceId::AlphaVantage)
        .expect_err("sixth call rejected");
    assert_eq!(error.kind(), DataErrorKind::RateLimited);
    assert_eq!(error.retry_after(), Some(Duration::from_secs(50)));

    // And: Once the oldest entry slides out, a sixth call is admitted
    tokio::time::advance(Duration::from_secs(50)).await;
    assert!(limiter.check(SourceId::AlphaVantage).is_ok());
    assert!(limiter.check(SourceId::AlphaVantage).is_err());
}

#[tokio::test(start_paused = true)]
async fn when_one_source_is_throttled_other_sources_are_unaffected() {
    // Given: Two sources with tight budgets
    let limiter = RateLimiter::new(BTreeMap::from([
        (SourceId::Polygon, RateLimitConfig::new(1, Duration::from_secs(60))),
        (SourceId::Yahoo, RateLimitConfig::new(1, Duration::from_secs(60))),
    ]))
    .expect("valid limits");

    // When: Polygon exhausts its budget
    limiter.check(SourceId::Polygon).expect("first polygon call");
    assert!(limiter.check(SourceId::Polygon).is_err());

    // Then: Yahoo still has its own budget
    assert!(limiter.check(SourceId::Yahoo).is_ok());
    let status = limiter.status();
    assert_eq!(status[&SourceId::Polygon].remaining, 0);
    assert_eq!(status[&SourceId::Yahoo].remaining, 0);
}

// =============================================================================
// Response Cache: TTL
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_ttl_passes_cached_value_is_gone_and_purge_reclaims_the_rest() {
    // Given: Two entries with different TTLs
    let cache = ResponseCache::new();
    cache
        .set("market_data:AAPL", json!({ "price": 190.0 }), Duration::from_secs(15 * 60))
        .await;
    cache
        .set("company_profile:AAPL", json!({ "name": "Apple" }), Duration::from_secs(24 * 3600))
        .await;

    // When: The shorter TTL elapses
    tokio::time::advance(Duration::from_secs(15 * 60 + 1)).await;

    // Then: Only the long-lived entry survives a purge
    assert_eq!(cache.purge_expired().await, 1);
    assert!(cache.get("market_data:AAPL").await.is_none());
    assert_eq!(
        cache.get("company_profile:AAPL").await,
        Some(json!({ "name": "Apple" }))
    );
}
