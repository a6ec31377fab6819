//! Shared fixtures for the behavior suites.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use finlens_core::{
    CircuitBreakerConfig, Credentials, DataFetchingService, MockDataProvider, RetryConfig,
    ServiceConfig, SourceId, Transport, TransportError, TransportFuture, TransportRequest,
};
use serde_json::Value;

/// One scripted transport outcome.
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer with the canonical demo payload for the request.
    Mock,
    /// Answer with a raw payload.
    Respond(Value),
    Fail(TransportError),
    /// Wait, then answer with the demo payload.
    Delayed(Duration),
    /// Never answer.
    Hang,
}

/// Transport replaying a queue of outcomes and counting calls.
///
/// Once the script runs out every call answers with demo data.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        })
    }

    /// Every call answers with demo data.
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The first `times` calls fail with `error`.
    pub fn failing(error: TransportError, times: usize) -> Arc<Self> {
        Self::new(std::iter::repeat(Step::Fail(error)).take(times))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn push(&self, step: Step) {
        self.script.lock().expect("script lock").push_back(step);
    }
}

impl Transport for ScriptedTransport {
    fn call<'a>(&'a self, request: TransportRequest) -> TransportFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().expect("requests lock").push(request.clone());
        let step = self
            .script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(Step::Mock);

        Box::pin(async move {
            match step {
                Step::Mock => MockDataProvider::new().call(request).await,
                Step::Respond(value) => Ok(value),
                Step::Fail(error) => Err(error),
                Step::Delayed(delay) => {
                    tokio::time::sleep(delay).await;
                    MockDataProvider::new().call(request).await
                }
                Step::Hang => std::future::pending().await,
            }
        })
    }
}

/// Credentials for every keyed provider, which puts the service in live mode.
pub fn live_credentials() -> Credentials {
    Credentials::default()
        .with_key(SourceId::FinancialModelingPrep, "fmp-test-key")
        .with_key(SourceId::AlphaVantage, "av-test-key")
        .with_key(SourceId::Polygon, "polygon-test-key")
}

/// Fast, jitter-free retries and a small breaker threshold.
pub fn test_config(max_retries: u32, failure_threshold: u32) -> ServiceConfig {
    ServiceConfig {
        retry: RetryConfig {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            jitter_factor: 0.0,
            ..RetryConfig::default()
        },
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold,
            recovery_timeout: Duration::from_secs(30),
            half_open_max_calls: 2,
        },
        ..ServiceConfig::default()
    }
}

pub fn live_service(
    transport: Arc<ScriptedTransport>,
    config: ServiceConfig,
) -> DataFetchingService {
    DataFetchingService::builder()
        .with_credentials(live_credentials())
        .with_config(config)
        .with_transport(transport)
        .build()
        .expect("valid live service")
}
