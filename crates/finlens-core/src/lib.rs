//! # Finlens Core
//!
//! Resilient remote-data access layer for the Finlens financial-analysis toolkit.
//!
//! ## Overview
//!
//! This crate fetches company profiles, financial statements, market data and
//! peer comparables from several third-party providers. Every call goes through:
//!
//! - **Rate limiting** with a per-source sliding window
//! - **Circuit breaking** to isolate a failing provider
//! - **Retry** with exponential backoff and jitter
//! - **Caching** with per-operation TTLs
//!
//! Without API keys the service runs in demo mode and serves deterministic
//! mock data.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | TTL response cache and cache modes |
//! | [`cancel`] | Cancellation tokens for in-flight fetches |
//! | [`circuit_breaker`] | Circuit breaker for resilient calls |
//! | [`config`] | Service configuration and credentials |
//! | [`domain`] | Domain models (CompanyProfile, StatementPeriod, MarketSnapshot, PeerRecord) |
//! | [`error`] | Core error types |
//! | [`mock`] | Deterministic demo-mode provider |
//! | [`rate_limiter`] | Sliding-window request throttling |
//! | [`request`] | Operations and transport request envelope |
//! | [`retry`] | Backoff calculation and retry loop |
//! | [`service`] | The [`DataFetchingService`] façade |
//! | [`source`] | Provider identifiers |
//! | [`transport`] | Transport capability trait |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use finlens_core::{DataFetchingService, MarketRange};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // No credentials: demo mode
//!     let service = DataFetchingService::builder().build()?;
//!
//!     let snapshot = service.fetch_market_data("AAPL", MarketRange::OneMonth).await?;
//!     println!("AAPL price: ${:.2}", snapshot.price);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  CLI / UI           │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐     ┌──────────────────┐
//! │ DataFetchingService │────▶│ ResponseCache    │
//! └──────────┬──────────┘     └──────────────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐     ┌──────────────────┐
//! │ RateLimiter         │────▶│ CircuitBreaker   │
//! └─────────────────────┘     └────────┬─────────┘
//!                                      │
//!                                      ▼
//! ┌─────────────────────┐     ┌──────────────────┐
//! │ Transport           │◀────│ RetryManager     │
//! │ (live / mock)       │     └──────────────────┘
//! └─────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Every fetch returns `Result<T, DataError>`. Branch on the kind, never on
//! the message:
//!
//! ```rust
//! use finlens_core::{DataError, DataErrorKind};
//!
//! fn handle_error(error: &DataError) {
//!     match error.kind() {
//!         DataErrorKind::RateLimited | DataErrorKind::CircuitOpen => {
//!             // Try later; error.retry_after() carries the hint
//!         }
//!         DataErrorKind::InvalidRequest => {
//!             // Report to user
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - API keys are read from the environment map only and never logged
//! - `Credentials` and `TransportRequest` redact keys in `Debug` output

pub mod cache;
pub mod cancel;
pub mod circuit_breaker;
pub mod config;
pub mod domain;
pub mod error;
pub mod mock;
pub mod rate_limiter;
pub mod request;
pub mod retry;
pub mod service;
pub mod source;
pub mod transport;

// Caching
pub use cache::{CacheMode, CacheStats, ResponseCache};

// Cancellation
pub use cancel::CancelToken;

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStatus, CircuitState};

// Configuration
pub use config::{Credentials, ServiceConfig};

// Domain models
pub use domain::{
    CompanyProfile, MarketRange, MarketSnapshot, PeerRecord, PricePoint, ReportingPeriod,
    StatementPeriod, StatementType, Ticker, UtcDateTime,
};

// Error types
pub use error::{ConfigError, DataError, DataErrorKind, ValidationError};

// Demo provider
pub use mock::MockDataProvider;

// Throttling
pub use rate_limiter::{default_rate_limits, RateLimitConfig, RateLimitStatus, RateLimiter};

// Requests
pub use request::{FetchQuery, Operation, TransportRequest};

// Retry logic
pub use retry::{RetryConfig, RetryManager};

// Service façade
pub use service::{DataFetchingService, DataFetchingServiceBuilder, ServiceMode, ServiceStatus};

// Source identifiers
pub use source::SourceId;

// Transport capability
pub use transport::{Transport, TransportError, TransportFuture};
