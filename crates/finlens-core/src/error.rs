use std::time::Duration;

use thiserror::Error;

use crate::request::Operation;
use crate::source::SourceId;
use crate::transport::TransportError;

/// Validation errors for user-supplied identifiers and parameters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker must start with an ASCII letter or digit: '{ch}'")]
    TickerInvalidStart { ch: char },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("invalid statement type '{value}', expected one of income, balance, cashflow")]
    InvalidStatementType { value: String },
    #[error("invalid reporting period '{value}', expected annual or quarterly")]
    InvalidReportingPeriod { value: String },
    #[error(
        "invalid market range '{value}', expected one of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max"
    )]
    InvalidMarketRange { value: String },
    #[error("invalid source '{value}', expected one of alpha_vantage, fmp, polygon, yahoo")]
    InvalidSource { value: String },

    #[error("statement limit must be greater than zero")]
    ZeroStatementLimit,

    #[error("timestamp must be RFC3339: '{value}'")]
    InvalidTimestamp { value: String },
}

/// Errors raised while building a [`DataFetchingService`](crate::DataFetchingService).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("rate limit for '{provider}' must allow at least one request")]
    ZeroRateLimit { provider: SourceId },
    #[error("rate limit period for '{provider}' must be greater than zero")]
    ZeroRatePeriod { provider: SourceId },

    #[error("circuit breaker failure_threshold must be greater than zero")]
    ZeroFailureThreshold,
    #[error("circuit breaker half_open_max_calls must be greater than zero")]
    ZeroHalfOpenCalls,

    #[error("retry exponential_base must be >= 1.0, got {value}")]
    InvalidExponentialBase { value: f64 },
    #[error("retry jitter_factor must be within [0, 1], got {value}")]
    InvalidJitterFactor { value: f64 },
    #[error("retry base_delay ({base_ms}ms) exceeds max_delay ({max_ms}ms)")]
    BaseDelayExceedsMax { base_ms: u128, max_ms: u128 },

    #[error("live mode requires a transport; none was supplied")]
    MissingTransport,

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Coarse classification callers branch on (UI banners, CLI exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataErrorKind {
    RateLimited,
    CircuitOpen,
    Transport,
    Cancelled,
    InvalidRequest,
    Decode,
}

/// Error returned by every fetch on the access layer.
#[derive(Debug, Error)]
pub enum DataError {
    /// Pre-flight rejection; the transport was never reached.
    #[error("rate limit exceeded for {provider}; retry in {}ms", retry_after.as_millis())]
    RateLimitExceeded {
        provider: SourceId,
        retry_after: Duration,
    },

    /// Pre-flight rejection by an open circuit breaker.
    #[error("circuit breaker '{breaker}' is open; retry in {}ms", retry_in.as_millis())]
    CircuitOpen { breaker: String, retry_in: Duration },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to decode {operation} payload: {error}")]
    Decode {
        operation: Operation,
        #[source]
        error: serde_json::Error,
    },

    #[error("Failed to fetch {operation}: {cause}")]
    Fetch {
        operation: Operation,
        #[source]
        cause: Box<DataError>,
    },
}

impl DataError {
    pub fn fetch(operation: Operation, cause: DataError) -> Self {
        Self::Fetch {
            operation,
            cause: Box::new(cause),
        }
    }

    pub fn kind(&self) -> DataErrorKind {
        match self {
            Self::RateLimitExceeded { .. } => DataErrorKind::RateLimited,
            Self::CircuitOpen { .. } => DataErrorKind::CircuitOpen,
            Self::Transport(_) => DataErrorKind::Transport,
            Self::Cancelled => DataErrorKind::Cancelled,
            Self::Validation(_) => DataErrorKind::InvalidRequest,
            Self::Decode { .. } => DataErrorKind::Decode,
            Self::Fetch { cause, .. } => cause.kind(),
        }
    }

    /// Innermost error, skipping operation context wrappers.
    pub fn root_cause(&self) -> &DataError {
        match self {
            Self::Fetch { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Transport error at the root of this error, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self.root_cause() {
            Self::Transport(error) => Some(error),
            _ => None,
        }
    }

    /// The provider rejected our credentials (401/403).
    pub fn is_auth_failure(&self) -> bool {
        self.transport_error()
            .is_some_and(TransportError::is_auth_failure)
    }

    /// Wait hint for "try later" errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self.root_cause() {
            Self::RateLimitExceeded { retry_after, .. } => Some(*retry_after),
            Self::CircuitOpen { retry_in, .. } => Some(*retry_in),
            Self::Transport(error) => error.retry_after(),
            _ => None,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded { .. } => "data.rate_limited",
            Self::CircuitOpen { .. } => "data.circuit_open",
            Self::Transport(_) => "data.transport",
            Self::Cancelled => "data.cancelled",
            Self::Validation(_) => "data.invalid_request",
            Self::Decode { .. } => "data.decode",
            Self::Fetch { .. } => "data.fetch_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_wrapper_exposes_cause_kind_and_prefix() {
        let error = DataError::fetch(
            Operation::CompanyProfile,
            DataError::CircuitOpen {
                breaker: String::from("fmp"),
                retry_in: Duration::from_secs(12),
            },
        );

        assert_eq!(error.kind(), DataErrorKind::CircuitOpen);
        assert_eq!(error.retry_after(), Some(Duration::from_secs(12)));
        assert!(error
            .to_string()
            .starts_with("Failed to fetch company profile: circuit breaker 'fmp' is open"));
    }

    #[test]
    fn transport_root_is_reachable_through_wrapper() {
        let error = DataError::fetch(
            Operation::MarketData,
            DataError::from(TransportError::http(503, "service unavailable")),
        );

        assert_eq!(error.kind(), DataErrorKind::Transport);
        assert_eq!(error.transport_error().and_then(TransportError::status), Some(503));
    }
}
