use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;

use crate::request::TransportRequest;

/// Boxed future returned by [`Transport::call`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Value, TransportError>> + Send + 'a>>;

/// Capability injected by the embedding application: perform one upstream call
/// and return the parsed payload in canonical domain shape.
///
/// The access layer never builds HTTP requests itself; it drives a transport
/// through rate limiting, circuit breaking, retry and caching.
pub trait Transport: Send + Sync {
    fn call<'a>(&'a self, request: TransportRequest) -> TransportFuture<'a>;
}

/// Classified failure reported by a transport.
///
/// Classification data (HTTP status, network error code, message) is what the
/// retry policy inspects to decide whether another attempt is worthwhile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    message: String,
    status: Option<u16>,
    code: Option<String>,
    retry_after: Option<Duration>,
}

impl TransportError {
    /// Failure without status or code.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code: None,
            retry_after: None,
        }
    }

    /// Upstream answered with a non-success HTTP status.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::other(message)
        }
    }

    /// Network-level failure identified by a code such as `ECONNRESET`.
    pub fn network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::other(message)
        }
    }

    /// Attach the upstream's `Retry-After` hint.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub const fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// 401/403: the provider rejected our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, Some(401 | 403))
    }
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.status, &self.code) {
            (Some(status), _) => write!(f, "status {status}: {}", self.message),
            (None, Some(code)) => write!(f, "{code}: {}", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for TransportError {}
