use std::fmt::{Display, Formatter};

use finlens_core::{DataError, DataErrorKind, ServiceMode};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Request identifier (UUID v4) for correlating output with logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Structured error carried in the envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeError {
    pub code: &'static str,
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl From<&DataError> for EnvelopeError {
    fn from(error: &DataError) -> Self {
        Self {
            code: error.root_cause().code(),
            kind: kind_label(error.kind()),
            message: error.to_string(),
            retry_after_ms: error.retry_after().map(|wait| wait.as_millis() as u64),
        }
    }
}

/// Output document written to stdout for every command.
///
/// Field order is fixed to keep deterministic JSON serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub request_id: RequestId,
    pub mode: ServiceMode,
    pub data: Value,
    pub error: Option<EnvelopeError>,
    pub latency_ms: u64,
    #[serde(skip)]
    error_kind: Option<DataErrorKind>,
}

impl Envelope {
    pub fn from_result(
        mode: ServiceMode,
        result: Result<Value, DataError>,
        latency_ms: u64,
    ) -> Self {
        let (data, error, error_kind) = match result {
            Ok(data) => (data, None, None),
            Err(error) => (
                Value::Null,
                Some(EnvelopeError::from(&error)),
                Some(error.kind()),
            ),
        };
        Self {
            request_id: RequestId::new_v4(),
            mode,
            data,
            error,
            latency_ms,
            error_kind,
        }
    }

    /// 0 on success, 2 for rejected input, 3 for any other failed fetch.
    pub fn exit_code(&self) -> u8 {
        match self.error_kind {
            None => 0,
            Some(DataErrorKind::InvalidRequest) => 2,
            Some(_) => 3,
        }
    }
}

fn kind_label(kind: DataErrorKind) -> &'static str {
    match kind {
        DataErrorKind::RateLimited => "rate_limited",
        DataErrorKind::CircuitOpen => "circuit_open",
        DataErrorKind::Transport => "transport",
        DataErrorKind::Cancelled => "cancelled",
        DataErrorKind::InvalidRequest => "invalid_request",
        DataErrorKind::Decode => "decode",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finlens_core::{Operation, SourceId, TransportError, ValidationError};
    use std::time::Duration;

    #[test]
    fn success_envelope_has_null_error_and_exit_zero() {
        let envelope = Envelope::from_result(
            ServiceMode::Demo,
            Ok(serde_json::json!({ "ticker": "AAPL" })),
            12,
        );

        assert_eq!(envelope.exit_code(), 0);
        let rendered = serde_json::to_value(&envelope).expect("serializable");
        assert_eq!(rendered["mode"], "demo");
        assert_eq!(rendered["error"], Value::Null);
        assert_eq!(rendered["latency_ms"], 12);
        assert!(rendered.get("error_kind").is_none());
    }

    #[test]
    fn rate_limited_fetch_maps_to_exit_three_with_wait_hint() {
        let error = DataError::fetch(
            Operation::MarketData,
            DataError::RateLimitExceeded {
                provider: SourceId::Yahoo,
                retry_after: Duration::from_millis(750),
            },
        );
        let envelope = Envelope::from_result(ServiceMode::Live, Err(error), 0);

        assert_eq!(envelope.exit_code(), 3);
        let error = envelope.error.expect("error present");
        assert_eq!(error.code, "data.rate_limited");
        assert_eq!(error.kind, "rate_limited");
        assert_eq!(error.retry_after_ms, Some(750));
        assert!(error.message.starts_with("Failed to fetch market data:"));
    }

    #[test]
    fn invalid_input_maps_to_exit_two() {
        let error = DataError::fetch(
            Operation::CompanyProfile,
            DataError::from(ValidationError::EmptyTicker),
        );
        let envelope = Envelope::from_result(ServiceMode::Demo, Err(error), 0);
        assert_eq!(envelope.exit_code(), 2);

        let transport = DataError::fetch(
            Operation::CompanyProfile,
            DataError::from(TransportError::http(500, "boom")),
        );
        assert_eq!(Envelope::from_result(ServiceMode::Live, Err(transport), 0).exit_code(), 3);
    }
}
