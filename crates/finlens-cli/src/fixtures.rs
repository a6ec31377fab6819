//! File-backed transport for replaying recorded provider payloads.
//!
//! Layout: `<root>/<source>/<operation>/<TICKER>.json`, for example
//! `fixtures/fmp/company_profile/AAPL.json`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use finlens_core::{Transport, TransportError, TransportFuture, TransportRequest};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FixtureTransport {
    root: PathBuf,
}

impl FixtureTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn fixture_path(&self, request: &TransportRequest) -> PathBuf {
        self.root
            .join(request.source.as_str())
            .join(request.operation().as_str())
            .join(format!("{}.json", request.query.ticker().as_str()))
    }

    async fn load(path: &Path) -> Result<Value, TransportError> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(TransportError::http(
                    404,
                    format!("no fixture at {}", path.display()),
                ));
            }
            Err(error) => {
                return Err(TransportError::other(format!(
                    "failed to read fixture {}: {error}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&raw).map_err(|error| {
            TransportError::other(format!("invalid fixture json {}: {error}", path.display()))
        })
    }
}

impl Transport for FixtureTransport {
    fn call<'a>(&'a self, request: TransportRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            let path = self.fixture_path(&request);
            debug!(request_id = %request.request_id, path = %path.display(), "loading fixture");
            Self::load(&path).await
        })
    }
}
