//! Service configuration and provider credentials.
//!
//! Every field is optional; missing values fall back to defaults. Durations
//! are expressed in milliseconds on the wire (`*_ms` keys).
//!
//! ```json
//! {
//!   "rate_limits": { "fmp": { "requests": 250, "period_ms": 86400000 } },
//!   "retry": { "max_retries": 3, "base_delay_ms": 1000 },
//!   "circuit_breaker": { "failure_threshold": 5, "recovery_timeout_ms": 60000 },
//!   "cache_mode": "use"
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Formatter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::CacheMode;
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::rate_limiter::{default_rate_limits, RateLimitConfig};
use crate::retry::RetryConfig;
use crate::{ConfigError, SourceId};

/// Tunables for a [`DataFetchingService`](crate::DataFetchingService).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Per-source overrides merged over [`default_rate_limits`].
    pub rate_limits: BTreeMap<SourceId, RateLimitConfig>,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub cache_mode: CacheMode,
}

impl ServiceConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Default rate-limit table with this config's overrides applied.
    pub fn effective_rate_limits(&self) -> BTreeMap<SourceId, RateLimitConfig> {
        let mut limits = default_rate_limits();
        limits.extend(self.rate_limits.iter().map(|(source, limit)| (*source, *limit)));
        limits
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (provider, limit) in &self.rate_limits {
            limit.validate(*provider)?;
        }
        self.retry.validate()?;
        self.circuit_breaker.validate()
    }
}

const PLACEHOLDER_KEYS: [&str; 5] = [
    "demo",
    "your_api_key",
    "your_api_key_here",
    "changeme",
    "xxx",
];

/// API keys per provider, resolved from an environment map.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    keys: BTreeMap<SourceId, String>,
}

impl Credentials {
    /// Resolve keys from `env`, preferring `FINLENS_*` names. Empty and
    /// placeholder values count as absent.
    pub fn from_env_map(env: &HashMap<String, String>) -> Self {
        let keys = SourceId::ALL
            .into_iter()
            .filter_map(|source| {
                source
                    .credential_env_keys()
                    .iter()
                    .filter_map(|name| env.get(*name))
                    .map(|value| value.trim())
                    .find(|value| is_valid_key(value))
                    .map(|value| (source, value.to_owned()))
            })
            .collect();
        Self { keys }
    }

    pub fn from_process_env() -> Self {
        Self::from_env_map(&std::env::vars().collect())
    }

    pub fn with_key(mut self, source: SourceId, key: impl Into<String>) -> Self {
        let key = key.into();
        if is_valid_key(key.trim()) {
            self.keys.insert(source, key.trim().to_owned());
        }
        self
    }

    pub fn for_source(&self, source: SourceId) -> Option<&str> {
        self.keys.get(&source).map(String::as_str)
    }

    pub fn has_any(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn configured_sources(&self) -> Vec<SourceId> {
        self.keys.keys().copied().collect()
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.keys.keys().map(|source| (source, "<redacted>")))
            .finish()
    }
}

fn is_valid_key(value: &str) -> bool {
    !value.is_empty()
        && !PLACEHOLDER_KEYS
            .iter()
            .any(|placeholder| value.eq_ignore_ascii_case(placeholder))
}

/// Serde adapter for `Duration` fields stored as integer milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
