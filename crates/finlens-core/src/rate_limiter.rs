use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::config::duration_ms;
use crate::{ConfigError, DataError, SourceId};

/// Request budget for one source: at most `requests` calls per sliding `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests: u32,
    #[serde(rename = "period_ms", with = "duration_ms")]
    pub period: Duration,
}

impl RateLimitConfig {
    pub const fn new(requests: u32, period: Duration) -> Self {
        Self { requests, period }
    }

    pub fn validate(&self, provider: SourceId) -> Result<(), ConfigError> {
        if self.requests == 0 {
            return Err(ConfigError::ZeroRateLimit { provider });
        }
        if self.period.is_zero() {
            return Err(ConfigError::ZeroRatePeriod { provider });
        }
        Ok(())
    }
}

/// Default provider budgets (free-tier shaped).
pub fn default_rate_limits() -> BTreeMap<SourceId, RateLimitConfig> {
    BTreeMap::from([
        (
            SourceId::AlphaVantage,
            RateLimitConfig::new(5, Duration::from_secs(60)),
        ),
        (
            SourceId::FinancialModelingPrep,
            RateLimitConfig::new(250, Duration::from_secs(24 * 60 * 60)),
        ),
        (
            SourceId::Polygon,
            RateLimitConfig::new(100, Duration::from_secs(60)),
        ),
        (
            SourceId::Yahoo,
            RateLimitConfig::new(10, Duration::from_secs(1)),
        ),
    ])
}

/// Point-in-time usage of one source's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub period_ms: u64,
    pub used: u32,
    pub remaining: u32,
}

#[derive(Debug)]
struct SourceWindow {
    config: RateLimitConfig,
    request_timestamps: Mutex<VecDeque<Instant>>,
}

impl SourceWindow {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            request_timestamps: Mutex::new(VecDeque::with_capacity(config.requests as usize)),
        }
    }

    fn prune(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = timestamps.front() {
            if now.saturating_duration_since(*oldest) >= self.config.period {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Per-source sliding-window request counter.
///
/// Pure bookkeeping: a rejected check records nothing and never sleeps.
#[derive(Debug)]
pub struct RateLimiter {
    windows: BTreeMap<SourceId, SourceWindow>,
}

impl RateLimiter {
    pub fn new(limits: BTreeMap<SourceId, RateLimitConfig>) -> Result<Self, ConfigError> {
        let mut windows = BTreeMap::new();
        for (provider, config) in limits {
            config.validate(provider)?;
            windows.insert(provider, SourceWindow::new(config));
        }
        Ok(Self { windows })
    }

    /// Limiter with no windows; every check passes.
    pub fn unlimited() -> Self {
        Self {
            windows: BTreeMap::new(),
        }
    }

    /// Admit one request for `provider`, or report how long until a slot frees up.
    pub fn check(&self, provider: SourceId) -> Result<(), DataError> {
        let Some(window) = self.windows.get(&provider) else {
            return Ok(());
        };

        let now = Instant::now();
        let mut timestamps = window
            .request_timestamps
            .lock()
            .expect("rate limiter window lock is not poisoned");
        window.prune(&mut timestamps, now);

        if timestamps.len() >= window.config.requests as usize {
            let oldest = timestamps.front().copied().unwrap_or(now);
            let retry_after = window
                .config
                .period
                .saturating_sub(now.saturating_duration_since(oldest));
            tracing::debug!(
                source = %provider,
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limit exceeded"
            );
            return Err(DataError::RateLimitExceeded {
                provider,
                retry_after,
            });
        }

        timestamps.push_back(now);
        Ok(())
    }

    pub fn status(&self) -> BTreeMap<SourceId, RateLimitStatus> {
        let now = Instant::now();
        self.windows
            .iter()
            .map(|(provider, window)| {
                let mut timestamps = window
                    .request_timestamps
                    .lock()
                    .expect("rate limiter window lock is not poisoned");
                window.prune(&mut timestamps, now);
                let used = timestamps.len() as u32;
                let status = RateLimitStatus {
                    limit: window.config.requests,
                    period_ms: window.config.period.as_millis() as u64,
                    used,
                    remaining: window.config.requests.saturating_sub(used),
                };
                (*provider, status)
            })
            .collect()
    }
}
