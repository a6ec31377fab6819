//! The data-access façade.
//!
//! Every fetch runs the same pipeline:
//!
//! ```text
//! cache ──hit──▶ value
//!   │ miss
//!   ▼
//! rate limiter ──over budget──▶ RateLimitExceeded
//!   │
//!   ▼
//! circuit breaker ──open──▶ CircuitOpen
//!   │
//!   ▼
//! retry loop ──▶ transport
//!   │
//!   ▼
//! typed decode ──▶ cache write
//! ```
//!
//! Failures surface once per logical call, wrapped as
//! [`DataError::Fetch`] with the operation that failed.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{CacheMode, CacheStats, ResponseCache};
use crate::cancel::CancelToken;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerStatus};
use crate::config::{Credentials, ServiceConfig};
use crate::mock::MockDataProvider;
use crate::rate_limiter::{RateLimitStatus, RateLimiter};
use crate::request::{FetchQuery, TransportRequest};
use crate::retry::RetryManager;
use crate::transport::Transport;
use crate::{
    CompanyProfile, ConfigError, DataError, MarketRange, MarketSnapshot, Operation, PeerRecord,
    ReportingPeriod, SourceId, StatementPeriod, StatementType, Ticker,
};

/// Where the service gets its data from, decided once at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceMode {
    /// Upstream calls go through the injected transport.
    Live,
    /// Deterministic mock data; no upstream quota is consumed.
    Demo,
}

impl ServiceMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Demo => "demo",
        }
    }
}

impl Display for ServiceMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combined introspection snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub mode: ServiceMode,
    pub circuit_breakers: BTreeMap<SourceId, CircuitBreakerStatus>,
    pub rate_limits: BTreeMap<SourceId, RateLimitStatus>,
    pub cache: CacheStats,
}

/// Builder for [`DataFetchingService`].
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use finlens_core::{DataFetchingService, Credentials};
///
/// let service = DataFetchingService::builder()
///     .with_credentials(Credentials::from_process_env())
///     .with_transport(Arc::new(my_transport))
///     .build()?;
/// ```
#[derive(Default)]
pub struct DataFetchingServiceBuilder {
    credentials: Option<Credentials>,
    config: ServiceConfig,
    transport: Option<Arc<dyn Transport>>,
    force_live: bool,
}

impl DataFetchingServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve credentials from an environment map (see [`Credentials::from_env_map`]).
    pub fn with_env_map(mut self, env: &HashMap<String, String>) -> Self {
        self.credentials = Some(Credentials::from_env_map(env));
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Run live even without credentials, e.g. against recorded fixtures or
    /// keyless sources. A transport is still required.
    pub fn with_live_mode(mut self, enabled: bool) -> Self {
        self.force_live = enabled;
        self
    }

    pub fn build(self) -> Result<DataFetchingService, ConfigError> {
        self.config.validate()?;
        let credentials = self.credentials.unwrap_or_default();

        let (mode, transport, rate_limiter) = if self.force_live || credentials.has_any() {
            let transport = self.transport.ok_or(ConfigError::MissingTransport)?;
            let limiter = RateLimiter::new(self.config.effective_rate_limits())?;
            (ServiceMode::Live, transport, limiter)
        } else {
            let transport: Arc<dyn Transport> = Arc::new(MockDataProvider::new());
            (ServiceMode::Demo, transport, RateLimiter::unlimited())
        };

        let breakers = SourceId::ALL
            .into_iter()
            .map(|source| {
                (
                    source,
                    CircuitBreaker::new(source.as_str(), self.config.circuit_breaker),
                )
            })
            .collect();

        tracing::info!(
            mode = %mode,
            configured_sources = ?credentials.configured_sources(),
            cache_mode = ?self.config.cache_mode,
            "data fetching service ready"
        );

        Ok(DataFetchingService {
            mode,
            transport,
            credentials,
            rate_limiter,
            breakers,
            retry: RetryManager::new(self.config.retry),
            cache: ResponseCache::new(),
            cache_mode: self.config.cache_mode,
            mock: MockDataProvider::new(),
        })
    }
}

/// Resilient access layer over the four upstream providers.
///
/// Shared by reference or `Arc`; all state is internally synchronized.
pub struct DataFetchingService {
    mode: ServiceMode,
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    rate_limiter: RateLimiter,
    breakers: BTreeMap<SourceId, CircuitBreaker>,
    retry: RetryManager,
    cache: ResponseCache,
    cache_mode: CacheMode,
    mock: MockDataProvider,
}

impl Debug for DataFetchingService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFetchingService")
            .field("mode", &self.mode)
            .field("credentials", &self.credentials)
            .field("cache_mode", &self.cache_mode)
            .finish_non_exhaustive()
    }
}

impl DataFetchingService {
    pub fn builder() -> DataFetchingServiceBuilder {
        DataFetchingServiceBuilder::new()
    }

    pub const fn mode(&self) -> ServiceMode {
        self.mode
    }

    pub async fn fetch_company_profile(&self, ticker: &str) -> Result<CompanyProfile, DataError> {
        self.fetch_company_profile_with_cancel(ticker, &CancelToken::default())
            .await
    }

    /// Like [`fetch_company_profile`](Self::fetch_company_profile), abortable via `cancel`.
    ///
    /// In live mode, rejected credentials (401/403) fall back to demo data.
    /// The fallback is cached like an upstream answer, so repeated lookups do
    /// not spend quota on a key that is known to be refused.
    pub async fn fetch_company_profile_with_cancel(
        &self,
        ticker: &str,
        cancel: &CancelToken,
    ) -> Result<CompanyProfile, DataError> {
        let ticker = parse_ticker(ticker, Operation::CompanyProfile)?;
        let query = FetchQuery::CompanyProfile {
            ticker: ticker.clone(),
        };

        match self.fetch(query.clone(), cancel).await {
            Err(error) if self.mode == ServiceMode::Live && error.is_auth_failure() => {
                tracing::warn!(
                    ticker = %ticker,
                    error = %error,
                    "credentials rejected; serving demo profile"
                );
                let profile = self.mock.company_profile(&ticker);
                if let Ok(value) = serde_json::to_value(&profile) {
                    self.remember(&query, value).await;
                }
                Ok(profile)
            }
            other => other,
        }
    }

    pub async fn fetch_financial_statements(
        &self,
        ticker: &str,
        statement_type: StatementType,
        period: ReportingPeriod,
        limit: usize,
    ) -> Result<Vec<StatementPeriod>, DataError> {
        self.fetch_financial_statements_with_cancel(
            ticker,
            statement_type,
            period,
            limit,
            &CancelToken::default(),
        )
        .await
    }

    pub async fn fetch_financial_statements_with_cancel(
        &self,
        ticker: &str,
        statement_type: StatementType,
        period: ReportingPeriod,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<StatementPeriod>, DataError> {
        let query = Ticker::parse(ticker)
            .and_then(|ticker| FetchQuery::statements(ticker, statement_type, period, limit))
            .map_err(|error| DataError::fetch(Operation::FinancialStatements, error.into()))?;
        self.fetch(query, cancel).await
    }

    pub async fn fetch_market_data(
        &self,
        ticker: &str,
        range: MarketRange,
    ) -> Result<MarketSnapshot, DataError> {
        self.fetch_market_data_with_cancel(ticker, range, &CancelToken::default())
            .await
    }

    pub async fn fetch_market_data_with_cancel(
        &self,
        ticker: &str,
        range: MarketRange,
        cancel: &CancelToken,
    ) -> Result<MarketSnapshot, DataError> {
        let ticker = parse_ticker(ticker, Operation::MarketData)?;
        self.fetch(FetchQuery::MarketData { ticker, range }, cancel)
            .await
    }

    pub async fn fetch_peer_comparables(&self, ticker: &str) -> Result<Vec<PeerRecord>, DataError> {
        self.fetch_peer_comparables_with_cancel(ticker, &CancelToken::default())
            .await
    }

    pub async fn fetch_peer_comparables_with_cancel(
        &self,
        ticker: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<PeerRecord>, DataError> {
        let ticker = parse_ticker(ticker, Operation::PeerComparables)?;
        self.fetch(FetchQuery::PeerComparables { ticker }, cancel)
            .await
    }

    /// Whether `ticker` names a company the service can serve.
    ///
    /// Demo mode checks the built-in catalog. Live mode asks upstream for a
    /// profile, skipping cached answers and the demo fallback; when the
    /// credentials are rejected the catalog answers instead.
    pub async fn validate_ticker(&self, ticker: &str) -> bool {
        let Ok(parsed) = Ticker::parse(ticker) else {
            return false;
        };
        if self.mode == ServiceMode::Demo {
            return self.mock.is_known_ticker(&parsed);
        }

        let query = FetchQuery::CompanyProfile {
            ticker: parsed.clone(),
        };
        let result = self
            .fetch_typed::<CompanyProfile>(&query, CacheMode::Refresh, &CancelToken::default())
            .await;
        match result {
            Ok(_) => true,
            Err(error) if error.is_auth_failure() => self.mock.is_known_ticker(&parsed),
            Err(_) => false,
        }
    }

    pub fn circuit_breaker_status(&self) -> BTreeMap<SourceId, CircuitBreakerStatus> {
        self.breakers
            .iter()
            .map(|(source, breaker)| (*source, breaker.status()))
            .collect()
    }

    pub fn rate_limit_status(&self) -> BTreeMap<SourceId, RateLimitStatus> {
        self.rate_limiter.status()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drop expired cache entries; returns how many were removed.
    pub async fn purge_expired_cache(&self) -> usize {
        self.cache.purge_expired().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn status(&self) -> ServiceStatus {
        ServiceStatus {
            mode: self.mode,
            circuit_breakers: self.circuit_breaker_status(),
            rate_limits: self.rate_limit_status(),
            cache: self.cache_stats().await,
        }
    }

    async fn fetch<T>(&self, query: FetchQuery, cancel: &CancelToken) -> Result<T, DataError>
    where
        T: DeserializeOwned,
    {
        let operation = query.operation();
        self.fetch_typed(&query, self.cache_mode, cancel)
            .await
            .map_err(|error| DataError::fetch(operation, error))
    }

    async fn fetch_typed<T>(
        &self,
        query: &FetchQuery,
        cache_mode: CacheMode,
        cancel: &CancelToken,
    ) -> Result<T, DataError>
    where
        T: DeserializeOwned,
    {
        let operation = query.operation();
        let source = operation.source();

        if cancel.is_cancelled() {
            return Err(DataError::Cancelled);
        }

        let key = ResponseCache::cache_key(operation.as_str(), query)
            .map_err(|error| DataError::Decode { operation, error })?;

        if cache_mode.reads() {
            if let Some(value) = self.cache.get(&key).await {
                return decode(operation, value);
            }
        }

        self.rate_limiter.check(source)?;

        let request = TransportRequest::new(
            source,
            query.clone(),
            self.credentials.for_source(source).map(str::to_owned),
        );
        let label = format!("{} {}", operation.label(), query.ticker());
        let breaker = &self.breakers[&source];

        let value = breaker
            .execute(|| {
                self.retry.execute_with_retry(
                    || {
                        let request = request.clone();
                        async move { self.transport.call(request).await.map_err(DataError::from) }
                    },
                    &label,
                    cancel,
                )
            })
            .await?;

        let decoded = decode(operation, value.clone())?;
        if cache_mode.writes() {
            self.cache.set(key, value, operation.cache_ttl()).await;
        }
        Ok(decoded)
    }

    /// Store `value` under the cache key of `query`, honouring the cache mode.
    async fn remember(&self, query: &FetchQuery, value: serde_json::Value) {
        if !self.cache_mode.writes() {
            return;
        }
        let operation = query.operation();
        match ResponseCache::cache_key(operation.as_str(), query) {
            Ok(key) => self.cache.set(key, value, operation.cache_ttl()).await,
            Err(error) => tracing::debug!(%error, "skipping cache write; key not serializable"),
        }
    }
}

fn parse_ticker(ticker: &str, operation: Operation) -> Result<Ticker, DataError> {
    Ticker::parse(ticker).map_err(|error| DataError::fetch(operation, error.into()))
}

fn decode<T: DeserializeOwned>(
    operation: Operation,
    value: serde_json::Value,
) -> Result<T, DataError> {
    serde_json::from_value(value).map_err(|error| DataError::Decode { operation, error })
}
