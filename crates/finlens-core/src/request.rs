//! Logical operations and the request envelope handed to transports.
//!
//! # Operations
//!
//! | Operation | Source | Cache TTL |
//! |-----------|--------|-----------|
//! | [`Operation::CompanyProfile`] | fmp | 24h |
//! | [`Operation::FinancialStatements`] | alpha_vantage | 6h |
//! | [`Operation::MarketData`] | yahoo | 15min |
//! | [`Operation::PeerComparables`] | polygon | 4h |

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{MarketRange, ReportingPeriod, SourceId, StatementType, Ticker, ValidationError};

/// Logical fetch performed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    CompanyProfile,
    FinancialStatements,
    MarketData,
    PeerComparables,
}

impl Operation {
    pub const ALL: [Self; 4] = [
        Self::CompanyProfile,
        Self::FinancialStatements,
        Self::MarketData,
        Self::PeerComparables,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompanyProfile => "company_profile",
            Self::FinancialStatements => "financial_statements",
            Self::MarketData => "market_data",
            Self::PeerComparables => "peer_comparables",
        }
    }

    /// Human-readable name used in error messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::CompanyProfile => "company profile",
            Self::FinancialStatements => "financial statements",
            Self::MarketData => "market data",
            Self::PeerComparables => "peer comparables",
        }
    }

    /// Upstream provider serving this operation.
    pub const fn source(self) -> SourceId {
        match self {
            Self::CompanyProfile => SourceId::FinancialModelingPrep,
            Self::FinancialStatements => SourceId::AlphaVantage,
            Self::MarketData => SourceId::Yahoo,
            Self::PeerComparables => SourceId::Polygon,
        }
    }

    /// How long a successful response stays fresh.
    pub const fn cache_ttl(self) -> Duration {
        match self {
            Self::CompanyProfile => Duration::from_secs(24 * 60 * 60),
            Self::FinancialStatements => Duration::from_secs(6 * 60 * 60),
            Self::MarketData => Duration::from_secs(15 * 60),
            Self::PeerComparables => Duration::from_secs(4 * 60 * 60),
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Fully-typed parameters of one logical fetch.
///
/// Serializes canonically, which makes it usable as cache-key material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum FetchQuery {
    CompanyProfile {
        ticker: Ticker,
    },
    FinancialStatements {
        ticker: Ticker,
        statement_type: StatementType,
        period: ReportingPeriod,
        limit: usize,
    },
    MarketData {
        ticker: Ticker,
        range: MarketRange,
    },
    PeerComparables {
        ticker: Ticker,
    },
}

impl FetchQuery {
    pub fn statements(
        ticker: Ticker,
        statement_type: StatementType,
        period: ReportingPeriod,
        limit: usize,
    ) -> Result<Self, ValidationError> {
        if limit == 0 {
            return Err(ValidationError::ZeroStatementLimit);
        }
        Ok(Self::FinancialStatements {
            ticker,
            statement_type,
            period,
            limit,
        })
    }

    pub const fn operation(&self) -> Operation {
        match self {
            Self::CompanyProfile { .. } => Operation::CompanyProfile,
            Self::FinancialStatements { .. } => Operation::FinancialStatements,
            Self::MarketData { .. } => Operation::MarketData,
            Self::PeerComparables { .. } => Operation::PeerComparables,
        }
    }

    pub fn ticker(&self) -> &Ticker {
        match self {
            Self::CompanyProfile { ticker }
            | Self::FinancialStatements { ticker, .. }
            | Self::MarketData { ticker, .. }
            | Self::PeerComparables { ticker } => ticker,
        }
    }
}

/// Envelope passed to a [`Transport`](crate::Transport) for one attempt sequence.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub request_id: Uuid,
    pub source: SourceId,
    pub query: FetchQuery,
    pub credential: Option<String>,
}

impl TransportRequest {
    pub fn new(source: SourceId, query: FetchQuery, credential: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            source,
            query,
            credential,
        }
    }

    pub const fn operation(&self) -> Operation {
        self.query.operation()
    }

    /// Provider-neutral resource path, e.g. `/profile/AAPL`.
    pub fn path(&self) -> String {
        let ticker = urlencoding::encode(self.query.ticker().as_str());
        match &self.query {
            FetchQuery::CompanyProfile { .. } => format!("/profile/{ticker}"),
            FetchQuery::FinancialStatements { .. } => format!("/statements/{ticker}"),
            FetchQuery::MarketData { .. } => format!("/market/{ticker}"),
            FetchQuery::PeerComparables { .. } => format!("/peers/{ticker}"),
        }
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match &self.query {
            FetchQuery::FinancialStatements {
                statement_type,
                period,
                limit,
                ..
            } => vec![
                ("type", statement_type.as_str().to_owned()),
                ("period", period.as_str().to_owned()),
                ("limit", limit.to_string()),
            ],
            FetchQuery::MarketData { range, .. } => vec![("range", range.as_str().to_owned())],
            FetchQuery::CompanyProfile { .. } | FetchQuery::PeerComparables { .. } => Vec::new(),
        }
    }

    /// Path plus URL-encoded query string.
    pub fn path_and_query(&self) -> String {
        let pairs = self.query_pairs();
        if pairs.is_empty() {
            return self.path();
        }
        let query = pairs
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.path())
    }
}

impl std::fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRequest")
            .field("request_id", &self.request_id)
            .field("source", &self.source)
            .field("query", &self.query)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(raw: &str) -> Ticker {
        Ticker::parse(raw).expect("valid ticker")
    }

    #[test]
    fn statements_query_rejects_zero_limit() {
        let err = FetchQuery::statements(
            ticker("AAPL"),
            StatementType::Income,
            ReportingPeriod::Annual,
            0,
        )
        .expect_err("zero limit must fail");
        assert_eq!(err, ValidationError::ZeroStatementLimit);
    }

    #[test]
    fn path_and_query_encode_parameters() {
        let query = FetchQuery::statements(
            ticker("brk.b"),
            StatementType::CashFlow,
            ReportingPeriod::Quarterly,
            4,
        )
        .expect("valid query");
        let request = TransportRequest::new(SourceId::AlphaVantage, query, None);

        assert_eq!(
            request.path_and_query(),
            "/statements/BRK.B?type=cashflow&period=quarterly&limit=4"
        );
    }

    #[test]
    fn debug_output_redacts_credential() {
        let request = TransportRequest::new(
            SourceId::FinancialModelingPrep,
            FetchQuery::CompanyProfile {
                ticker: ticker("MSFT"),
            },
            Some(String::from("super-secret")),
        );

        let rendered = format!("{request:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn each_operation_maps_to_a_distinct_source() {
        let mut sources = Operation::ALL.map(Operation::source).to_vec();
        sources.sort();
        sources.dedup();
        assert_eq!(sources.len(), Operation::ALL.len());
    }
}
