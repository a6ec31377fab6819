use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{MarketRange, ReportingPeriod, StatementType, Ticker, UtcDateTime};

/// Company profile as surfaced to analytical features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub ticker: Ticker,
    pub name: String,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub currency: String,
    pub market_cap: Option<f64>,
    pub employees: Option<u64>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub as_of: UtcDateTime,
}

/// One reported period of a single financial statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub ticker: Ticker,
    pub statement_type: StatementType,
    pub period: ReportingPeriod,
    pub fiscal_year: i32,
    /// `None` for annual statements.
    pub fiscal_quarter: Option<u8>,
    pub period_end: UtcDateTime,
    pub currency: String,
    pub line_items: BTreeMap<String, f64>,
}

impl StatementPeriod {
    pub fn line_item(&self, name: &str) -> Option<f64> {
        self.line_items.get(name).copied()
    }
}

/// Single close sample in a market history series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub ts: UtcDateTime,
    pub close: f64,
    pub volume: u64,
}

/// Latest quote plus history for a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: Ticker,
    pub range: MarketRange,
    pub currency: String,
    pub price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub day_high: f64,
    pub day_low: f64,
    pub fifty_two_week_high: f64,
    pub fifty_two_week_low: f64,
    pub history: Vec<PricePoint>,
    pub as_of: UtcDateTime,
}

/// Comparable company used in relative valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub ticker: Ticker,
    pub name: String,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub revenue_growth: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_period_deserializes_from_canonical_json() {
        let payload = serde_json::json!({
            "ticker": "aapl",
            "statement_type": "income",
            "period": "annual",
            "fiscal_year": 2024,
            "fiscal_quarter": null,
            "period_end": "2024-09-28T00:00:00Z",
            "currency": "USD",
            "line_items": { "revenue": 391035000000.0, "net_income": 93736000000.0 }
        });

        let period: StatementPeriod = serde_json::from_value(payload).expect("valid payload");
        assert_eq!(period.ticker.as_str(), "AAPL");
        assert_eq!(period.line_item("net_income"), Some(93_736_000_000.0));
        assert_eq!(period.line_item("ebitda"), None);
    }

    #[test]
    fn profile_rejects_invalid_ticker_in_payload() {
        let payload = serde_json::json!({
            "ticker": "$$$",
            "name": "Bad",
            "exchange": null,
            "sector": null,
            "industry": null,
            "currency": "USD",
            "market_cap": null,
            "employees": null,
            "description": null,
            "website": null,
            "as_of": "2024-01-01T00:00:00Z"
        });

        assert!(serde_json::from_value::<CompanyProfile>(payload).is_err());
    }
}
