use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Financial statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementType {
    #[serde(rename = "income")]
    Income,
    #[serde(rename = "balance")]
    Balance,
    #[serde(rename = "cashflow")]
    CashFlow,
}

impl StatementType {
    pub const ALL: [Self; 3] = [Self::Income, Self::Balance, Self::CashFlow];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Balance => "balance",
            Self::CashFlow => "cashflow",
        }
    }
}

impl Display for StatementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" | "income-statement" => Ok(Self::Income),
            "balance" | "balance-sheet" => Ok(Self::Balance),
            "cashflow" | "cash-flow" => Ok(Self::CashFlow),
            other => Err(ValidationError::InvalidStatementType {
                value: other.to_owned(),
            }),
        }
    }
}

/// Reporting cadence of a statement series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingPeriod {
    Annual,
    Quarterly,
}

impl ReportingPeriod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }
}

impl Display for ReportingPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportingPeriod {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "annual" | "fy" => Ok(Self::Annual),
            "quarterly" | "quarter" | "q" => Ok(Self::Quarterly),
            other => Err(ValidationError::InvalidReportingPeriod {
                value: other.to_owned(),
            }),
        }
    }
}

/// Lookback window for market data history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketRange {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl MarketRange {
    pub const ALL: [Self; 11] = [
        Self::OneDay,
        Self::FiveDays,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
        Self::TenYears,
        Self::YearToDate,
        Self::Max,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::FiveDays => "5d",
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
            Self::TenYears => "10y",
            Self::YearToDate => "ytd",
            Self::Max => "max",
        }
    }

    /// Sampling step and number of history points for the range.
    pub fn sampling(self) -> (time::Duration, usize) {
        use time::Duration;

        match self {
            Self::OneDay => (Duration::hours(1), 7),
            Self::FiveDays => (Duration::days(1), 5),
            Self::OneMonth => (Duration::days(1), 21),
            Self::ThreeMonths => (Duration::days(1), 63),
            Self::SixMonths => (Duration::days(1), 126),
            Self::OneYear => (Duration::days(1), 252),
            Self::TwoYears => (Duration::weeks(1), 104),
            Self::FiveYears => (Duration::weeks(4), 65),
            Self::TenYears => (Duration::weeks(4), 130),
            Self::YearToDate => (Duration::days(1), 180),
            Self::Max => (Duration::weeks(12), 120),
        }
    }
}

impl Default for MarketRange {
    fn default() -> Self {
        Self::OneYear
    }
}

impl Display for MarketRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketRange {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|range| range.as_str() == normalized)
            .ok_or(ValidationError::InvalidMarketRange { value: normalized })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_statement_type_aliases() {
        assert_eq!(StatementType::from_str("Cash-Flow"), Ok(StatementType::CashFlow));
        assert!(matches!(
            StatementType::from_str("equity"),
            Err(ValidationError::InvalidStatementType { .. })
        ));
    }

    #[test]
    fn parses_market_range_round_trip_names() {
        for range in MarketRange::ALL {
            assert_eq!(MarketRange::from_str(range.as_str()), Ok(range));
        }
        assert!(MarketRange::from_str("3y").is_err());
    }

    #[test]
    fn every_range_samples_at_least_one_point() {
        for range in MarketRange::ALL {
            let (step, points) = range.sampling();
            assert!(points > 0);
            assert!(step.is_positive());
        }
    }
}
