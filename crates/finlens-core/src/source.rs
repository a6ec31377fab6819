use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Upstream data providers known to the access layer.
///
/// The set is fixed: per-source registries (rate-limit windows, circuit
/// breakers) are built once from [`SourceId::ALL`] and never grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceId {
    #[serde(rename = "alpha_vantage")]
    AlphaVantage,
    #[serde(rename = "fmp")]
    FinancialModelingPrep,
    #[serde(rename = "polygon")]
    Polygon,
    #[serde(rename = "yahoo")]
    Yahoo,
}

impl SourceId {
    pub const ALL: [Self; 4] = [
        Self::AlphaVantage,
        Self::FinancialModelingPrep,
        Self::Polygon,
        Self::Yahoo,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlphaVantage => "alpha_vantage",
            Self::FinancialModelingPrep => "fmp",
            Self::Polygon => "polygon",
            Self::Yahoo => "yahoo",
        }
    }

    /// Environment variable names holding this provider's API key, in lookup order.
    pub const fn credential_env_keys(self) -> &'static [&'static str] {
        match self {
            Self::AlphaVantage => &["FINLENS_ALPHA_VANTAGE_API_KEY", "ALPHA_VANTAGE_API_KEY"],
            Self::FinancialModelingPrep => &["FINLENS_FMP_API_KEY", "FMP_API_KEY"],
            Self::Polygon => &["FINLENS_POLYGON_API_KEY", "POLYGON_API_KEY"],
            Self::Yahoo => &[],
        }
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "alpha_vantage" | "alphavantage" => Ok(Self::AlphaVantage),
            "fmp" => Ok(Self::FinancialModelingPrep),
            "polygon" => Ok(Self::Polygon),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
