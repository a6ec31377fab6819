//! # Domain Models
//!
//! Canonical, provider-neutral types returned by the access layer.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CompanyProfile`] | Company metadata and size |
//! | [`StatementPeriod`] | One period of an income, balance or cash-flow statement |
//! | [`MarketSnapshot`] | Latest price with history for a [`MarketRange`] |
//! | [`PeerRecord`] | Comparable company multiples |
//! | [`Ticker`] | Validated ticker symbol |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Transports hand back `serde_json::Value` payloads already in this shape;
//! the service only deserializes them.

mod models;
mod params;
mod ticker;
mod timestamp;

pub use models::{CompanyProfile, MarketSnapshot, PeerRecord, PricePoint, StatementPeriod};
pub use params::{MarketRange, ReportingPeriod, StatementType};
pub use ticker::Ticker;
pub use timestamp::UtcDateTime;
