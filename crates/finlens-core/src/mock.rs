//! Deterministic demo-mode data provider.
//!
//! Every number is drawn from a [`fastrand::Rng`] seeded by the ticker, so the
//! same ticker yields the same figures across calls and process restarts.
//! Only timestamps follow the wall clock.

use std::collections::BTreeMap;

use fastrand::Rng;
use serde::Serialize;
use serde_json::Value;
use time::{Date, Month};

use crate::request::{FetchQuery, TransportRequest};
use crate::transport::{Transport, TransportError, TransportFuture};
use crate::{
    CompanyProfile, MarketRange, MarketSnapshot, PeerRecord, PricePoint, ReportingPeriod,
    StatementPeriod, StatementType, Ticker, UtcDateTime,
};

const MAX_PEERS: usize = 5;

const SYNTHETIC_SECTORS: [(&str, &str); 5] = [
    ("Technology", "Software - Application"),
    ("Healthcare", "Medical Devices"),
    ("Industrials", "Specialty Industrial Machinery"),
    ("Consumer Cyclical", "Specialty Retail"),
    ("Financial Services", "Asset Management"),
];

#[derive(Debug, Clone, Copy)]
struct CatalogEntry {
    ticker: &'static str,
    name: &'static str,
    exchange: &'static str,
    sector: &'static str,
    industry: &'static str,
    website: &'static str,
}

const CATALOG: [CatalogEntry; 12] = [
    CatalogEntry {
        ticker: "AAPL",
        name: "Apple Inc.",
        exchange: "NASDAQ",
        sector: "Technology",
        industry: "Consumer Electronics",
        website: "https://www.apple.com",
    },
    CatalogEntry {
        ticker: "MSFT",
        name: "Microsoft Corporation",
        exchange: "NASDAQ",
        sector: "Technology",
        industry: "Software - Infrastructure",
        website: "https://www.microsoft.com",
    },
    CatalogEntry {
        ticker: "GOOGL",
        name: "Alphabet Inc.",
        exchange: "NASDAQ",
        sector: "Communication Services",
        industry: "Internet Content & Information",
        website: "https://abc.xyz",
    },
    CatalogEntry {
        ticker: "AMZN",
        name: "Amazon.com, Inc.",
        exchange: "NASDAQ",
        sector: "Consumer Cyclical",
        industry: "Internet Retail",
        website: "https://www.amazon.com",
    },
    CatalogEntry {
        ticker: "META",
        name: "Meta Platforms, Inc.",
        exchange: "NASDAQ",
        sector: "Communication Services",
        industry: "Internet Content & Information",
        website: "https://about.meta.com",
    },
    CatalogEntry {
        ticker: "NVDA",
        name: "NVIDIA Corporation",
        exchange: "NASDAQ",
        sector: "Technology",
        industry: "Semiconductors",
        website: "https://www.nvidia.com",
    },
    CatalogEntry {
        ticker: "TSLA",
        name: "Tesla, Inc.",
        exchange: "NASDAQ",
        sector: "Consumer Cyclical",
        industry: "Auto Manufacturers",
        website: "https://www.tesla.com",
    },
    CatalogEntry {
        ticker: "JPM",
        name: "JPMorgan Chase & Co.",
        exchange: "NYSE",
        sector: "Financial Services",
        industry: "Banks - Diversified",
        website: "https://www.jpmorganchase.com",
    },
    CatalogEntry {
        ticker: "JNJ",
        name: "Johnson & Johnson",
        exchange: "NYSE",
        sector: "Healthcare",
        industry: "Drug Manufacturers - General",
        website: "https://www.jnj.com",
    },
    CatalogEntry {
        ticker: "V",
        name: "Visa Inc.",
        exchange: "NYSE",
        sector: "Financial Services",
        industry: "Credit Services",
        website: "https://www.visa.com",
    },
    CatalogEntry {
        ticker: "WMT",
        name: "Walmart Inc.",
        exchange: "NYSE",
        sector: "Consumer Defensive",
        industry: "Discount Stores",
        website: "https://www.walmart.com",
    },
    CatalogEntry {
        ticker: "XOM",
        name: "Exxon Mobil Corporation",
        exchange: "NYSE",
        sector: "Energy",
        industry: "Oil & Gas Integrated",
        website: "https://corporate.exxonmobil.com",
    },
];

fn catalog_entry(ticker: &Ticker) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|entry| entry.ticker == ticker.as_str())
}

/// Per-ticker fundamentals that every generated payload derives from.
#[derive(Debug, Clone)]
struct Fundamentals {
    name: String,
    exchange: String,
    sector: String,
    industry: String,
    website: Option<String>,
    price: f64,
    shares_outstanding: f64,
    revenue: f64,
    net_margin: f64,
    revenue_growth: f64,
    employees: u64,
}

impl Fundamentals {
    fn for_ticker(ticker: &Ticker) -> Self {
        let mut rng = Rng::with_seed(ticker.seed());
        let price = 20.0 + rng.f64() * 480.0;
        let shares_outstanding = (0.5 + rng.f64() * 15.0) * 1e9;
        let price_to_sales = 1.5 + rng.f64() * 8.5;
        let revenue = price * shares_outstanding / price_to_sales;
        let net_margin = 0.05 + rng.f64() * 0.25;
        let revenue_growth = -0.05 + rng.f64() * 0.30;
        let employees = rng.u64(5_000..=400_000);

        match catalog_entry(ticker) {
            Some(entry) => Self {
                name: entry.name.to_owned(),
                exchange: entry.exchange.to_owned(),
                sector: entry.sector.to_owned(),
                industry: entry.industry.to_owned(),
                website: Some(entry.website.to_owned()),
                price,
                shares_outstanding,
                revenue,
                net_margin,
                revenue_growth,
                employees,
            },
            None => {
                let (sector, industry) = SYNTHETIC_SECTORS[rng.usize(..SYNTHETIC_SECTORS.len())];
                Self {
                    name: format!("{ticker} Holdings Corp."),
                    exchange: String::from("NYSE"),
                    sector: sector.to_owned(),
                    industry: industry.to_owned(),
                    website: None,
                    price,
                    shares_outstanding,
                    revenue,
                    net_margin,
                    revenue_growth,
                    employees,
                }
            }
        }
    }

    fn market_cap(&self) -> f64 {
        self.price * self.shares_outstanding
    }
}

/// Transport that fabricates canonical payloads instead of calling upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockDataProvider;

impl MockDataProvider {
    pub fn new() -> Self {
        Self
    }

    /// Whether `ticker` is one of the well-known demo companies.
    pub fn is_known_ticker(&self, ticker: &Ticker) -> bool {
        catalog_entry(ticker).is_some()
    }

    pub fn known_tickers(&self) -> Vec<Ticker> {
        CATALOG
            .iter()
            .filter_map(|entry| Ticker::parse(entry.ticker).ok())
            .collect()
    }

    pub fn company_profile(&self, ticker: &Ticker) -> CompanyProfile {
        let fundamentals = Fundamentals::for_ticker(ticker);
        CompanyProfile {
            ticker: ticker.clone(),
            description: Some(format!(
                "{} operates in the {} industry.",
                fundamentals.name, fundamentals.industry
            )),
            market_cap: Some(round_to(fundamentals.market_cap(), 0)),
            employees: Some(fundamentals.employees),
            name: fundamentals.name,
            exchange: Some(fundamentals.exchange),
            sector: Some(fundamentals.sector),
            industry: Some(fundamentals.industry),
            currency: String::from("USD"),
            website: fundamentals.website,
            as_of: UtcDateTime::now(),
        }
    }

    pub fn financial_statements(
        &self,
        ticker: &Ticker,
        statement_type: StatementType,
        period: ReportingPeriod,
        limit: usize,
    ) -> Result<Vec<StatementPeriod>, TransportError> {
        let fundamentals = Fundamentals::for_ticker(ticker);
        let mut rng = Rng::with_seed(ticker.seed() ^ statement_salt(statement_type, period));
        let latest_year = UtcDateTime::now().year() - 1;
        let periods_per_year = match period {
            ReportingPeriod::Annual => 1.0,
            ReportingPeriod::Quarterly => 4.0,
        };
        let per_period_growth = (1.0 + fundamentals.revenue_growth).powf(1.0 / periods_per_year);

        (0..limit)
            .map(|index| {
                let (fiscal_year, fiscal_quarter) = match period {
                    ReportingPeriod::Annual => (latest_year - index as i32, None),
                    ReportingPeriod::Quarterly => {
                        let back = index as i32;
                        (latest_year - back / 4, Some((4 - back % 4) as u8))
                    }
                };
                let period_end = period_end(fiscal_year, fiscal_quarter)?;
                let revenue = fundamentals.revenue / periods_per_year
                    / per_period_growth.powi(index as i32)
                    * (0.97 + rng.f64() * 0.06);
                let line_items = line_items(statement_type, revenue, &fundamentals, &mut rng);

                Ok(StatementPeriod {
                    ticker: ticker.clone(),
                    statement_type,
                    period,
                    fiscal_year,
                    fiscal_quarter,
                    period_end,
                    currency: String::from("USD"),
                    line_items,
                })
            })
            .collect()
    }

    pub fn market_snapshot(
        &self,
        ticker: &Ticker,
        range: MarketRange,
    ) -> Result<MarketSnapshot, TransportError> {
        let fundamentals = Fundamentals::for_ticker(ticker);
        let mut rng = Rng::with_seed(ticker.seed().rotate_left(17));
        let (step, points) = range.sampling();
        let now = UtcDateTime::now().into_inner();

        // Walk backwards from the current price so the last sample equals it.
        let mut closes = Vec::with_capacity(points);
        let mut close = fundamentals.price;
        for _ in 0..points {
            closes.push(close);
            close = (close * (1.0 + (rng.f64() - 0.5) * 0.04)).max(1.0);
        }
        closes.reverse();

        let mut history = Vec::with_capacity(points);
        for (index, close) in closes.iter().enumerate() {
            let offset = step * (points.saturating_sub(index + 1) as i32);
            history.push(PricePoint {
                ts: UtcDateTime::from(now - offset),
                close: round_to(*close, 2),
                volume: rng.u64(1_000_000..=80_000_000),
            });
        }

        let price = round_to(fundamentals.price, 2);
        let previous_close = round_to(price * (1.0 + (rng.f64() - 0.5) * 0.03), 2);
        let change = round_to(price - previous_close, 2);
        let window_high = closes.iter().copied().fold(price, f64::max);
        let window_low = closes.iter().copied().fold(price, f64::min);

        Ok(MarketSnapshot {
            ticker: ticker.clone(),
            range,
            currency: String::from("USD"),
            price,
            previous_close,
            change,
            change_percent: round_to(change / previous_close * 100.0, 2),
            volume: rng.u64(5_000_000..=60_000_000),
            day_high: round_to(price.max(previous_close) * (1.0 + rng.f64() * 0.01), 2),
            day_low: round_to(price.min(previous_close) * (1.0 - rng.f64() * 0.01), 2),
            fifty_two_week_high: round_to(window_high * (1.0 + rng.f64() * 0.05), 2),
            fifty_two_week_low: round_to(window_low * (1.0 - rng.f64() * 0.05), 2),
            history,
            as_of: UtcDateTime::from(now),
        })
    }

    /// Catalog companies sharing the ticker's sector, excluding the ticker itself.
    pub fn peer_comparables(&self, ticker: &Ticker) -> Vec<PeerRecord> {
        let sector = Fundamentals::for_ticker(ticker).sector;
        CATALOG
            .iter()
            .filter(|entry| entry.sector == sector && entry.ticker != ticker.as_str())
            .filter_map(|entry| Ticker::parse(entry.ticker).ok())
            .take(MAX_PEERS)
            .map(|peer| peer_record(&peer))
            .collect()
    }

    fn respond(&self, query: &FetchQuery) -> Result<Value, TransportError> {
        match query {
            FetchQuery::CompanyProfile { ticker } => to_payload(&self.company_profile(ticker)),
            FetchQuery::FinancialStatements {
                ticker,
                statement_type,
                period,
                limit,
            } => to_payload(&self.financial_statements(ticker, *statement_type, *period, *limit)?),
            FetchQuery::MarketData { ticker, range } => {
                to_payload(&self.market_snapshot(ticker, *range)?)
            }
            FetchQuery::PeerComparables { ticker } => to_payload(&self.peer_comparables(ticker)),
        }
    }
}

impl Transport for MockDataProvider {
    fn call<'a>(&'a self, request: TransportRequest) -> TransportFuture<'a> {
        Box::pin(async move { self.respond(&request.query) })
    }
}

fn peer_record(ticker: &Ticker) -> PeerRecord {
    let fundamentals = Fundamentals::for_ticker(ticker);
    let mut rng = Rng::with_seed(ticker.seed().rotate_right(7));
    let earnings = fundamentals.revenue * fundamentals.net_margin;
    let ebitda = earnings * (1.3 + rng.f64() * 0.5);
    PeerRecord {
        ticker: ticker.clone(),
        market_cap: Some(round_to(fundamentals.market_cap(), 0)),
        pe_ratio: Some(round_to(fundamentals.market_cap() / earnings, 2)),
        ev_to_ebitda: Some(round_to(fundamentals.market_cap() * 1.05 / ebitda, 2)),
        revenue_growth: Some(round_to(fundamentals.revenue_growth, 4)),
        name: fundamentals.name,
        sector: Some(fundamentals.sector),
    }
}

fn line_items(
    statement_type: StatementType,
    revenue: f64,
    fundamentals: &Fundamentals,
    rng: &mut Rng,
) -> BTreeMap<String, f64> {
    let net_income = revenue * fundamentals.net_margin;
    let items: Vec<(&str, f64)> = match statement_type {
        StatementType::Income => {
            let gross_margin = 0.35 + rng.f64() * 0.35;
            let operating_income = revenue * (fundamentals.net_margin + 0.05 + rng.f64() * 0.05);
            vec![
                ("revenue", revenue),
                ("cost_of_revenue", revenue * (1.0 - gross_margin)),
                ("gross_profit", revenue * gross_margin),
                ("operating_income", operating_income),
                ("ebitda", operating_income * (1.1 + rng.f64() * 0.2)),
                ("net_income", net_income),
                ("eps", net_income / fundamentals.shares_outstanding),
            ]
        }
        StatementType::Balance => {
            let total_assets = revenue * (1.2 + rng.f64() * 1.3);
            let total_liabilities = total_assets * (0.35 + rng.f64() * 0.35);
            vec![
                ("total_assets", total_assets),
                ("total_liabilities", total_liabilities),
                ("total_equity", total_assets - total_liabilities),
                ("cash_and_equivalents", total_assets * (0.05 + rng.f64() * 0.15)),
                ("total_debt", total_liabilities * (0.3 + rng.f64() * 0.4)),
            ]
        }
        StatementType::CashFlow => {
            let operating_cash_flow = net_income * (1.1 + rng.f64() * 0.4);
            let capital_expenditure = -revenue * (0.03 + rng.f64() * 0.07);
            vec![
                ("operating_cash_flow", operating_cash_flow),
                ("capital_expenditure", capital_expenditure),
                ("free_cash_flow", operating_cash_flow + capital_expenditure),
                ("dividends_paid", -net_income * rng.f64() * 0.4),
            ]
        }
    };

    items
        .into_iter()
        .map(|(name, value)| {
            let digits = if name == "eps" { 2 } else { 0 };
            (name.to_owned(), round_to(value, digits))
        })
        .collect()
}

fn statement_salt(statement_type: StatementType, period: ReportingPeriod) -> u64 {
    let type_salt = match statement_type {
        StatementType::Income => 0x1000,
        StatementType::Balance => 0x2000,
        StatementType::CashFlow => 0x3000,
    };
    let period_salt = match period {
        ReportingPeriod::Annual => 0x10,
        ReportingPeriod::Quarterly => 0x20,
    };
    type_salt | period_salt
}

fn period_end(fiscal_year: i32, fiscal_quarter: Option<u8>) -> Result<UtcDateTime, TransportError> {
    let (month, day) = match fiscal_quarter {
        None | Some(4) => (Month::December, 31),
        Some(1) => (Month::March, 31),
        Some(2) => (Month::June, 30),
        Some(_) => (Month::September, 30),
    };
    let date = Date::from_calendar_date(fiscal_year, month, day)
        .map_err(|error| TransportError::other(error.to_string()))?;
    Ok(UtcDateTime::at_midnight(date))
}

fn to_payload<T: Serialize>(value: &T) -> Result<Value, TransportError> {
    serde_json::to_value(value).map_err(|error| TransportError::other(error.to_string()))
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10_f64.powi(digits);
    (value * factor).round() / factor
}
