//! CLI argument definitions for Finlens.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `profile` | Fetch a company profile |
//! | `statements` | Fetch income, balance or cash-flow statements |
//! | `market` | Fetch a market snapshot with price history |
//! | `peers` | Fetch peer comparables |
//! | `validate` | Check whether tickers are servable |
//! | `status` | Show breaker, rate-limit and cache state |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | none | JSON service configuration file |
//! | `--fixtures` | none | Serve responses from a fixture directory |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--no-cache` | `false` | Bypass the response cache |
//! | `--log-level` | `warn` | Log filter when `RUST_LOG` is unset |
//!
//! # Examples
//!
//! ```bash
//! # Demo mode (no API keys set)
//! finlens profile AAPL --pretty
//!
//! # Quarterly income statements
//! finlens statements MSFT --type income --period quarterly --limit 8
//!
//! # Replay recorded payloads
//! finlens market AAPL --range 1mo --fixtures ./fixtures
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Finlens - resilient financial data CLI
///
/// Fetches company data through rate limiting, circuit breaking, retry and
/// caching. Without API keys it runs in demo mode with deterministic data.
#[derive(Debug, Parser)]
#[command(
    name = "finlens",
    author,
    version,
    about = "Resilient financial data CLI",
    long_about = "Finlens fetches company profiles, financial statements, market data and \
peer comparables from several providers. Features include:\n\
\n\
  • Per-provider rate limiting and circuit breaking\n\
  • Exponential-backoff retry with jitter\n\
  • Time-bounded response caching\n\
  • Deterministic demo mode when no API keys are set\n\
\n\
API keys are read from FINLENS_FMP_API_KEY, FINLENS_ALPHA_VANTAGE_API_KEY and \
FINLENS_POLYGON_API_KEY (or the same names without the FINLENS_ prefix)."
)]
pub struct Cli {
    /// Path to a JSON service configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve responses from `<dir>/<source>/<operation>/<TICKER>.json`.
    ///
    /// Forces live mode; a missing file answers as HTTP 404.
    #[arg(long, global = true)]
    pub fixtures: Option<PathBuf>,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Bypass the response cache for this run.
    #[arg(long, global = true, default_value_t = false)]
    pub no_cache: bool,

    /// Log filter used when RUST_LOG is not set (e.g. warn, info, finlens_core=debug).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch a company profile.
    ///
    /// # Examples
    ///
    ///   finlens profile AAPL
    Profile(TickerArgs),

    /// Fetch financial statements.
    ///
    /// # Examples
    ///
    ///   finlens statements AAPL --type balance --limit 3
    ///   finlens statements MSFT --type cashflow --period quarterly
    Statements(StatementsArgs),

    /// Fetch a market snapshot with price history.
    ///
    /// # Examples
    ///
    ///   finlens market NVDA --range 5d
    Market(MarketArgs),

    /// Fetch peer comparables in the same sector.
    Peers(TickerArgs),

    /// Check whether one or more tickers can be served.
    Validate(ValidateArgs),

    /// Show circuit breaker, rate-limit and cache state.
    Status,
}

/// Arguments for single-ticker commands.
#[derive(Debug, Args)]
pub struct TickerArgs {
    /// Ticker symbol (e.g., AAPL).
    pub ticker: String,
}

/// Arguments for the `statements` command.
#[derive(Debug, Args)]
pub struct StatementsArgs {
    /// Ticker symbol.
    pub ticker: String,

    /// Statement type: income, balance or cashflow.
    #[arg(long = "type", default_value = "income")]
    pub statement_type: String,

    /// Reporting period: annual or quarterly.
    #[arg(long, default_value = "annual")]
    pub period: String,

    /// Number of periods to return.
    #[arg(long, default_value_t = 4)]
    pub limit: usize,
}

/// Arguments for the `market` command.
#[derive(Debug, Args)]
pub struct MarketArgs {
    /// Ticker symbol.
    pub ticker: String,

    /// History range: 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max.
    #[arg(long, default_value = "1y")]
    pub range: String,
}

/// Arguments for the `validate` command.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// One or more ticker symbols.
    #[arg(required = true, num_args = 1..)]
    pub tickers: Vec<String>,
}
