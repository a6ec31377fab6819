use finlens_core::DataFetchingService;
use serde::Serialize;

use crate::cli::ValidateArgs;
use crate::error::CliError;

use super::CommandOutcome;

#[derive(Debug, Serialize)]
struct TickerValidity {
    ticker: String,
    valid: bool,
}

/// Validation never fails as a fetch; each ticker gets a verdict.
pub async fn run(
    args: &ValidateArgs,
    service: &DataFetchingService,
) -> Result<CommandOutcome, CliError> {
    let mut results = Vec::with_capacity(args.tickers.len());
    for ticker in &args.tickers {
        results.push(TickerValidity {
            ticker: ticker.clone(),
            valid: service.validate_ticker(ticker).await,
        });
    }
    Ok(Ok(serde_json::to_value(results)?))
}
