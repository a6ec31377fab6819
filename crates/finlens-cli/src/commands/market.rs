use finlens_core::{DataFetchingService, MarketRange};

use crate::cli::MarketArgs;
use crate::error::CliError;

use super::{to_outcome, CommandOutcome};

pub async fn run(
    args: &MarketArgs,
    service: &DataFetchingService,
) -> Result<CommandOutcome, CliError> {
    let range: MarketRange = args.range.parse()?;
    to_outcome(service.fetch_market_data(&args.ticker, range).await)
}
