use finlens_core::DataFetchingService;

use crate::cli::TickerArgs;
use crate::error::CliError;

use super::{to_outcome, CommandOutcome};

pub async fn run(
    args: &TickerArgs,
    service: &DataFetchingService,
) -> Result<CommandOutcome, CliError> {
    to_outcome(service.fetch_company_profile(&args.ticker).await)
}
