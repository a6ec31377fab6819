use finlens_core::DataFetchingService;
use serde::Serialize;

use crate::cli::TickerArgs;
use crate::error::CliError;

use super::{to_outcome, CommandOutcome};

#[derive(Debug, Serialize)]
struct PeersResponseData {
    ticker: String,
    peers: Vec<finlens_core::PeerRecord>,
}

pub async fn run(
    args: &TickerArgs,
    service: &DataFetchingService,
) -> Result<CommandOutcome, CliError> {
    let result = service
        .fetch_peer_comparables(&args.ticker)
        .await
        .map(|peers| PeersResponseData {
            ticker: args.ticker.trim().to_ascii_uppercase(),
            peers,
        });
    to_outcome(result)
}
