use finlens_core::DataFetchingService;

use crate::error::CliError;

use super::CommandOutcome;

pub async fn run(service: &DataFetchingService) -> Result<CommandOutcome, CliError> {
    Ok(Ok(serde_json::to_value(service.status().await)?))
}
