use finlens_core::{DataFetchingService, ReportingPeriod, StatementPeriod, StatementType};
use serde::Serialize;

use crate::cli::StatementsArgs;
use crate::error::CliError;

use super::{to_outcome, CommandOutcome};

#[derive(Debug, Serialize)]
struct StatementsResponseData {
    statement_type: StatementType,
    period: ReportingPeriod,
    periods: Vec<StatementPeriod>,
}

pub async fn run(
    args: &StatementsArgs,
    service: &DataFetchingService,
) -> Result<CommandOutcome, CliError> {
    let statement_type: StatementType = args.statement_type.parse()?;
    let period: ReportingPeriod = args.period.parse()?;

    let result = service
        .fetch_financial_statements(&args.ticker, statement_type, period, args.limit)
        .await
        .map(|periods| StatementsResponseData {
            statement_type,
            period,
            periods,
        });
    to_outcome(result)
}
