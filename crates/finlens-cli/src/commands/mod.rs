mod market;
mod peers;
mod profile;
mod statements;
mod status;
mod validate;

use std::sync::Arc;
use std::time::Instant;

use finlens_core::{CacheMode, Credentials, DataError, DataFetchingService, ServiceConfig};
use serde_json::Value;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::envelope::Envelope;
use crate::error::CliError;
use crate::fixtures::FixtureTransport;

/// Fetch result of one command. Fetch failures travel in the envelope,
/// CLI failures (bad flags, unreadable config) short-circuit as `CliError`.
pub type CommandOutcome = Result<Value, DataError>;

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let service = build_service(cli)?;
    let started = Instant::now();

    let outcome = match &cli.command {
        Command::Profile(args) => profile::run(args, &service).await?,
        Command::Statements(args) => statements::run(args, &service).await?,
        Command::Market(args) => market::run(args, &service).await?,
        Command::Peers(args) => peers::run(args, &service).await?,
        Command::Validate(args) => validate::run(args, &service).await?,
        Command::Status => status::run(&service).await?,
    };

    let latency_ms = started.elapsed().as_millis() as u64;
    Ok(Envelope::from_result(service.mode(), outcome, latency_ms))
}

fn build_service(cli: &Cli) -> Result<DataFetchingService, CliError> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_path(path)?,
        None => ServiceConfig::default(),
    };
    if cli.no_cache {
        config.cache_mode = CacheMode::Bypass;
    }

    let mut builder = DataFetchingService::builder()
        .with_config(config)
        .with_credentials(Credentials::from_process_env());

    if let Some(root) = &cli.fixtures {
        info!(root = %root.display(), "serving responses from fixtures");
        builder = builder
            .with_transport(Arc::new(FixtureTransport::new(root)))
            .with_live_mode(true);
    }

    Ok(builder.build()?)
}

/// Serialize a successful fetch, passing fetch failures through untouched.
fn to_outcome<T: serde::Serialize>(
    result: Result<T, DataError>,
) -> Result<CommandOutcome, CliError> {
    match result {
        Ok(data) => Ok(Ok(serde_json::to_value(data)?)),
        Err(error) => Ok(Err(error)),
    }
}
