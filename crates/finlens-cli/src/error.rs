use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
///
/// Fetch failures are not `CliError`s: they are reported inside the output
/// envelope and mapped to an exit code by [`crate::envelope::Envelope::exit_code`].
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] finlens_core::ValidationError),

    #[error(transparent)]
    Config(#[from] finlens_core::ConfigError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Config(_) => 2,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
