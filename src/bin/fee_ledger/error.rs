//! Error types for the fee ledger service.

use swap_fee_ledger::types::JobId;

use crate::config::ConfigError;

/// Main error type for the fee ledger service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Environment configuration error: {0}")]
    EnvConfig(#[from] envy::Error),

    #[error("Ledger error: {0}")]
    Ledger(#[from] swap_fee_ledger::Error),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Report {0} failed")]
    ReportFailed(JobId),

    #[error("Report {0} disappeared from the store")]
    ReportMissing(JobId),
}

pub type Result<T> = std::result::Result<T, Error>;
