//! Configuration for the fee ledger service.
//!
//! Configuration comes from two sources:
//! - Environment variables (via .env file or shell): endpoints, API keys, tuning
//! - CLI arguments: provider source, fiat currency, command

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use swap_fee_ledger::{
    LedgerConfig,
    retry::RetryPolicy,
    types::{Currency, PoolKey, Timestamp},
};

/// Environment configuration (endpoints, credentials, tuning).
#[derive(Debug, Default, serde::Deserialize)]
pub struct EnvConfig {
    /// Etherscan API key, required for the explorer source
    pub etherscan_api_key: Option<String>,

    /// Overrides of the public endpoints
    pub explorer_url: Option<String>,
    pub subgraph_url: Option<String>,
    pub rates_url: Option<String>,

    /// Number of report workers (default: 2)
    pub workers: Option<usize>,

    /// Interval between append runs (default: 60s)
    pub poll_interval_seconds: Option<u64>,

    /// Per-request timeout (default: 30s)
    pub timeout_seconds: Option<u64>,

    /// Attempts per request (default: 3)
    pub retry_attempts: Option<u32>,

    /// Transactions per provider page (default: 100)
    pub page_size: Option<u32>,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    pub fn workers(&self) -> usize {
        self.workers.unwrap_or(2).max(1)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds.unwrap_or(60).max(1))
    }

    pub fn retry(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy::new(
            self.retry_attempts.unwrap_or(defaults.attempts()),
            self.timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout()),
        )
    }
}

/// Where transactions of a protocol are fetched from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Source {
    /// Etherscan token transfers
    Explorer,
    /// Uniswap v3 subgraph swaps
    Subgraph,
}

/// CLI arguments.
#[derive(Debug, Parser)]
#[command(name = "fee-ledger")]
#[command(about = "Swap transaction ingestion and fee reconciliation")]
pub struct CliConfig {
    /// Transaction source for Uniswap v3 pools
    #[arg(long, value_enum, default_value = "subgraph")]
    pub source: Source,

    /// Currency fees are valued in (usdt, usdc)
    #[arg(long, default_value = "usdt")]
    pub fiat: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Keep the given pools up to date until interrupted
    Run {
        /// Pools to follow (comma-separated, e.g., "uniswapv3/eth_usdc")
        #[arg(long, value_delimiter = ',', default_value = "uniswapv3/eth_usdc")]
        pools: Vec<String>,
    },
    /// Compute the fee totals of a pool over a time range and exit
    Report {
        /// Pool, e.g., "uniswapv3/eth_usdc"
        #[arg(long, default_value = "uniswapv3/eth_usdc")]
        pool: String,

        /// Range start, unix seconds
        #[arg(long)]
        start: Timestamp,

        /// Range end, unix seconds (inclusive)
        #[arg(long)]
        end: Timestamp,
    },
}

impl CliConfig {
    /// Library configuration from CLI and environment.
    pub fn to_ledger_config(&self, env: &EnvConfig) -> Result<LedgerConfig, ConfigError> {
        let fiat: Currency = self
            .fiat
            .parse()
            .map_err(|_| ConfigError::InvalidCurrency(self.fiat.clone()))?;
        if fiat == Currency::Eth {
            return Err(ConfigError::InvalidCurrency(self.fiat.clone()));
        }

        let mut config = LedgerConfig::default().with_fiat(fiat).with_retry(env.retry());
        if let Some(page_size) = env.page_size {
            config = config.with_page_size(page_size);
        }
        Ok(config)
    }
}

/// Parses `protocol/pool` keys.
pub fn parse_pools(pools: &[String]) -> Result<Vec<PoolKey>, ConfigError> {
    pools
        .iter()
        .map(|p| p.parse().map_err(|_| ConfigError::InvalidPool(p.clone())))
        .collect()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid pool {0}, expected protocol/pool")]
    InvalidPool(String),

    #[error("Invalid fiat currency {0}")]
    InvalidCurrency(String),

    #[error("ETHERSCAN_API_KEY is required for the explorer source")]
    MissingApiKey,

    #[error("Range start {0} is after end {1}")]
    InvalidRange(Timestamp, Timestamp),
}
