//! Fee ledger service.
//!
//! `run` keeps the configured pools up to date until interrupted, `report`
//! computes the fee totals of one pool over a time range and exits.

mod config;
mod error;
mod service;

use std::process::exit;

use clap::Parser;
use swap_fee_ledger::types::TimeRange;
use tracing::error;

use config::{CliConfig, Command, ConfigError, EnvConfig};

#[tokio::main]
async fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    let cli_config = CliConfig::parse();

    let ledger_config = match cli_config.to_ledger_config(&env_config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            exit(1);
        }
    };

    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ledger = match service::build_ledger(&env_config, cli_config.source, ledger_config) {
        Ok(ledger) => ledger,
        Err(e) => {
            eprintln!("Failed to create ledger: {}", e);
            exit(1);
        }
    };

    match cli_config.command {
        Command::Run { pools } => {
            let pools = match config::parse_pools(&pools) {
                Ok(pools) => pools,
                Err(e) => {
                    eprintln!("Invalid configuration: {}", e);
                    exit(1);
                }
            };
            if let Err(e) = service::run(
                &ledger,
                &pools,
                env_config.workers(),
                env_config.poll_interval(),
            )
            .await
            {
                error!(%e, "Fee ledger encountered an error, shutting down");
                exit(1);
            }
        }
        Command::Report { pool, start, end } => {
            let key = match config::parse_pools(&[pool]) {
                Ok(pools) => pools[0],
                Err(e) => {
                    eprintln!("Invalid configuration: {}", e);
                    exit(1);
                }
            };
            let Ok(range) = TimeRange::new(start, end) else {
                eprintln!("Invalid configuration: {}", ConfigError::InvalidRange(start, end));
                exit(1);
            };

            match service::report(&ledger, key, range).await {
                Ok(report) => {
                    let totals = report.aggregates.unwrap_or_default();
                    println!("pool:         {key}");
                    println!("range:        {range}");
                    println!("transactions: {}", totals.count);
                    println!("fee (wei):    {}", totals.native);
                    println!("fee ({}):   {}", ledger_config.fiat(), totals.fiat);
                    for tx in &report.transactions {
                        println!("  {} {} {}", tx.timestamp, tx.hash, tx.fee.fiat);
                    }
                }
                Err(e) => {
                    error!(%e, "Report failed");
                    exit(1);
                }
            }
        }
    }
}
