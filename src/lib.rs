//! Swap fee ledger.
//!
//! # Overview
//!
//! Keeps a local, queryable record of the swap transactions of DEX pools
//! with their gas fees valued in fiat at the historical exchange rate of the
//! moment the transaction was mined.
//!
//! Use [`Ledger::record_new_transactions`] periodically to keep the store
//! current, and [`Ledger::trigger_report_generation`] to request the fee
//! totals of an arbitrary historical range; requested ranges are fetched in
//! the background by report workers unless already covered by earlier runs.
//!
//! Transactions come from a [`provider::TransactionProvider`] selected per
//! protocol (block explorer or subgraph), rates from a
//! [`rate::RateProvider`], and everything is persisted through the
//! [`store`] traits.
//!
//! See `./tests` for end-to-end usage.
//!
//! # Limitations/follow-ups
//!
//! * Only the in-memory store backend is provided.
//!
//! * Fees are always paid and valued in the chain's native coin (ETH).
//!
//! * Jobs are not redelivered: a report that failed has to be requested
//!   again.
//!
//! # Testing
//!
//! [`testing`] module provides scripted transaction and rate providers and
//! fixtures to exercise the pipeline without network access.

pub mod config;
pub mod coverage;
pub mod error;
mod http;
pub mod ledger;
pub mod num;
pub mod pipeline;
pub mod provider;
pub mod rate;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod store;
pub mod stream;
pub mod testing;
pub mod types;

pub use config::LedgerConfig;
pub use error::{Error, Result};
pub use ledger::Ledger;
