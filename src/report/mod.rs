//! Asynchronous fee reports.
//!
//! A report request persists a [`ReportJob`] in [`ReportStatus::Pending`] and
//! enqueues its ID. A [`ReportWorker`] picks it up, backfills the requested
//! range through the pipeline and records the totals, or marks the job
//! failed. Callers poll the job by ID.

mod job;
pub mod queue;
mod worker;

pub use job::{ReportJob, ReportStatus};
pub use queue::{JobReceiver, ReportQueue};
pub use worker::ReportWorker;

use crate::types::{FeeTotals, TransactionRecord};

/// Page of a report with the job it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    pub job: ReportJob,
    /// Set once the job is completed.
    pub aggregates: Option<FeeTotals>,
    pub page: u32,
    pub limit: u32,
    /// Stored transactions of the job's pool within its range.
    pub total: u64,
    pub transactions: Vec<TransactionRecord>,
}
