//! Persistence seams of the ledger.
//!
//! Three stores back the pipeline: priced transactions, coverage intervals
//! and report jobs. [`MemoryStore`] implements all of them in process.

mod memory;

pub use memory::MemoryStore;

use std::future::Future;

use alloy::primitives::TxHash;

use crate::{
    error::Result,
    report::ReportJob,
    types::{FeeTotals, JobId, PoolKey, TimeRange, TransactionRecord},
};

/// Selects the transactions of a pool, optionally within a time range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionFilter {
    pub key: PoolKey,
    pub range: Option<TimeRange>,
}

impl TransactionFilter {
    pub fn pool(key: PoolKey) -> Self {
        Self { key, range: None }
    }

    pub fn within(key: PoolKey, range: TimeRange) -> Self {
        Self {
            key,
            range: Some(range),
        }
    }
}

/// Offset pagination, `index * limit` records are skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub index: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(index: u32, limit: u32) -> Self {
        Self { index, limit }
    }

    pub fn skip(&self) -> usize {
        self.index as usize * self.limit as usize
    }
}

/// Priced transactions, unique by hash.
pub trait TransactionStore: Send + Sync {
    /// Inserts the records, overwriting any record with the same hash.
    fn upsert(&self, records: Vec<TransactionRecord>) -> impl Future<Output = Result<()>> + Send;

    fn find_by_hash(
        &self,
        key: PoolKey,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<TransactionRecord>>> + Send;

    /// Matching records ascending by timestamp.
    fn find(
        &self,
        filter: TransactionFilter,
        page: Page,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>>> + Send;

    fn count(&self, filter: TransactionFilter) -> impl Future<Output = Result<u64>> + Send;

    /// Count and fee sums of the matching records.
    fn totals(&self, filter: TransactionFilter) -> impl Future<Output = Result<FeeTotals>> + Send;

    /// Most recent record of the pool.
    fn latest(
        &self,
        key: PoolKey,
    ) -> impl Future<Output = Result<Option<TransactionRecord>>> + Send;
}

/// Coverage intervals by pool.
pub trait IntervalStore: Send + Sync {
    /// Stored intervals of the pool, sorted by start.
    fn intervals(&self, key: PoolKey) -> impl Future<Output = Result<Vec<TimeRange>>> + Send;

    /// Replaces the full interval set of the pool.
    fn replace_intervals(
        &self,
        key: PoolKey,
        intervals: Vec<TimeRange>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Report jobs by ID.
pub trait ReportStore: Send + Sync {
    fn insert_job(&self, job: ReportJob) -> impl Future<Output = Result<()>> + Send;

    fn job(&self, id: JobId) -> impl Future<Output = Result<Option<ReportJob>>> + Send;

    /// Overwrites a stored job, unknown IDs are [`crate::Error::JobNotFound`].
    fn update_job(&self, job: ReportJob) -> impl Future<Output = Result<()>> + Send;

    /// Deletes a job, returning whether it existed.
    fn remove_job(&self, id: JobId) -> impl Future<Output = Result<bool>> + Send;
}

/// Backend providing every store.
pub trait Store: TransactionStore + IntervalStore + ReportStore {}

impl<T: TransactionStore + IntervalStore + ReportStore> Store for T {}
