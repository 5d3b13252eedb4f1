use std::collections::{BTreeSet, HashMap};

use alloy::primitives::{B256, TxHash};
use dashmap::DashMap;
use tokio::sync::RwLock;

use super::{IntervalStore, Page, ReportStore, TransactionFilter, TransactionStore};
use crate::{
    error::{Error, Result},
    report::ReportJob,
    types::{FeeTotals, JobId, PoolKey, TimeRange, Timestamp, TransactionRecord},
};

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    transactions: RwLock<Transactions>,
    intervals: DashMap<PoolKey, Vec<TimeRange>>,
    reports: DashMap<JobId, ReportJob>,
}

#[derive(Debug, Default)]
struct Transactions {
    by_hash: HashMap<TxHash, TransactionRecord>,
    // Time-ordered index, the hash breaks timestamp ties.
    ordered: BTreeSet<(PoolKey, Timestamp, TxHash)>,
}

impl Transactions {
    fn upsert(&mut self, record: TransactionRecord) {
        if let Some(previous) = self.by_hash.get(&record.hash) {
            self.ordered
                .remove(&(previous.key(), previous.timestamp, previous.hash));
        }
        self.ordered
            .insert((record.key(), record.timestamp, record.hash));
        self.by_hash.insert(record.hash, record);
    }

    fn matching(
        &self,
        filter: TransactionFilter,
    ) -> impl DoubleEndedIterator<Item = &TransactionRecord> {
        let range = filter.range.unwrap_or(TimeRange::since(0));
        let lower = (filter.key, range.start(), B256::ZERO);
        let upper = (filter.key, range.end(), B256::repeat_byte(0xff));
        self.ordered
            .range(lower..=upper)
            .filter_map(|(_, _, hash)| self.by_hash.get(hash))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for MemoryStore {
    async fn upsert(&self, records: Vec<TransactionRecord>) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        for record in records {
            transactions.upsert(record);
        }
        Ok(())
    }

    async fn find_by_hash(&self, key: PoolKey, hash: TxHash) -> Result<Option<TransactionRecord>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .by_hash
            .get(&hash)
            .filter(|record| record.key() == key)
            .cloned())
    }

    async fn find(&self, filter: TransactionFilter, page: Page) -> Result<Vec<TransactionRecord>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .matching(filter)
            .skip(page.skip())
            .take(page.limit as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: TransactionFilter) -> Result<u64> {
        let transactions = self.transactions.read().await;
        Ok(transactions.matching(filter).count() as u64)
    }

    async fn totals(&self, filter: TransactionFilter) -> Result<FeeTotals> {
        let transactions = self.transactions.read().await;
        Ok(transactions.matching(filter).collect())
    }

    async fn latest(&self, key: PoolKey) -> Result<Option<TransactionRecord>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .matching(TransactionFilter::pool(key))
            .next_back()
            .cloned())
    }
}

impl IntervalStore for MemoryStore {
    async fn intervals(&self, key: PoolKey) -> Result<Vec<TimeRange>> {
        Ok(self
            .intervals
            .get(&key)
            .map(|intervals| intervals.clone())
            .unwrap_or_default())
    }

    async fn replace_intervals(&self, key: PoolKey, intervals: Vec<TimeRange>) -> Result<()> {
        self.intervals.insert(key, intervals);
        Ok(())
    }
}

impl ReportStore for MemoryStore {
    async fn insert_job(&self, job: ReportJob) -> Result<()> {
        self.reports.insert(job.id(), job);
        Ok(())
    }

    async fn job(&self, id: JobId) -> Result<Option<ReportJob>> {
        Ok(self.reports.get(&id).map(|job| job.clone()))
    }

    async fn update_job(&self, job: ReportJob) -> Result<()> {
        match self.reports.get_mut(&job.id()) {
            Some(mut stored) => {
                *stored = job;
                Ok(())
            }
            None => Err(Error::JobNotFound(job.id())),
        }
    }

    async fn remove_job(&self, id: JobId) -> Result<bool> {
        Ok(self.reports.remove(&id).is_some())
    }
}
