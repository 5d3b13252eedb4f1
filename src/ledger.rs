use std::sync::Arc;

use alloy::primitives::TxHash;
use fastnum::UD256;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    config::LedgerConfig,
    error::Result,
    pipeline::Pipeline,
    provider::{ProviderSet, TransactionProvider},
    rate::{RateProvider, SpotRateCache},
    report::{self, JobReceiver, Report, ReportJob, ReportQueue, ReportStatus, ReportWorker},
    store::{Page, Store, TransactionFilter},
    types::{
        Currency, CurrencyPair, FeeTotals, JobId, Pool, PoolKey, Protocol, TimeRange, Timestamp,
        TransactionRecord,
    },
};

/// Entry point of the library: ingestion, reports and queries over one store.
///
/// Report jobs are only processed while workers started with
/// [`Ledger::start_workers`] are running.
#[derive(Debug)]
pub struct Ledger<P, R, S> {
    pipeline: Arc<Pipeline<P, R, S>>,
    rates: Arc<R>,
    store: Arc<S>,
    queue: ReportQueue,
    jobs: JobReceiver,
    spot: SpotRateCache,
    shutdown: CancellationToken,
}

impl<P, R, S> Ledger<P, R, S>
where
    P: TransactionProvider + 'static,
    R: RateProvider + 'static,
    S: Store + 'static,
{
    pub fn new(providers: ProviderSet<P>, rates: R, store: S, config: LedgerConfig) -> Self {
        let rates = Arc::new(rates);
        let store = Arc::new(store);
        let (queue, jobs) = report::queue::channel();
        Self {
            pipeline: Arc::new(Pipeline::new(providers, rates.clone(), store.clone(), config)),
            rates,
            store,
            queue,
            jobs,
            spot: SpotRateCache::new(config.spot_ttl()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline<P, R, S> {
        &self.pipeline
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Token cancelling ingestion runs and workers of this ledger.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns `count` report workers sharing the queue.
    pub fn start_workers(&self, count: usize) -> Vec<JoinHandle<()>> {
        (0..count.max(1))
            .map(|id| {
                ReportWorker::new(id, self.pipeline.clone(), self.store.clone(), self.jobs.clone())
                    .spawn(self.shutdown.child_token())
            })
            .collect()
    }

    /// Ingests the transactions of the pool newer than the stored ones.
    pub async fn record_new_transactions(&self, protocol: Protocol, pool: Pool) -> Result<FeeTotals> {
        self.pipeline
            .append(PoolKey::new(protocol, pool), &self.shutdown)
            .await
    }

    /// Creates a pending report job for `[start, end]` and enqueues it.
    pub async fn trigger_report_generation(
        &self,
        protocol: Protocol,
        pool: Pool,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<JobId> {
        let key = PoolKey::new(protocol, pool);
        let range = TimeRange::new(start, end)?;
        self.pipeline.check(key)?;

        let job = ReportJob::new(key, range);
        let id = job.id();
        self.store.insert_job(job).await?;
        if let Err(e) = self.queue.enqueue(id) {
            self.store.remove_job(id).await?;
            return Err(e);
        }
        info!(%id, %key, %range, "Report requested");
        Ok(id)
    }

    pub async fn get_report_status(&self, id: JobId) -> Result<Option<ReportStatus>> {
        Ok(self.store.job(id).await?.map(|job| job.status()))
    }

    /// Job with a page of its transactions, ascending by timestamp.
    pub async fn get_report(&self, id: JobId, page: u32, limit: u32) -> Result<Option<Report>> {
        let Some(job) = self.store.job(id).await? else {
            return Ok(None);
        };
        let filter = TransactionFilter::within(job.key(), job.range());
        let total = self.store.count(filter).await?;
        let transactions = self.store.find(filter, Page::new(page, limit)).await?;
        Ok(Some(Report {
            aggregates: job.aggregates(),
            job,
            page,
            limit,
            total,
            transactions,
        }))
    }

    pub async fn get_transaction_by_hash(
        &self,
        protocol: Protocol,
        pool: Pool,
        hash: TxHash,
    ) -> Result<Option<TransactionRecord>> {
        self.store
            .find_by_hash(PoolKey::new(protocol, pool), hash)
            .await
    }

    /// Stored transactions of the pool, ascending by timestamp.
    pub async fn get_transaction_list(
        &self,
        protocol: Protocol,
        pool: Pool,
        page: u32,
        limit: u32,
    ) -> Result<Vec<TransactionRecord>> {
        let filter = TransactionFilter::pool(PoolKey::new(protocol, pool));
        self.store.find(filter, Page::new(page, limit)).await
    }

    pub async fn get_transaction_count(&self, protocol: Protocol, pool: Pool) -> Result<u64> {
        let filter = TransactionFilter::pool(PoolKey::new(protocol, pool));
        self.store.count(filter).await
    }

    /// Current rate of `from` in `to`, cached briefly.
    pub async fn exchange_rate(&self, from: Currency, to: Currency) -> Result<UD256> {
        let pair = CurrencyPair::new(from, to);
        self.spot
            .get_or_fetch(pair, || self.rates.spot(pair))
            .await
    }

    /// Cancels running ingestion and stops the workers.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
