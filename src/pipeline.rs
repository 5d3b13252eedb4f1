//! Ingestion of provider pages into the transaction store.
//!
//! Both modes share one loop: page stream, rate reconciliation, idempotent
//! upsert and coverage extension, strictly in fetch order.
//!
//! - [`Pipeline::append`] continues from the newest stored transaction of a
//!   pool, or from the newest on-chain one when nothing is stored yet.
//! - [`Pipeline::backfill`] fills a closed time range, skipping the provider
//!   entirely when the range is already covered.

use std::{collections::HashSet, pin::pin, sync::Arc};

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    config::LedgerConfig,
    coverage::CoverageTracker,
    error::{Error, Result},
    provider::{PageRequest, ProviderSet, TransactionProvider},
    rate::RateProvider,
    reconcile::Reconciler,
    store::{Store, TransactionFilter},
    stream,
    types::{
        BlockInstant, BlockRange, Currency, CurrencyPair, FeeTotals, PoolKey, SortDirection,
        TimeRange, Timestamp, TransactionRecord,
    },
};

/// Result of a backfill run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackfillOutcome {
    /// Totals over the requested range.
    pub totals: FeeTotals,
    /// Whether the range was served from the store without fetching.
    pub cache_hit: bool,
}

#[derive(Debug)]
pub struct Pipeline<P, R, S> {
    providers: ProviderSet<P>,
    rates: Arc<R>,
    store: Arc<S>,
    coverage: CoverageTracker<S>,
    config: LedgerConfig,
}

impl<P, R, S> Pipeline<P, R, S>
where
    P: TransactionProvider,
    R: RateProvider,
    S: Store,
{
    pub fn new(
        providers: ProviderSet<P>,
        rates: Arc<R>,
        store: Arc<S>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            providers,
            rates,
            coverage: CoverageTracker::new(store.clone()),
            store,
            config,
        }
    }

    pub fn coverage(&self) -> &CoverageTracker<S> {
        &self.coverage
    }

    /// Native coin priced against the configured fiat currency.
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(Currency::Eth, self.config.fiat())
    }

    /// Validates that `key` is served, without any I/O.
    pub fn check(&self, key: PoolKey) -> Result<()> {
        self.providers.get(key.protocol)?.resolve_address(key.pool)?;
        Ok(())
    }

    /// Ingests everything newer than the last known transaction of the pool.
    ///
    /// The boundary transaction is fetched again and collapses through the
    /// upsert. Returns the totals of the transactions processed by this run.
    pub async fn append(&self, key: PoolKey, cancel: &CancellationToken) -> Result<FeeTotals> {
        self.check(key)?;
        let provider = self.providers.get(key.protocol)?;

        let from = match self.store.latest(key).await? {
            Some(record) => record.instant(),
            None => match self.newest(provider.as_ref(), key).await? {
                Some(instant) => instant,
                None => {
                    info!(%key, "No transactions yet");
                    return Ok(FeeTotals::default());
                }
            },
        };

        let times = TimeRange::since(from.timestamp());
        let request = PageRequest::new(key.pool, self.config.page_size())
            .with_blocks(BlockRange::since(from.block_number()))
            .with_times(times);
        let (totals, _) = self.ingest(provider.as_ref(), key, request, times, cancel).await?;
        info!(
            %key,
            from_block = from.block_number(),
            count = totals.count,
            fiat = %totals.fiat,
            "Appended transactions"
        );
        Ok(totals)
    }

    /// Ensures `range` of the pool is in the store and returns its totals.
    pub async fn backfill(
        &self,
        key: PoolKey,
        range: TimeRange,
        cancel: &CancellationToken,
    ) -> Result<BackfillOutcome> {
        self.check(key)?;
        if self.coverage.contains(key, range.start(), range.end()).await? {
            let totals = self
                .store
                .totals(TransactionFilter::within(key, range))
                .await?;
            info!(%key, %range, count = totals.count, "Range already covered");
            return Ok(BackfillOutcome {
                totals,
                cache_hit: true,
            });
        }

        let provider = self.providers.get(key.protocol)?;
        let request = PageRequest::new(key.pool, self.config.page_size()).with_times(range);
        let (totals, newest) = self.ingest(provider.as_ref(), key, request, range, cancel).await?;

        // Time after the newest known transaction may still receive some.
        let final_end = match newest {
            Some(newest) if newest > range.end() => Some(range.end()),
            _ => self
                .newest(provider.as_ref(), key)
                .await?
                .map(|head| head.timestamp().min(range.end())),
        };
        match final_end {
            Some(end) if end >= range.start() => {
                self.coverage.insert(key, range.start(), end).await?;
            }
            _ => debug!(%key, %range, "Range not final yet, coverage unchanged"),
        }
        info!(%key, %range, count = totals.count, fiat = %totals.fiat, "Backfilled range");

        Ok(BackfillOutcome {
            totals,
            cache_hit: false,
        })
    }

    async fn newest(&self, provider: &P, key: PoolKey) -> Result<Option<BlockInstant>> {
        let request = PageRequest::new(key.pool, 1).with_sort(SortDirection::Descending);
        let newest = provider.fetch_page(&request).await?;
        Ok(newest
            .first()
            .map(|tx| BlockInstant::new(tx.block_number, tx.timestamp)))
    }

    /// Returns the totals of the stored transactions and the newest timestamp
    /// the provider returned, inside the range or not.
    async fn ingest(
        &self,
        provider: &P,
        key: PoolKey,
        request: PageRequest,
        range: TimeRange,
        cancel: &CancellationToken,
    ) -> Result<(FeeTotals, Option<Timestamp>)> {
        let mut reconciler = Reconciler::new(self.rates.as_ref(), self.pair())
            .with_max_lookahead(self.config.max_lookahead());
        let mut seen = HashSet::new();
        let mut totals = FeeTotals::default();
        let mut newest = None;
        let mut pages = pin!(stream::pages(provider, request));

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let Some(page) = pages.next().await else {
                break;
            };
            let page = page?;
            newest = page.iter().map(|tx| tx.timestamp).chain(newest).max();
            // Ascending pages past the range cannot yield anything further.
            let past_end = page.last().is_some_and(|tx| tx.timestamp > range.end());

            let fresh: Vec<_> = page
                .into_iter()
                .filter(|tx| range.contains(tx.timestamp) && seen.insert(tx.hash))
                .collect();
            if let (Some(first), Some(last)) = (fresh.first(), fresh.last()) {
                let (first, last) = (first.timestamp, last.timestamp);
                let samples = reconciler.price(&fresh).await?;
                let records: Vec<_> = fresh
                    .into_iter()
                    .zip(samples)
                    .map(|(raw, sample)| TransactionRecord::new(key, raw, sample.price))
                    .collect();
                records.iter().for_each(|record| totals.add(&record.fee));
                debug!(%key, count = records.len(), first, last, "Storing page");

                self.store.upsert(records).await?;
                self.coverage.insert(key, first, last).await?;
            }

            if past_end {
                break;
            }
        }
        Ok((totals, newest))
    }
}
