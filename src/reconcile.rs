//! Pairing of transactions with historical exchange rates.
//!
//! Transactions arrive ascending by timestamp. Each one is priced with the
//! first rate sample at or after its timestamp, found by scanning a window of
//! samples forward. Samples before a match are dropped and never revisited,
//! so a run over `n` transactions and `m` samples is `O(n + m)` apart from
//! the window fetches.

use std::collections::VecDeque;

use tracing::trace;

use crate::{
    error::{Error, Result},
    rate::{RateProvider, RateSample},
    types::{CurrencyPair, RawTransaction, Timestamp},
};

/// Consecutive window fetches allowed without finding a matching sample.
pub const DEFAULT_MAX_LOOKAHEAD: u32 = 4;

/// Forward cursor over the rate windows of one pipeline run.
///
/// State persists across [`Reconciler::price`] calls so that consecutive
/// pages of the same run share windows and ordering checks.
#[derive(Debug)]
pub struct Reconciler<'a, R> {
    rates: &'a R,
    pair: CurrencyPair,
    max_lookahead: u32,
    window: VecDeque<RateSample>,
    newest_sample: Option<Timestamp>,
    last_seen: Option<Timestamp>,
}

impl<'a, R: RateProvider> Reconciler<'a, R> {
    pub fn new(rates: &'a R, pair: CurrencyPair) -> Self {
        Self {
            rates,
            pair,
            max_lookahead: DEFAULT_MAX_LOOKAHEAD,
            window: VecDeque::new(),
            newest_sample: None,
            last_seen: None,
        }
    }

    /// Zero is treated as one.
    pub fn with_max_lookahead(mut self, max_lookahead: u32) -> Self {
        self.max_lookahead = max_lookahead.max(1);
        self
    }

    /// Rate sample for each transaction, in input order.
    ///
    /// Fails with [`Error::Unordered`] when a transaction is older than its
    /// predecessor, including the last one of a previous call.
    pub async fn price(&mut self, transactions: &[RawTransaction]) -> Result<Vec<RateSample>> {
        let mut samples = Vec::with_capacity(transactions.len());
        for tx in transactions {
            if self.last_seen.is_some_and(|last| tx.timestamp < last) {
                return Err(Error::Unordered(tx.hash));
            }
            self.last_seen = Some(tx.timestamp);
            samples.push(self.rate_at(tx.timestamp).await?);
        }
        Ok(samples)
    }

    async fn rate_at(&mut self, timestamp: Timestamp) -> Result<RateSample> {
        let mut fetches = 0;
        loop {
            while let Some(sample) = self.window.front() {
                if sample.timestamp >= timestamp {
                    return Ok(*sample);
                }
                self.window.pop_front();
            }

            if fetches == self.max_lookahead {
                return Err(self.unavailable(timestamp));
            }
            fetches += 1;

            let start = self.newest_sample.map_or(timestamp, |newest| newest.max(timestamp));
            let fresh = self.rates.historical(self.pair, start).await?;
            let before = self.newest_sample;
            self.window.extend(
                fresh
                    .into_iter()
                    .filter(|s| before.is_none_or(|newest| s.timestamp > newest)),
            );
            match self.window.back() {
                Some(last) if Some(last.timestamp) != before => {
                    self.newest_sample = Some(last.timestamp);
                    trace!(pair = %self.pair, start, samples = self.window.len(), "Fetched rate window");
                }
                _ => return Err(self.unavailable(timestamp)),
            }
        }
    }

    fn unavailable(&self, timestamp: Timestamp) -> Error {
        Error::RateUnavailable {
            pair: self.pair,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use fastnum::udec256;

    use super::*;
    use crate::{
        testing::{ScriptedRates, minute_rates, raw_tx},
        types::Currency,
    };

    fn pair() -> CurrencyPair {
        CurrencyPair::new(Currency::Eth, Currency::Usdt)
    }

    fn txs(timestamps: &[Timestamp]) -> Vec<RawTransaction> {
        timestamps
            .iter()
            .enumerate()
            .map(|(i, ts)| raw_tx(i as u64, *ts))
            .collect()
    }

    #[tokio::test]
    async fn test_first_sample_at_or_after_transaction() {
        let rates = ScriptedRates::new(minute_rates(0, 10)).with_window(3);
        let mut reconciler = Reconciler::new(&rates, pair());

        let assigned = reconciler
            .price(&txs(&[0, 30, 59, 60, 61, 200, 200]))
            .await
            .unwrap();
        let timestamps: Vec<_> = assigned.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![0, 60, 60, 60, 120, 240, 240]);
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(assigned[0].price, udec256!(1800));
    }

    #[tokio::test]
    async fn test_window_is_shared_across_pages() {
        let rates = ScriptedRates::new(minute_rates(0, 100));
        let mut reconciler = Reconciler::new(&rates, pair());

        reconciler.price(&txs(&[10, 20])).await.unwrap();
        reconciler.price(&txs(&[30, 90])).await.unwrap();
        assert_eq!(rates.calls(), 1);

        let err = reconciler.price(&txs(&[80])).await.unwrap_err();
        assert!(matches!(err, Error::Unordered(_)));
    }

    #[tokio::test]
    async fn test_unordered_page_is_rejected() {
        let rates = ScriptedRates::new(minute_rates(0, 10));
        let mut reconciler = Reconciler::new(&rates, pair());

        let err = reconciler.price(&txs(&[120, 60])).await.unwrap_err();
        assert!(matches!(err, Error::Unordered(hash) if hash == raw_tx(1, 60).hash));
    }

    #[tokio::test]
    async fn test_no_rate_after_transaction() {
        let rates = ScriptedRates::new(minute_rates(0, 5));
        let mut reconciler = Reconciler::new(&rates, pair());

        let err = reconciler.price(&txs(&[100, 1_000])).await.unwrap_err();
        assert!(matches!(
            err,
            Error::RateUnavailable { timestamp: 1_000, .. }
        ));
    }

    #[tokio::test]
    async fn test_lagging_windows_stop_at_lookahead() {
        let windows = (0..10)
            .map(|i| minute_rates(i * 120, 2))
            .collect::<Vec<_>>();
        let rates = ScriptedRates::from_windows(windows);
        let mut reconciler = Reconciler::new(&rates, pair()).with_max_lookahead(3);

        let err = reconciler.price(&txs(&[5_000])).await.unwrap_err();
        assert!(matches!(err, Error::RateUnavailable { timestamp: 5_000, .. }));
        assert_eq!(rates.calls(), 3);
    }

    #[tokio::test]
    async fn test_non_advancing_window_fails_fast() {
        let rates = ScriptedRates::from_windows(vec![minute_rates(0, 2), minute_rates(0, 2)]);
        let mut reconciler = Reconciler::new(&rates, pair());

        let err = reconciler.price(&txs(&[1_000])).await.unwrap_err();
        assert!(matches!(err, Error::RateUnavailable { .. }));
        assert_eq!(rates.calls(), 2);
    }
}
