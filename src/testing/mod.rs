//! Scripted providers and fixtures for tests.
//!
//! [`ScriptedProvider`] serves a fixed, mutable set of transactions of one
//! pool with the paging and filtering semantics of the real providers.
//! [`ScriptedRates`] serves rate windows either from a series filtered by the
//! requested start, or as a queue of canned windows.
//!
//! Both count their calls, so tests can assert that a code path did (or did
//! not) reach the network.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicU32, Ordering},
    },
};

use alloy::primitives::{Address, TxHash, U256};
use derive_more::Debug;
use fastnum::{UD256, udec256};
use itertools::Itertools;

use crate::{
    error::{Error, Result},
    provider::{PageRequest, TransactionProvider},
    rate::{RateProvider, RateSample},
    types::{CurrencyPair, Pool, PoolKey, Protocol, RawTransaction, SortDirection, Timestamp},
};

/// Gas fee of every [`raw_tx`] fixture, in wei.
pub const FIXTURE_FEE_WEI: u64 = 22_921_930_374_619_520;

/// Price of every [`minute_rates`] sample.
pub const FIXTURE_RATE: UD256 = udec256!(1800);

type ErrorFactory = Arc<dyn Fn() -> Error + Send + Sync>;

/// In-memory transaction provider.
#[derive(Clone, Debug)]
pub struct ScriptedProvider {
    transactions: Arc<RwLock<Vec<RawTransaction>>>,
    pools: Vec<Pool>,
    calls: Arc<AtomicU32>,
    #[debug(skip)]
    failure: Option<(u32, ErrorFactory)>,
}

impl ScriptedProvider {
    /// Provider serving `transactions` for every pool.
    pub fn new(transactions: Vec<RawTransaction>) -> Self {
        Self {
            transactions: Arc::new(RwLock::new(transactions)),
            pools: vec![Pool::EthUsdc, Pool::WbtcEth],
            calls: Arc::default(),
            failure: None,
        }
    }

    /// Restricts the supported pools.
    pub fn with_pools(mut self, pools: &[Pool]) -> Self {
        self.pools = pools.to_vec();
        self
    }

    /// Every fetch of the page with index `page` fails with `error()`.
    pub fn failing_on_page(
        mut self,
        page: u32,
        error: impl Fn() -> Error + Send + Sync + 'static,
    ) -> Self {
        self.failure = Some((page, Arc::new(error)));
        self
    }

    /// Adds a transaction, visible to clones as well.
    pub fn push(&self, transaction: RawTransaction) {
        if let Ok(mut transactions) = self.transactions.write() {
            transactions.push(transaction);
        }
    }

    /// Number of fetches so far, shared with clones.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransactionProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn resolve_address(&self, pool: Pool) -> Result<Address> {
        if !self.pools.contains(&pool) {
            return Err(Error::UnsupportedPool {
                pool: pool.to_string(),
                provider: self.name(),
            });
        }
        Ok(Address::with_last_byte(pool as u8 + 1))
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawTransaction>> {
        self.resolve_address(request.pool())?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((page, error)) = &self.failure
            && *page == request.page()
        {
            return Err(error());
        }

        let transactions = self
            .transactions
            .read()
            .map_err(|e| Error::Transport(e.to_string()))?;
        let matching = transactions
            .iter()
            .filter(|tx| request.times().is_none_or(|r| r.contains(tx.timestamp)))
            .filter(|tx| {
                request
                    .blocks()
                    .is_none_or(|b| b.start() <= tx.block_number && tx.block_number <= b.end())
            })
            .sorted_by_key(|tx| (tx.timestamp, tx.hash));
        let ordered: Vec<_> = match request.sort() {
            SortDirection::Ascending => matching.collect(),
            SortDirection::Descending => matching.rev().collect(),
        };

        let skip = request.page() as usize * request.limit() as usize;
        Ok(ordered
            .into_iter()
            .skip(skip)
            .take(request.limit() as usize)
            .cloned()
            .collect())
    }
}

/// In-memory rate provider.
#[derive(Debug)]
pub struct ScriptedRates {
    source: RateSource,
    window: usize,
    calls: AtomicU32,
}

#[derive(Debug)]
enum RateSource {
    Series(Vec<RateSample>),
    Windows(Mutex<VecDeque<Vec<RateSample>>>),
}

impl ScriptedRates {
    /// Serves `samples` at or after the requested start, a thousand at most.
    pub fn new(samples: Vec<RateSample>) -> Self {
        Self {
            source: RateSource::Series(samples),
            window: 1000,
            calls: AtomicU32::new(0),
        }
    }

    /// Serves the given windows in order regardless of the requested start,
    /// then empty windows.
    pub fn from_windows(windows: Vec<Vec<RateSample>>) -> Self {
        Self {
            source: RateSource::Windows(Mutex::new(windows.into())),
            ..Self::new(vec![])
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Number of historical fetches so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RateProvider for ScriptedRates {
    async fn historical(&self, _pair: CurrencyPair, start: Timestamp) -> Result<Vec<RateSample>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.source {
            RateSource::Series(samples) => Ok(samples
                .iter()
                .filter(|s| s.timestamp >= start)
                .take(self.window)
                .copied()
                .collect()),
            RateSource::Windows(windows) => Ok(windows
                .lock()
                .map_err(|e| Error::Transport(e.to_string()))?
                .pop_front()
                .unwrap_or_default()),
        }
    }

    async fn spot(&self, _pair: CurrencyPair) -> Result<UD256> {
        Ok(FIXTURE_RATE)
    }
}

/// Transaction `n` of the fixtures, mined at `timestamp` in block `timestamp`.
pub fn raw_tx(n: u64, timestamp: Timestamp) -> RawTransaction {
    RawTransaction {
        hash: TxHash::left_padding_from(&n.to_be_bytes()),
        timestamp,
        block_number: timestamp,
        fee_native: U256::from(FIXTURE_FEE_WEI),
        swap_price: None,
    }
}

/// `count` samples one minute apart from `start`, all at [`FIXTURE_RATE`].
pub fn minute_rates(start: Timestamp, count: u64) -> Vec<RateSample> {
    (0..count)
        .map(|i| RateSample::new(start + i * 60, FIXTURE_RATE))
        .collect()
}

pub fn eth_usdc() -> PoolKey {
    PoolKey::new(Protocol::UniswapV3, Pool::EthUsdc)
}
