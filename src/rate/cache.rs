use std::{future::Future, time::Duration};

use derive_more::Debug;
use fastnum::UD256;
use moka::future::Cache;

use crate::{error::Result, types::CurrencyPair};

/// Default time a spot rate is served from cache.
pub const DEFAULT_SPOT_TTL: Duration = Duration::from_secs(4);

/// Short-lived cache of spot rates by pair.
#[derive(Clone, Debug)]
pub struct SpotRateCache {
    #[debug(skip)]
    entries: Cache<CurrencyPair, UD256>,
}

impl Default for SpotRateCache {
    fn default() -> Self {
        Self::new(DEFAULT_SPOT_TTL)
    }
}

impl SpotRateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().max_capacity(64).time_to_live(ttl).build(),
        }
    }

    /// Fresh cached rate, if any.
    pub async fn get(&self, pair: CurrencyPair) -> Option<UD256> {
        self.entries.get(&pair).await
    }

    /// Cached rate of the pair, or the result of `fetch` which is then cached.
    /// Failures are not cached.
    pub async fn get_or_fetch<F, Fut>(&self, pair: CurrencyPair, fetch: F) -> Result<UD256>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<UD256>>,
    {
        if let Some(rate) = self.get(pair).await {
            return Ok(rate);
        }
        let rate = fetch().await?;
        self.entries.insert(pair, rate).await;
        Ok(rate)
    }
}
