//! Exchange rates between the native coin and fiat-like currencies.

mod binance;
mod cache;

pub use binance::BinanceRates;
pub use cache::{DEFAULT_SPOT_TTL, SpotRateCache};

use std::future::Future;

use fastnum::UD256;

use crate::{
    error::Result,
    types::{CurrencyPair, Timestamp},
};

/// Price of a pair at an instant, `quote` per one `base`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateSample {
    pub timestamp: Timestamp,
    pub price: UD256,
}

impl RateSample {
    pub fn new(timestamp: Timestamp, price: UD256) -> Self {
        Self { timestamp, price }
    }
}

/// Source of historical and current exchange rates.
pub trait RateProvider: Send + Sync {
    /// Window of samples starting at `start`, ascending by timestamp.
    /// The window length is up to the provider.
    fn historical(
        &self,
        pair: CurrencyPair,
        start: Timestamp,
    ) -> impl Future<Output = Result<Vec<RateSample>>> + Send;

    /// Current rate of the pair.
    fn spot(&self, pair: CurrencyPair) -> impl Future<Output = Result<UD256>> + Send;
}
