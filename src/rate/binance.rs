use fastnum::UD256;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{RateProvider, RateSample};
use crate::{
    error::{Error, Result},
    http, num,
    retry::RetryPolicy,
    types::{CurrencyPair, Timestamp},
};

pub const BINANCE_URL: &str = "https://api.binance.com";

/// One-minute candles, a thousand per window.
const KLINE_INTERVAL: &str = "1m";
const KLINE_LIMIT: u32 = 1000;

/// Exchange rates from Binance spot market data.
///
/// Historical samples are one-minute candle close prices stamped with the
/// candle open time.
#[derive(Clone, Debug)]
pub struct BinanceRates {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

impl BinanceRates {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
            retry: RetryPolicy::default(),
        }
    }

    pub fn public() -> Result<Self> {
        Ok(Self::new(Url::parse(BINANCE_URL)?))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }
}

fn parse_kline(kline: &[serde_json::Value]) -> Result<RateSample> {
    let open_time = kline
        .first()
        .and_then(|v| v.as_u64())
        .ok_or_else(|| Error::Decode(format!("kline without open time: {kline:?}")))?;
    let close = kline
        .get(4)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Decode(format!("kline without close price: {kline:?}")))?;
    Ok(RateSample::new(open_time / 1000, num::parse_decimal(close)?))
}

impl RateProvider for BinanceRates {
    async fn historical(&self, pair: CurrencyPair, start: Timestamp) -> Result<Vec<RateSample>> {
        let url = self.endpoint("/api/v3/klines")?;
        let query = [
            ("symbol", pair.symbol()),
            ("interval", KLINE_INTERVAL.to_string()),
            ("limit", KLINE_LIMIT.to_string()),
            ("startTime", start.saturating_mul(1000).to_string()),
        ];
        let klines: Vec<Vec<serde_json::Value>> = self
            .retry
            .run("binance klines", || {
                http::send_json(self.client.get(url.clone()).query(&query))
            })
            .await?;
        debug!(%pair, start, count = klines.len(), "Fetched historical rates");

        klines.iter().map(|k| parse_kline(k)).collect()
    }

    async fn spot(&self, pair: CurrencyPair) -> Result<UD256> {
        let url = self.endpoint("/api/v3/ticker/price")?;
        let symbol = [("symbol", pair.symbol())];
        let ticker: TickerPrice = self
            .retry
            .run("binance ticker", || {
                http::send_json(self.client.get(url.clone()).query(&symbol))
            })
            .await?;
        num::parse_decimal(&ticker.price)
    }
}
