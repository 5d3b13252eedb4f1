mod transaction;

pub use transaction::*;

use std::{fmt, str::FromStr};

use crate::error::Error;

/// Unix timestamp, seconds.
pub type Timestamp = u64;

/// Chain block number.
pub type BlockNumber = u64;

/// ID of a report job.
pub type JobId = uuid::Uuid;

/// On-chain venue a pool belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Protocol {
    UniswapV3,
}

/// Liquidity pair transactions are scoped to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pool {
    EthUsdc,
    WbtcEth,
}

/// Currencies exchange rates are tracked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Currency {
    Eth,
    Usdt,
    Usdc,
}

/// Ordered pair of currencies, price is quoted as `quote` per one `base`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

/// Scope of ingested transactions, coverage intervals and reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolKey {
    pub protocol: Protocol,
    pub pool: Pool,
}

/// Instant in chain history a transaction is anchored at.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Eq, Ord, Hash, Default)]
pub struct BlockInstant {
    block_number: BlockNumber,
    timestamp: Timestamp,
}

/// Closed time range `[start, end]`, unix seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeRange {
    start: Timestamp,
    end: Timestamp,
}

/// Closed block range `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockRange {
    start: BlockNumber,
    end: BlockNumber,
}

/// Order transactions are requested in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UniswapV3 => "uniswapv3",
        }
    }
}

impl Pool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EthUsdc => "eth_usdc",
            Self::WbtcEth => "wbtc_eth",
        }
    }
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eth => "ETH",
            Self::Usdt => "USDT",
            Self::Usdc => "USDC",
        }
    }
}

impl CurrencyPair {
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// Exchange symbol of the pair, e.g. `ETHUSDT`.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base.symbol(), self.quote.symbol())
    }
}

impl PoolKey {
    pub fn new(protocol: Protocol, pool: Pool) -> Self {
        Self { protocol, pool }
    }
}

impl BlockInstant {
    pub fn new(block_number: BlockNumber, timestamp: Timestamp) -> Self {
        Self {
            block_number,
            timestamp,
        }
    }

    pub fn block_number(&self) -> BlockNumber {
        self.block_number
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

impl TimeRange {
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidRange(start, end));
        }
        Ok(Self { start, end })
    }

    /// Open-ended range starting at `start`.
    pub fn since(start: Timestamp) -> Self {
        Self {
            start,
            end: Timestamp::MAX,
        }
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn is_open_ended(&self) -> bool {
        self.end == Timestamp::MAX
    }

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// Whether `other` lies entirely within this range.
    pub fn covers(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl BlockRange {
    /// Open-ended range starting at `start`.
    pub fn since(start: BlockNumber) -> Self {
        Self {
            start,
            end: BlockNumber::MAX,
        }
    }

    pub fn start(&self) -> BlockNumber {
        self.start
    }

    pub fn end(&self) -> BlockNumber {
        self.end
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.pool)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniswapv3" => Ok(Self::UniswapV3),
            _ => Err(Error::UnsupportedProtocol(s.to_string())),
        }
    }
}

impl FromStr for Pool {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eth_usdc" => Ok(Self::EthUsdc),
            "wbtc_eth" => Ok(Self::WbtcEth),
            _ => Err(Error::UnsupportedPool {
                pool: s.to_string(),
                provider: "any",
            }),
        }
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eth" => Ok(Self::Eth),
            "usdt" => Ok(Self::Usdt),
            "usdc" => Ok(Self::Usdc),
            _ => Err(Error::UnsupportedCurrency(s.to_string())),
        }
    }
}

/// Parses `protocol/pool` or `protocol:pool`.
impl FromStr for PoolKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (protocol, pool) = s
            .split_once(['/', ':'])
            .ok_or_else(|| Error::Config(format!("expected protocol/pool, got {s:?}")))?;
        Ok(Self::new(protocol.trim().parse()?, pool.trim().parse()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_key_parsing() {
        let key: PoolKey = "uniswapv3/eth_usdc".parse().unwrap();
        assert_eq!(key, PoolKey::new(Protocol::UniswapV3, Pool::EthUsdc));
        let key: PoolKey = "UniswapV3:WBTC_ETH".parse().unwrap();
        assert_eq!(key, PoolKey::new(Protocol::UniswapV3, Pool::WbtcEth));
        assert_eq!(key.to_string(), "uniswapv3/wbtc_eth");

        assert!(matches!(
            "sushiswap/eth_usdc".parse::<PoolKey>(),
            Err(Error::UnsupportedProtocol(_))
        ));
        assert!(matches!(
            "uniswapv3/doge_eth".parse::<PoolKey>(),
            Err(Error::UnsupportedPool { .. })
        ));
        assert!(matches!("uniswapv3".parse::<PoolKey>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_time_range() {
        assert!(matches!(TimeRange::new(10, 5), Err(Error::InvalidRange(10, 5))));

        let range = TimeRange::new(5, 10).unwrap();
        assert!(range.contains(5));
        assert!(range.contains(10));
        assert!(!range.contains(11));
        assert!(range.covers(&TimeRange::new(6, 10).unwrap()));
        assert!(!range.covers(&TimeRange::new(4, 10).unwrap()));
        assert!(TimeRange::since(100).is_open_ended());
    }

    #[test]
    fn test_currency_pair_symbol() {
        let pair = CurrencyPair::new(Currency::Eth, Currency::Usdt);
        assert_eq!(pair.symbol(), "ETHUSDT");
        assert_eq!(pair.to_string(), "ETH/USDT");
    }
}
