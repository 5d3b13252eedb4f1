use alloy::primitives::{TxHash, U256};
use fastnum::UD256;

use super::{BlockInstant, BlockNumber, Pool, PoolKey, Protocol, Timestamp};
use crate::num;

/// Transaction as returned by a transaction provider, with the gas fee
/// already normalized to the smallest native unit (wei).
#[derive(Clone, Debug, PartialEq)]
pub struct RawTransaction {
    pub hash: TxHash,
    pub timestamp: Timestamp,
    pub block_number: BlockNumber,
    pub fee_native: U256,
    /// Absolute token0/token1 swap price, when the provider reports amounts.
    pub swap_price: Option<UD256>,
}

/// Gas fee paid by a transaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fee {
    /// Wei.
    pub native: U256,
    /// Fiat value at the matched historical rate.
    pub fiat: UD256,
}

/// Normalized, priced transaction as kept in the transaction store.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionRecord {
    pub hash: TxHash,
    pub protocol: Protocol,
    pub pool: Pool,
    pub timestamp: Timestamp,
    pub block_number: BlockNumber,
    pub fee: Fee,
    pub swap_price: Option<UD256>,
}

/// Running totals over a set of transactions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeeTotals {
    pub count: u64,
    pub native: U256,
    pub fiat: UD256,
}

impl Fee {
    /// Prices `native` wei at `rate` fiat per native coin.
    pub fn priced(native: U256, rate: UD256) -> Self {
        Self {
            native,
            fiat: num::fiat_value(native, rate),
        }
    }
}

impl TransactionRecord {
    pub fn new(key: PoolKey, raw: RawTransaction, rate: UD256) -> Self {
        Self {
            hash: raw.hash,
            protocol: key.protocol,
            pool: key.pool,
            timestamp: raw.timestamp,
            block_number: raw.block_number,
            fee: Fee::priced(raw.fee_native, rate),
            swap_price: raw.swap_price,
        }
    }

    pub fn key(&self) -> PoolKey {
        PoolKey::new(self.protocol, self.pool)
    }

    pub fn instant(&self) -> BlockInstant {
        BlockInstant::new(self.block_number, self.timestamp)
    }
}

impl Default for FeeTotals {
    fn default() -> Self {
        Self {
            count: 0,
            native: U256::ZERO,
            fiat: UD256::ZERO,
        }
    }
}

impl FeeTotals {
    pub fn add(&mut self, fee: &Fee) {
        self.count += 1;
        self.native = self.native.saturating_add(fee.native);
        self.fiat = self.fiat + fee.fiat;
    }
}

impl<'a> FromIterator<&'a TransactionRecord> for FeeTotals {
    fn from_iter<I: IntoIterator<Item = &'a TransactionRecord>>(iter: I) -> Self {
        let mut totals = Self::default();
        for record in iter {
            totals.add(&record.fee);
        }
        totals
    }
}
