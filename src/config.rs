use std::time::Duration;

use crate::{
    provider::DEFAULT_PAGE_SIZE,
    rate::DEFAULT_SPOT_TTL,
    reconcile::DEFAULT_MAX_LOOKAHEAD,
    retry::RetryPolicy,
    types::Currency,
};

/// Tunables of a [`crate::Ledger`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LedgerConfig {
    page_size: u32,
    retry: RetryPolicy,
    max_lookahead: u32,
    fiat: Currency,
    spot_ttl: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            retry: RetryPolicy::default(),
            max_lookahead: DEFAULT_MAX_LOOKAHEAD,
            fiat: Currency::Usdt,
            spot_ttl: DEFAULT_SPOT_TTL,
        }
    }
}

impl LedgerConfig {
    /// Transactions requested per provider page, at least one.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Retry policy for provider requests.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_lookahead(mut self, max_lookahead: u32) -> Self {
        self.max_lookahead = max_lookahead.max(1);
        self
    }

    /// Currency fees are valued in.
    pub fn with_fiat(mut self, fiat: Currency) -> Self {
        self.fiat = fiat;
        self
    }

    pub fn with_spot_ttl(mut self, spot_ttl: Duration) -> Self {
        self.spot_ttl = spot_ttl;
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn max_lookahead(&self) -> u32 {
        self.max_lookahead
    }

    pub fn fiat(&self) -> Currency {
        self.fiat
    }

    pub fn spot_ttl(&self) -> Duration {
        self.spot_ttl
    }
}
