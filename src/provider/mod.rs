//! Transaction providers.
//!
//! A [`TransactionProvider`] fetches one page of raw swap transactions of a
//! pool and normalizes them into [`RawTransaction`], gas fee in wei. Every
//! provider owns its pagination and unit conversion, the pipeline only sees
//! the normalized shape.
//!
//! Two variants are available, chosen per protocol when the
//! [`ProviderSet`] is assembled:
//!
//! - [`ExplorerProvider`] - block explorer API (Etherscan), block-range paging.
//! - [`SubgraphProvider`] - Uniswap v3 subgraph, timestamp-range paging.

mod explorer;
mod subgraph;

pub use explorer::ExplorerProvider;
pub use subgraph::SubgraphProvider;

use std::{collections::HashMap, future::Future, sync::Arc};

use alloy::primitives::Address;

use crate::{
    error::{Error, Result},
    types::{BlockRange, Pool, Protocol, RawTransaction, SortDirection, TimeRange},
};

/// Default page size, as used by the upstream APIs.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Source of raw on-chain transactions of a pool.
pub trait TransactionProvider: Send + Sync {
    /// Short provider name for logs and errors.
    fn name(&self) -> &'static str;

    /// On-chain address the provider queries for the pool.
    /// Unsupported pools are a configuration error.
    fn resolve_address(&self, pool: Pool) -> Result<Address>;

    /// Fetches a single page.
    fn fetch_page(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<Vec<RawTransaction>>> + Send;
}

/// Parameters of a single page fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct PageRequest {
    pool: Pool,
    page: u32,
    limit: u32,
    sort: SortDirection,
    blocks: Option<BlockRange>,
    times: Option<TimeRange>,
}

impl PageRequest {
    /// First ascending page of `limit` transactions of the pool.
    pub fn new(pool: Pool, limit: u32) -> Self {
        Self {
            pool,
            page: 0,
            limit: limit.max(1),
            sort: SortDirection::Ascending,
            blocks: None,
            times: None,
        }
    }

    /// Sets zero-based page index.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_sort(mut self, sort: SortDirection) -> Self {
        self.sort = sort;
        self
    }

    /// Restricts the request to the block range, for providers that support it.
    pub fn with_blocks(mut self, blocks: BlockRange) -> Self {
        self.blocks = Some(blocks);
        self
    }

    /// Restricts the request to the time range, for providers that support it.
    pub fn with_times(mut self, times: TimeRange) -> Self {
        self.times = Some(times);
        self
    }

    /// Same request, next page.
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }

    pub fn pool(&self) -> Pool {
        self.pool
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn sort(&self) -> SortDirection {
        self.sort
    }

    pub fn blocks(&self) -> Option<BlockRange> {
        self.blocks
    }

    pub fn times(&self) -> Option<TimeRange> {
        self.times
    }
}

/// Closed set of the concrete providers.
#[derive(Clone, Debug)]
pub enum AnyProvider {
    Explorer(ExplorerProvider),
    Subgraph(SubgraphProvider),
}

impl TransactionProvider for AnyProvider {
    fn name(&self) -> &'static str {
        match self {
            Self::Explorer(p) => p.name(),
            Self::Subgraph(p) => p.name(),
        }
    }

    fn resolve_address(&self, pool: Pool) -> Result<Address> {
        match self {
            Self::Explorer(p) => p.resolve_address(pool),
            Self::Subgraph(p) => p.resolve_address(pool),
        }
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawTransaction>> {
        match self {
            Self::Explorer(p) => p.fetch_page(request).await,
            Self::Subgraph(p) => p.fetch_page(request).await,
        }
    }
}

impl From<ExplorerProvider> for AnyProvider {
    fn from(value: ExplorerProvider) -> Self {
        Self::Explorer(value)
    }
}

impl From<SubgraphProvider> for AnyProvider {
    fn from(value: SubgraphProvider) -> Self {
        Self::Subgraph(value)
    }
}

/// Providers by protocol.
#[derive(Debug)]
pub struct ProviderSet<P> {
    providers: HashMap<Protocol, Arc<P>>,
}

impl<P> Default for ProviderSet<P> {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }
}

impl<P: TransactionProvider> ProviderSet<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the provider serving `protocol`.
    pub fn with(mut self, protocol: Protocol, provider: P) -> Self {
        self.providers.insert(protocol, Arc::new(provider));
        self
    }

    /// Provider of the protocol, unregistered protocols are a configuration error.
    pub fn get(&self, protocol: Protocol) -> Result<&Arc<P>> {
        self.providers
            .get(&protocol)
            .ok_or_else(|| Error::UnsupportedProtocol(protocol.to_string()))
    }
}
