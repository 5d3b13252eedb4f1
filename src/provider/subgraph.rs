use alloy::primitives::{Address, TxHash, address};
use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{PageRequest, TransactionProvider};
use crate::{
    error::{Error, Result},
    http, num,
    retry::RetryPolicy,
    types::{Pool, RawTransaction},
};

/// Hosted Uniswap v3 subgraph.
pub const UNISWAP_V3_SUBGRAPH_URL: &str =
    "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v3";

const ETH_USDC_POOL: Address = address!("0x88e6a0c2ddd26feeb64f039a2c41296fcb3f5640");
const WBTC_ETH_POOL: Address = address!("0xcbcdf9626bc03e24f779434178a73a0b4bad62ed");

/// Subgraph indexer backed provider, pages `swaps` of a pool by timestamp.
#[derive(Clone, Debug)]
pub struct SubgraphProvider {
    client: Client,
    url: Url,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct GraphResponse {
    data: Option<SwapsData>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct SwapsData {
    swaps: Vec<Swap>,
}

#[derive(Debug, Deserialize)]
struct Swap {
    amount0: String,
    amount1: String,
    transaction: SwapTransaction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapTransaction {
    id: String,
    block_number: String,
    gas_used: String,
    gas_price: String,
    timestamp: String,
}

impl SubgraphProvider {
    pub fn new(url: Url) -> Self {
        Self {
            client: Client::new(),
            url,
            retry: RetryPolicy::default(),
        }
    }

    /// Provider against the hosted Uniswap v3 subgraph.
    pub fn uniswap_v3() -> Result<Self> {
        Ok(Self::new(Url::parse(UNISWAP_V3_SUBGRAPH_URL)?))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn query(&self, request: &PageRequest) -> Result<String> {
        let pool = self.resolve_address(request.pool())?.to_string().to_lowercase();
        let mut filter = format!("pool: \"{pool}\"");
        if let Some(times) = request.times() {
            filter.push_str(&format!(", timestamp_gte: \"{}\"", times.start()));
            if !times.is_open_ended() {
                filter.push_str(&format!(", timestamp_lte: \"{}\"", times.end()));
            }
        }
        let skip = u64::from(request.page()) * u64::from(request.limit());

        Ok(format!(
            r#"{{
  swaps(
    first: {first},
    skip: {skip},
    orderBy: timestamp,
    orderDirection: {direction},
    where: {{ {filter} }}
  ) {{
    amount0
    amount1
    transaction {{ id blockNumber gasUsed gasPrice timestamp }}
  }}
}}"#,
            first = request.limit(),
            direction = request.sort().as_str(),
        ))
    }
}

impl TransactionProvider for SubgraphProvider {
    fn name(&self) -> &'static str {
        "subgraph"
    }

    fn resolve_address(&self, pool: Pool) -> Result<Address> {
        Ok(match pool {
            Pool::EthUsdc => ETH_USDC_POOL,
            Pool::WbtcEth => WBTC_ETH_POOL,
        })
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawTransaction>> {
        let body = json!({ "query": self.query(request)? });
        let response: GraphResponse = self
            .retry
            .run("subgraph swaps", || {
                http::send_json(self.client.post(self.url.clone()).json(&body))
            })
            .await?;

        if !response.errors.is_empty() {
            let messages = response.errors.iter().map(|e| &e.message).join("; ");
            return Err(Error::Api(messages));
        }
        let swaps = response
            .data
            .ok_or_else(|| Error::Decode("subgraph response without data".to_string()))?
            .swaps;
        debug!(
            pool = %request.pool(),
            page = request.page(),
            count = swaps.len(),
            "Fetched subgraph page"
        );

        swaps.into_iter().map(Swap::normalize).collect()
    }
}

impl Swap {
    fn normalize(self) -> Result<RawTransaction> {
        let tx = self.transaction;
        Ok(RawTransaction {
            hash: tx
                .id
                .parse::<TxHash>()
                .map_err(|e| Error::Decode(format!("invalid tx hash {:?}: {e}", tx.id)))?,
            timestamp: num::parse_u64(&tx.timestamp)?,
            block_number: num::parse_u64(&tx.block_number)?,
            fee_native: num::gas_fee(&tx.gas_used, &tx.gas_price)?,
            swap_price: num::abs_ratio(&self.amount0, &self.amount1)?,
        })
    }
}
