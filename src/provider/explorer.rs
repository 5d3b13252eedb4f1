use alloy::primitives::{Address, TxHash, address};
use derive_more::Debug;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{PageRequest, TransactionProvider};
use crate::{
    error::{Error, Result},
    http, num,
    retry::RetryPolicy,
    types::{Pool, RawTransaction},
};

/// Public Etherscan API endpoint.
pub const ETHERSCAN_URL: &str = "https://api.etherscan.io/api";

/// Highest block the explorer accepts as an open upper bound.
const MAX_END_BLOCK: u64 = 99_999_999;

const NO_TRANSACTIONS: &str = "No transactions found";

const ETH_USDC_POOL: Address = address!("0x88e6a0c2ddd26feeb64f039a2c41296fcb3f5640");
const WETH_TOKEN: Address = address!("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");

/// Block explorer backed provider.
///
/// Lists token transfers of the pool's wrapped native token through the
/// `account/tokentx` action, paged by block range. The explorer cannot filter
/// by time, so time constraints of a [`PageRequest`] are left to the caller.
#[derive(Clone, Debug)]
pub struct ExplorerProvider {
    client: Client,
    base_url: Url,
    #[debug(skip)]
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    message: String,
    result: ExplorerResult,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExplorerResult {
    Transfers(Vec<TokenTransfer>),
    Message(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenTransfer {
    hash: String,
    block_number: String,
    time_stamp: String,
    gas_price: String,
    gas_used: String,
}

impl ExplorerProvider {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Provider against the public Etherscan endpoint.
    pub fn etherscan(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(Url::parse(ETHERSCAN_URL)?, api_key))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn token_address(&self, pool: Pool) -> Result<Address> {
        match pool {
            Pool::EthUsdc => Ok(WETH_TOKEN),
            _ => Err(self.unsupported(pool)),
        }
    }

    fn unsupported(&self, pool: Pool) -> Error {
        Error::UnsupportedPool {
            pool: pool.to_string(),
            provider: self.name(),
        }
    }

    fn query(&self, request: &PageRequest) -> Result<Vec<(&'static str, String)>> {
        let address = self.resolve_address(request.pool())?;
        let token = self.token_address(request.pool())?;
        let (start_block, end_block) = request
            .blocks()
            .map(|b| (b.start(), b.end().min(MAX_END_BLOCK)))
            .unwrap_or((0, MAX_END_BLOCK));

        Ok(vec![
            ("module", "account".to_string()),
            ("action", "tokentx".to_string()),
            ("address", address.to_string()),
            ("contractaddress", token.to_string()),
            ("page", (request.page() + 1).to_string()),
            ("offset", request.limit().to_string()),
            ("startblock", start_block.to_string()),
            ("endblock", end_block.to_string()),
            ("sort", request.sort().as_str().to_string()),
            ("apikey", self.api_key.clone()),
        ])
    }
}

impl TransactionProvider for ExplorerProvider {
    fn name(&self) -> &'static str {
        "explorer"
    }

    fn resolve_address(&self, pool: Pool) -> Result<Address> {
        match pool {
            Pool::EthUsdc => Ok(ETH_USDC_POOL),
            _ => Err(self.unsupported(pool)),
        }
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawTransaction>> {
        let query = self.query(request)?;
        let response: ExplorerResponse = self
            .retry
            .run("explorer tokentx", || {
                http::send_json(self.client.get(self.base_url.clone()).query(&query))
            })
            .await?;

        let transfers = match (response.status.as_str(), response.result) {
            ("1", ExplorerResult::Transfers(transfers)) => transfers,
            ("0", _) if response.message.starts_with(NO_TRANSACTIONS) => Vec::new(),
            (_, ExplorerResult::Transfers(transfers)) if transfers.is_empty() => transfers,
            (_, ExplorerResult::Message(detail)) => {
                return Err(Error::Api(format!("{}: {detail}", response.message)));
            }
            (status, ExplorerResult::Transfers(_)) => {
                return Err(Error::Api(format!(
                    "unexpected status {status}: {}",
                    response.message
                )));
            }
        };
        debug!(
            pool = %request.pool(),
            page = request.page(),
            count = transfers.len(),
            "Fetched explorer page"
        );

        transfers.into_iter().map(TokenTransfer::normalize).collect()
    }
}

impl TokenTransfer {
    fn normalize(self) -> Result<RawTransaction> {
        Ok(RawTransaction {
            hash: self
                .hash
                .parse::<TxHash>()
                .map_err(|e| Error::Decode(format!("invalid tx hash {:?}: {e}", self.hash)))?,
            timestamp: num::parse_u64(&self.time_stamp)?,
            block_number: num::parse_u64(&self.block_number)?,
            fee_native: num::gas_fee(&self.gas_price, &self.gas_used)?,
            swap_price: None,
        })
    }
}
