use alloy::primitives::{TxHash, U256};
use fastnum::udec256;
use serde_json::json;
use swap_fee_ledger::{
    Error, Ledger, LedgerConfig,
    provider::{ExplorerProvider, ProviderSet, SubgraphProvider},
    rate::BinanceRates,
    store::MemoryStore,
    testing::{ScriptedProvider, ScriptedRates, eth_usdc, minute_rates, raw_tx},
    types::{Currency, Pool, Protocol, TimeRange},
};
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path, query_param},
};

fn scripted_ledger(provider: ScriptedProvider) -> Ledger<ScriptedProvider, ScriptedRates, MemoryStore> {
    Ledger::new(
        ProviderSet::new().with(Protocol::UniswapV3, provider),
        ScriptedRates::new(minute_rates(0, 100)),
        MemoryStore::new(),
        LedgerConfig::default().with_page_size(2),
    )
}

fn swap(n: u8, block: u64, timestamp: u64) -> serde_json::Value {
    json!({
        "amount0": "-1805.5",
        "amount1": "1",
        "transaction": {
            "id": TxHash::repeat_byte(n).to_string(),
            "blockNumber": block.to_string(),
            "gasUsed": "100000",
            "gasPrice": "1000000000",
            "timestamp": timestamp.to_string(),
        }
    })
}

fn transfer(n: u8, block: u64, timestamp: u64) -> serde_json::Value {
    json!({
        "hash": TxHash::repeat_byte(n).to_string(),
        "blockNumber": block.to_string(),
        "timeStamp": timestamp.to_string(),
        "gasPrice": "1000000000",
        "gasUsed": "100000",
    })
}

fn transfers(page: &str, result: serde_json::Value) -> Mock {
    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("action", "tokentx"))
        .and(query_param("sort", "asc"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "1",
            "message": "OK",
            "result": result,
        })))
}

/// Tests repeated appends and the read side of the ledger.
#[tokio::test]
async fn test_record_new_transactions_and_query() {
    let provider = ScriptedProvider::new((1..=3).map(|n| raw_tx(n, n * 100)).collect());
    let ledger = scripted_ledger(provider.clone());

    // Without history only the newest transaction is taken.
    let totals = assert_ok!(
        ledger
            .record_new_transactions(Protocol::UniswapV3, Pool::EthUsdc)
            .await
    );
    assert_eq!(totals.count, 1);

    provider.push(raw_tx(4, 400));
    provider.push(raw_tx(5, 500));
    let totals = ledger
        .record_new_transactions(Protocol::UniswapV3, Pool::EthUsdc)
        .await
        .unwrap();
    // The boundary transaction is fetched again and upserted in place.
    assert_eq!(totals.count, 3);

    assert_eq!(
        ledger
            .get_transaction_count(Protocol::UniswapV3, Pool::EthUsdc)
            .await
            .unwrap(),
        3
    );
    let page = ledger
        .get_transaction_list(Protocol::UniswapV3, Pool::EthUsdc, 0, 2)
        .await
        .unwrap();
    let timestamps: Vec<_> = page.iter().map(|tx| tx.timestamp).collect();
    assert_eq!(timestamps, vec![300, 400]);

    let hash = raw_tx(4, 400).hash;
    let record = ledger
        .get_transaction_by_hash(Protocol::UniswapV3, Pool::EthUsdc, hash)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.key(), eth_usdc());
    assert_eq!(record.fee.fiat, udec256!(41.259474674315136));

    // Records are scoped to their pool.
    assert!(
        ledger
            .get_transaction_by_hash(Protocol::UniswapV3, Pool::WbtcEth, hash)
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        ledger
            .get_transaction_by_hash(Protocol::UniswapV3, Pool::EthUsdc, raw_tx(1, 100).hash)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_record_after_shutdown_is_cancelled() {
    let ledger = scripted_ledger(ScriptedProvider::new(vec![raw_tx(1, 100)]));
    ledger.shutdown();

    let err = assert_err!(
        ledger
            .record_new_transactions(Protocol::UniswapV3, Pool::EthUsdc)
            .await
    );
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(
        ledger
            .get_transaction_count(Protocol::UniswapV3, Pool::EthUsdc)
            .await
            .unwrap(),
        0
    );
}

/// Tests a backfill against subgraph and exchange endpoints.
///
/// Every transaction is priced at the first one minute close at or after it.
#[tokio::test]
async fn test_backfill_from_subgraph_and_binance() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("orderDirection: asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "swaps": [
                swap(1, 18_000_000, 1_700_000_010),
                swap(2, 18_000_005, 1_700_000_070),
            ] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Newest swap of the pool, past the requested range.
    Mock::given(method("POST"))
        .and(body_string_contains("orderDirection: desc"))
        .and(body_string_contains("first: 1,"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "swaps": [swap(3, 18_000_040, 1_700_000_500)] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .and(query_param("symbol", "ETHUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [1700000040000u64, "1800.00", "1810.00", "1790.00", "1805.50", "10.5",
             1700000099999u64, "18900.0", 12, "5.0", "9000.0", "0"],
            [1700000100000u64, "1805.50", "1806.00", "1801.00", "1802.25", "3.1",
             1700000159999u64, "5600.0", 7, "1.0", "1800.0", "0"],
        ])))
        .mount(&server)
        .await;

    let url = Url::parse(&server.uri()).unwrap();
    let ledger = Ledger::new(
        ProviderSet::new().with(Protocol::UniswapV3, SubgraphProvider::new(url.clone())),
        BinanceRates::new(url),
        MemoryStore::new(),
        LedgerConfig::default(),
    );

    let range = TimeRange::new(1_700_000_000, 1_700_000_100).unwrap();
    let outcome = ledger
        .pipeline()
        .backfill(eth_usdc(), range, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!outcome.cache_hit);
    assert_eq!(outcome.totals.count, 2);
    assert_eq!(outcome.totals.native, U256::from(200_000_000_000_000u64));
    assert_eq!(outcome.totals.fiat, udec256!(0.360775));

    let first = ledger
        .get_transaction_by_hash(Protocol::UniswapV3, Pool::EthUsdc, TxHash::repeat_byte(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.block_number, 18_000_000);
    assert_eq!(first.fee.fiat, udec256!(0.18055));
    assert_eq!(first.swap_price, Some(udec256!(1805.5)));

    // A second backfill of a sub-range is served from the store.
    let outcome = ledger
        .pipeline()
        .backfill(
            eth_usdc(),
            TimeRange::new(1_700_000_050, 1_700_000_100).unwrap(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(outcome.cache_hit);
    assert_eq!(outcome.totals.count, 1);
    assert_eq!(outcome.totals.fiat, udec256!(0.180225));
}

#[tokio::test]
async fn test_exchange_rate_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/ticker/price"))
        .and(query_param("symbol", "ETHUSDC"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "symbol": "ETHUSDC", "price": "2012.34000000" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ledger = Ledger::new(
        ProviderSet::new().with(Protocol::UniswapV3, ScriptedProvider::new(vec![])),
        BinanceRates::new(Url::parse(&server.uri()).unwrap()),
        MemoryStore::new(),
        LedgerConfig::default(),
    );

    for _ in 0..3 {
        let rate = ledger
            .exchange_rate(Currency::Eth, Currency::Usdc)
            .await
            .unwrap();
        assert_eq!(rate, udec256!(2012.34));
    }
}

/// Tests a backfill over explorer pages, which are not filtered by time.
///
/// Transfers outside the range are dropped, a transaction listed on two pages
/// is stored and counted once, and paging stops at the first page reaching
/// past the range.
#[tokio::test]
async fn test_backfill_from_explorer_filters_and_stops_past_range() {
    let server = MockServer::start().await;
    transfers(
        "1",
        json!([transfer(1, 10, 900), transfer(2, 11, 1_000), transfer(3, 12, 1_200)]),
    )
    .expect(1)
    .mount(&server)
    .await;
    transfers(
        "2",
        json!([transfer(3, 12, 1_200), transfer(4, 13, 1_800), transfer(5, 14, 2_100)]),
    )
    .expect(1)
    .mount(&server)
    .await;
    transfers("3", json!([transfer(6, 15, 2_400)]))
        .expect(0)
        .mount(&server)
        .await;
    // The page past the range already proves it final.
    Mock::given(method("GET"))
        .and(query_param("sort", "desc"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/api", server.uri())).unwrap();
    let ledger = Ledger::new(
        ProviderSet::new().with(Protocol::UniswapV3, ExplorerProvider::new(url, "secret")),
        ScriptedRates::new(minute_rates(0, 100)),
        MemoryStore::new(),
        LedgerConfig::default().with_page_size(3),
    );

    let range = TimeRange::new(1_000, 2_000).unwrap();
    let outcome = ledger
        .pipeline()
        .backfill(eth_usdc(), range, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.totals.count, 3);
    assert_eq!(outcome.totals.native, U256::from(300_000_000_000_000u64));
    assert_eq!(outcome.totals.fiat, udec256!(0.54));

    let stored = ledger
        .get_transaction_list(Protocol::UniswapV3, Pool::EthUsdc, 0, 10)
        .await
        .unwrap();
    let timestamps: Vec<_> = stored.iter().map(|tx| tx.timestamp).collect();
    assert_eq!(timestamps, vec![1_000, 1_200, 1_800]);
    assert_eq!(
        ledger.pipeline().coverage().intervals(eth_usdc()).await.unwrap(),
        vec![range]
    );
}
