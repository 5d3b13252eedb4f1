//! Service wiring and the append scheduler loop.

use std::time::Duration;

use swap_fee_ledger::{
    Ledger, LedgerConfig,
    provider::{AnyProvider, ExplorerProvider, ProviderSet, SubgraphProvider},
    rate::BinanceRates,
    report::{Report, ReportStatus},
    store::MemoryStore,
    types::{JobId, PoolKey, Protocol, TimeRange},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::{ConfigError, EnvConfig, Source},
    error::{Error, Result},
};

pub type ServiceLedger = Ledger<AnyProvider, BinanceRates, MemoryStore>;

/// Interval between report status polls.
const REPORT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Builds the ledger with the configured transaction source.
pub fn build_ledger(env: &EnvConfig, source: Source, config: LedgerConfig) -> Result<ServiceLedger> {
    let retry = config.retry();
    let provider: AnyProvider = match source {
        Source::Explorer => {
            let api_key = env
                .etherscan_api_key
                .clone()
                .ok_or(ConfigError::MissingApiKey)?;
            let provider = match &env.explorer_url {
                Some(url) => ExplorerProvider::new(Url::parse(url)?, api_key),
                None => ExplorerProvider::etherscan(api_key)?,
            };
            provider.with_retry(retry).into()
        }
        Source::Subgraph => {
            let provider = match &env.subgraph_url {
                Some(url) => SubgraphProvider::new(Url::parse(url)?),
                None => SubgraphProvider::uniswap_v3()?,
            };
            provider.with_retry(retry).into()
        }
    };
    let rates = match &env.rates_url {
        Some(url) => BinanceRates::new(Url::parse(url)?),
        None => BinanceRates::public()?,
    }
    .with_retry(retry);

    info!(?source, fiat = %config.fiat(), page_size = config.page_size(), "Initializing ledger");
    Ok(Ledger::new(
        ProviderSet::new().with(Protocol::UniswapV3, provider),
        rates,
        MemoryStore::new(),
        config,
    ))
}

/// Appends new transactions of `pools` every `poll_interval` until ctrl-c.
pub async fn run(
    ledger: &ServiceLedger,
    pools: &[PoolKey],
    workers: usize,
    poll_interval: Duration,
) -> Result<()> {
    for key in pools {
        ledger.pipeline().check(*key)?;
    }
    let handles = ledger.start_workers(workers);
    let shutdown = ledger.shutdown_token();
    let interrupt = tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

    let mut interval = tokio::time::interval(poll_interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                for key in pools {
                    // Dropping a run mid-page is safe, its upserts are idempotent.
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        result = ledger.record_new_transactions(key.protocol, key.pool) => match result {
                            Ok(totals) => debug!(%key, count = totals.count, "Append run finished"),
                            Err(e) => warn!(%key, %e, "Append run failed, retrying next tick"),
                        },
                    }
                }
            }
        }
    }

    interrupt.abort();
    for handle in handles {
        _ = handle.await;
    }
    Ok(())
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(%e, "Failed to listen for ctrl-c");
                return;
            }
            info!("Interrupted, shutting down");
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }
}

/// Requests a report, waits for it and returns its first page.
pub async fn report(ledger: &ServiceLedger, key: PoolKey, range: TimeRange) -> Result<Report> {
    let handles = ledger.start_workers(1);
    let id = ledger
        .trigger_report_generation(key.protocol, key.pool, range.start(), range.end())
        .await?;

    let outcome = wait_for(ledger, id).await;
    ledger.shutdown();
    for handle in handles {
        _ = handle.await;
    }

    match outcome? {
        ReportStatus::Completed => ledger
            .get_report(id, 0, 10)
            .await?
            .ok_or(Error::ReportMissing(id)),
        _ => Err(Error::ReportFailed(id)),
    }
}

async fn wait_for(ledger: &ServiceLedger, id: JobId) -> Result<ReportStatus> {
    loop {
        let status = ledger
            .get_report_status(id)
            .await?
            .ok_or(Error::ReportMissing(id))?;
        if status.is_terminal() {
            return Ok(status);
        }
        debug!(%id, %status, "Waiting for report");
        tokio::time::sleep(REPORT_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use swap_fee_ledger::types::Pool;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

    use super::*;

    #[tokio::test]
    async fn test_shutdown_interrupts_running_append() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(30))
                    .set_body_json(json!({ "data": { "swaps": [] } })),
            )
            .mount(&server)
            .await;

        let env = EnvConfig {
            subgraph_url: Some(server.uri()),
            ..Default::default()
        };
        let ledger = build_ledger(&env, Source::Subgraph, LedgerConfig::default()).unwrap();
        let pools = [PoolKey::new(Protocol::UniswapV3, Pool::EthUsdc)];
        let shutdown = ledger.shutdown_token();

        let stop = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            shutdown.cancel();
        };
        let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(run(&ledger, &pools, 1, Duration::from_secs(60)), stop)
        })
        .await
        .expect("append run was not interrupted");
        assert!(result.is_ok());
    }
}
