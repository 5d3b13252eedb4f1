use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{JobReceiver, ReportStatus};
use crate::{
    error::{Error, Result},
    pipeline::Pipeline,
    provider::TransactionProvider,
    rate::RateProvider,
    store::Store,
    types::JobId,
};

/// Backfill worker draining the shared report queue.
#[derive(Debug)]
pub struct ReportWorker<P, R, S> {
    id: usize,
    pipeline: Arc<Pipeline<P, R, S>>,
    store: Arc<S>,
    jobs: JobReceiver,
}

impl<P, R, S> ReportWorker<P, R, S>
where
    P: TransactionProvider + 'static,
    R: RateProvider + 'static,
    S: Store + 'static,
{
    pub fn new(
        id: usize,
        pipeline: Arc<Pipeline<P, R, S>>,
        store: Arc<S>,
        jobs: JobReceiver,
    ) -> Self {
        Self {
            id,
            pipeline,
            store,
            jobs,
        }
    }

    /// Runs the worker on the current runtime until `cancel` fires or the
    /// queue is closed and drained.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(worker = self.id, "Report worker started");
        loop {
            let id = tokio::select! {
                _ = cancel.cancelled() => break,
                id = self.jobs.recv() => match id {
                    Some(id) => id,
                    None => break,
                },
            };
            if let Err(e) = self.process(id, &cancel).await {
                error!(worker = self.id, %id, %e, "Failed to record report outcome");
            }
        }
        info!(worker = self.id, "Report worker stopped");
    }

    /// Drives one job to a terminal state.
    ///
    /// Pipeline failures mark the job failed and are not propagated, only
    /// failures to read or write the job itself are.
    pub async fn process(&self, id: JobId, cancel: &CancellationToken) -> Result<()> {
        let Some(mut job) = self.store.job(id).await? else {
            warn!(worker = self.id, %id, "Dequeued unknown report job");
            return Err(Error::JobNotFound(id));
        };
        job.advance(ReportStatus::InProgress)?;
        self.store.update_job(job.clone()).await?;
        debug!(worker = self.id, %id, key = %job.key(), range = %job.range(), "Processing report");

        match self.pipeline.backfill(job.key(), job.range(), cancel).await {
            Ok(outcome) => {
                job.complete(outcome.totals)?;
                info!(
                    worker = self.id,
                    %id,
                    count = outcome.totals.count,
                    native = %outcome.totals.native,
                    fiat = %outcome.totals.fiat,
                    cache_hit = outcome.cache_hit,
                    "Report completed"
                );
            }
            Err(e) => {
                job.advance(ReportStatus::Failed)?;
                error!(worker = self.id, %id, %e, "Report failed");
            }
        }
        self.store.update_job(job).await
    }
}
