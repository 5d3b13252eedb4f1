use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::{
    error::{Error, Result},
    types::JobId,
};

/// Sending half of the report queue.
#[derive(Clone, Debug)]
pub struct ReportQueue {
    tx: mpsc::UnboundedSender<JobId>,
}

/// Receiving half of the report queue, shared by all workers.
///
/// Every job ID is delivered to exactly one worker, once.
#[derive(Clone, Debug)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<JobId>>>,
}

/// Queue of report job IDs.
pub fn channel() -> (ReportQueue, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ReportQueue { tx },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

impl ReportQueue {
    /// Enqueues the job without waiting, fails only once every receiver is gone.
    pub fn enqueue(&self, id: JobId) -> Result<()> {
        self.tx.send(id).map_err(|_| Error::QueueClosed)
    }
}

impl JobReceiver {
    /// Next job ID, `None` once all senders are gone and the queue is drained.
    pub async fn recv(&self) -> Option<JobId> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_each_job_is_delivered_once() {
        let (queue, jobs) = channel();
        let ids: Vec<_> = (0..4).map(|_| JobId::new_v4()).collect();
        for id in &ids {
            queue.enqueue(*id).unwrap();
        }
        drop(queue);

        let other = jobs.clone();
        let mut received = Vec::new();
        while let Some(id) = jobs.recv().await {
            received.push(id);
            if let Some(id) = other.recv().await {
                received.push(id);
            }
        }
        assert_eq!(received, ids);
    }

    #[test]
    fn test_enqueue_after_receivers_dropped() {
        let (queue, jobs) = channel();
        drop(jobs);
        assert!(matches!(
            queue.enqueue(JobId::new_v4()),
            Err(Error::QueueClosed)
        ));
    }
}
