use std::{sync::Arc, time::Duration};

use jit_funding_engine::{
    cache::CacheBackend,
    jit_api::network_objects::ClearingJob,
    queue::{DeadLetterQueue, JobFuture, JobHandler, JobPublisher, JobQueue},
    NetworkEventApi,
    NetworkEventError,
    SqliteDatabase,
};
use log::*;
use tokio::task::JoinHandle;

use crate::config::ClearingConfig;

pub struct ClearingWorker {
    pub publisher: JobPublisher<ClearingJob>,
    pub dead_letters: DeadLetterQueue<ClearingJob>,
    pub handle: JoinHandle<()>,
}

impl ClearingWorker {
    fn spawn(queue: JobQueue<ClearingJob>) -> Self {
        let publisher = queue.publisher();
        let dead_letters = queue.dead_letters();
        let handle = tokio::spawn(async move {
            info!("📬️ Clearing worker started");
            queue.run().await;
            info!("📬️ Clearing worker stopped");
        });
        Self { publisher, dead_letters, handle }
    }

    /// Drops this worker's publisher and waits up to `grace` for the queued and in-flight jobs to be recorded. Every
    /// other publisher must already be gone. Returns `false` if the worker had to be abandoned.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let Self { publisher, dead_letters, mut handle } = self;
        drop(publisher);
        let drained = match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("📬️ Clearing worker failed while draining. {e}");
                false
            },
            Err(_) => {
                warn!("📬️ Clearing worker did not drain within {}ms. Abandoning the remaining jobs.", grace.as_millis());
                handle.abort();
                false
            },
        };
        let failed = dead_letters.len();
        if failed > 0 {
            warn!("📬️ {failed} clearing events were dead-lettered during this session");
        }
        drained
    }
}

/// Starts the clearing worker. It runs until every publisher has been dropped; call
/// [`shutdown`](ClearingWorker::shutdown) to wait for it.
pub fn start_clearing_worker(api: NetworkEventApi<SqliteDatabase, CacheBackend>, config: ClearingConfig) -> ClearingWorker {
    let handler: JobHandler<ClearingJob> = Arc::new(move |job: ClearingJob| {
        let api = api.clone();
        Box::pin(async move { record(&api, &job).await }) as JobFuture
    });
    ClearingWorker::spawn(JobQueue::new(config.buffer_size, config.retry_policy, handler))
}

/// Only store failures are worth retrying. Anything else is logged here and the job is done.
async fn record(api: &NetworkEventApi<SqliteDatabase, CacheBackend>, job: &ClearingJob) -> Result<(), String> {
    match api.record_clearing(job).await {
        Ok(_) => Ok(()),
        Err(NetworkEventError::InvalidEvent(e)) => {
            warn!("📬️ Discarding invalid {} event. {e}", job.kind);
            Ok(())
        },
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use jit_funding_engine::{
        jit_api::network_objects::{ClearingKind, NetworkTransaction},
        queue::RetryPolicy,
    };

    use super::*;

    fn job(token: &str) -> ClearingJob {
        let tx = NetworkTransaction {
            token: token.into(),
            card_token: "card-1".into(),
            user_token: None,
            amount: 1000,
            currency_code: "USD".into(),
            merchant: None,
            state: None,
            created_time: None,
        };
        ClearingJob::new(ClearingKind::Clearing, tx)
    }

    fn worker(delay: Duration, recorded: Arc<AtomicUsize>) -> ClearingWorker {
        let handler: JobHandler<ClearingJob> = Arc::new(move |_job| {
            let recorded = Arc::clone(&recorded);
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                recorded.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }) as JobFuture
        });
        ClearingWorker::spawn(JobQueue::new(16, RetryPolicy::default(), handler))
    }

    #[tokio::test]
    async fn shutdown_drains_queued_jobs() {
        let recorded = Arc::new(AtomicUsize::new(0));
        let worker = worker(Duration::from_millis(20), Arc::clone(&recorded));
        for i in 0..5 {
            worker.publisher.enqueue(job(&format!("txn-{i}"))).unwrap();
        }
        assert!(worker.shutdown(Duration::from_secs(5)).await);
        assert_eq!(recorded.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn shutdown_gives_up_after_the_grace_period() {
        let recorded = Arc::new(AtomicUsize::new(0));
        let worker = worker(Duration::from_secs(30), Arc::clone(&recorded));
        worker.publisher.enqueue(job("txn-slow")).unwrap();
        assert!(!worker.shutdown(Duration::from_millis(50)).await);
        assert_eq!(recorded.load(Ordering::SeqCst), 0);
    }
}
