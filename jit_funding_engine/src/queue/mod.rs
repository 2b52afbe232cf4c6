//! A small in-process job queue with bounded retries and a dead-letter store.
//!
//! The queue decouples webhook ingestion from slower downstream processing. A [`JobPublisher`] hands a job over
//! without waiting. The [`JobQueue`] runs each job on its own task; a job that fails is retried with exponential
//! backoff, and once its retries are exhausted it is moved to the [`DeadLetterQueue`] and logged.
use std::{
    collections::VecDeque,
    fmt::Debug,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use log::*;
use thiserror::Error;
use tokio::sync::mpsc;

pub type JobFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
pub type JobHandler<J> = Arc<dyn Fn(J) -> JobFuture + Send + Sync>;

pub const DEFAULT_DEAD_LETTER_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("The job queue is full")]
    Full,
    #[error("The job queue has shut down")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_millis(1000) }
    }
}

impl RetryPolicy {
    /// The wait before retry number `retry` (starting at 1): `base_delay * 2^(retry - 1)`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exp)
    }
}

#[derive(Debug, Clone)]
pub struct DeadLetter<J> {
    pub job: J,
    pub error: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

/// Jobs that exhausted their retries, oldest first. When full, the oldest letter is discarded.
#[derive(Clone)]
pub struct DeadLetterQueue<J> {
    capacity: usize,
    letters: Arc<Mutex<VecDeque<DeadLetter<J>>>>,
}

impl<J: Clone> DeadLetterQueue<J> {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), letters: Arc::new(Mutex::new(VecDeque::new())) }
    }

    fn push(&self, letter: DeadLetter<J>) {
        match self.letters.lock() {
            Ok(mut letters) => {
                if letters.len() >= self.capacity {
                    letters.pop_front();
                }
                letters.push_back(letter);
            },
            Err(_) => error!("📬️ Dead letter queue lock is poisoned. A dead letter has been lost."),
        }
    }

    pub fn len(&self) -> usize {
        self.letters.lock().map(|l| l.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<DeadLetter<J>> {
        self.letters.lock().map(|l| l.iter().cloned().collect()).unwrap_or_default()
    }
}

pub struct JobQueue<J: Send + 'static> {
    listener: mpsc::Receiver<J>,
    sender: mpsc::Sender<J>,
    handler: JobHandler<J>,
    policy: RetryPolicy,
    dead_letters: DeadLetterQueue<J>,
}

impl<J> JobQueue<J>
where J: Clone + Debug + Send + Sync + 'static
{
    pub fn new(buffer_size: usize, policy: RetryPolicy, handler: JobHandler<J>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size);
        let dead_letters = DeadLetterQueue::new(DEFAULT_DEAD_LETTER_CAPACITY);
        Self { listener, sender, handler, policy, dead_letters }
    }

    pub fn publisher(&self) -> JobPublisher<J> {
        JobPublisher { sender: self.sender.clone() }
    }

    pub fn dead_letters(&self) -> DeadLetterQueue<J> {
        self.dead_letters.clone()
    }

    /// Runs until every publisher has been dropped and the in-flight jobs have finished.
    pub async fn run(mut self) {
        debug!("📬️ Starting job queue");
        drop(self.sender);
        let jobs = Arc::new(AtomicI64::new(0));
        while let Some(job) = self.listener.recv().await {
            let handler = Arc::clone(&self.handler);
            let dead_letters = self.dead_letters.clone();
            let policy = self.policy;
            jobs.fetch_add(1, Ordering::SeqCst);
            let in_flight = Arc::clone(&jobs);
            tokio::spawn(async move {
                process_job(job, handler, policy, dead_letters).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while jobs.load(Ordering::SeqCst) > 0 {
            trace!("📬️ Waiting for in-flight jobs to complete");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        debug!("📬️ Job queue has shut down");
    }
}

async fn process_job<J: Clone + Debug>(
    job: J,
    handler: JobHandler<J>,
    policy: RetryPolicy,
    dead_letters: DeadLetterQueue<J>,
) {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match (handler)(job.clone()).await {
            Ok(()) => {
                trace!("📬️ Job completed after {attempt} attempt(s)");
                return;
            },
            Err(e) if attempt > policy.max_retries => {
                error!("📬️ Job failed {attempt} times and has been dead-lettered. {e}. {job:?}");
                dead_letters.push(DeadLetter { job, error: e, attempts: attempt, failed_at: Utc::now() });
                return;
            },
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!("📬️ Job attempt {attempt} failed. Retrying in {}ms. {e}", delay.as_millis());
                tokio::time::sleep(delay).await;
            },
        }
    }
}

#[derive(Clone)]
pub struct JobPublisher<J> {
    sender: mpsc::Sender<J>,
}

impl<J> JobPublisher<J> {
    pub fn enqueue(&self, job: J) -> Result<(), QueueError> {
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}
