//! Fire-and-forget event delivery.
//!
//! An [`EventHandler`] owns one subscriber callback and the receiving end of a bounded channel. Engine components hold
//! [`EventProducer`]s and publish authorization decisions, recorded transactions and card state changes through them.
//!
//! Publishing never waits. When a handler falls behind and its buffer fills up, new events are dropped with a warning
//! rather than delaying a decision.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
pub type Handler<E> = Arc<dyn Fn(E) -> HandlerFuture + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    events: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, events) = mpsc::channel(buffer_size.max(1));
        Self { events, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer { sender: self.sender.clone() }
    }

    /// Dispatches events until every producer is gone, then waits for the dispatched callbacks to finish.
    pub async fn start_handler(self) {
        let Self { mut events, sender, handler } = self;
        // Only producers may keep the channel open
        drop(sender);
        debug!("📬️ Event handler is listening");
        let mut running = JoinSet::new();
        while let Some(event) = events.recv().await {
            running.spawn((handler)(event));
            // Reap finished callbacks so the set doesn't grow with the event count
            while running.try_join_next().is_some() {}
        }
        trace!("📬️ All producers have gone. Waiting on {} callbacks.", running.len());
        while let Some(result) = running.join_next().await {
            if let Err(e) = result {
                error!("📬️ An event callback failed. {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    /// Hands the event over without waiting. Returns `false` if it was dropped.
    pub fn publish_event(&self, event: E) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("📬️ Event buffer is full. The event has been dropped.");
                false
            },
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("📬️ Event handler has shut down. The event has been dropped.");
                false
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicU64, Ordering},
        time::Duration,
    };

    use super::*;

    #[tokio::test]
    async fn every_published_event_is_handled() {
        let _ = env_logger::try_init();
        let total = Arc::new(AtomicU64::new(0));
        let sum = Arc::clone(&total);
        let handler: Handler<u64> = Arc::new(move |v| {
            let sum = Arc::clone(&sum);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                sum.fetch_add(v, Ordering::SeqCst);
            }) as HandlerFuture
        });
        let event_handler = EventHandler::new(16, handler);
        let odd = event_handler.subscribe();
        let even = event_handler.subscribe();
        for i in 0..5 {
            assert!(odd.publish_event(i * 2 + 1));
            assert!(even.publish_event(i * 2));
        }
        drop(odd);
        drop(even);
        event_handler.start_handler().await;
        assert_eq!(total.load(Ordering::SeqCst), 45);
    }

    #[tokio::test]
    async fn full_buffers_drop_events() {
        let handler: Handler<u64> = Arc::new(|_| Box::pin(async {}) as HandlerFuture);
        let event_handler = EventHandler::new(1, handler);
        let producer = event_handler.subscribe();
        assert!(producer.publish_event(1));
        assert!(!producer.publish_event(2));
        drop(event_handler);
        assert!(!producer.publish_event(3));
    }
}
