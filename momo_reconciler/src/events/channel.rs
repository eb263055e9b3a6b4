//! Stateless pub-sub event handling.
//!
//! Other components (typically the order system) subscribe to reconciliation events through hooks and react to
//! them. Handlers have no access to the engine's state. All they receive is the event itself. Handlers may be async.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Owns the receiving end of an event channel, and runs the handler for everything published to it.
pub struct EventHandler<E: Send + Sync + 'static> {
    receiver: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { receiver, sender, handler }
    }

    /// A new producer that publishes to this handler.
    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs the handler for every event received until the last producer is dropped, then waits for in-flight
    /// handlers to finish.
    pub async fn start_handler(self) {
        let Self { mut receiver, sender, handler } = self;
        // Without the internal sender, the channel closes once every subscriber is gone
        drop(sender);
        debug!("📬️ Event handler is listening");
        let mut jobs = JoinSet::new();
        while let Some(event) = receiver.recv().await {
            let job = Arc::clone(&handler);
            jobs.spawn(async move { job(event).await });
            // Reap finished jobs so the set does not grow without bound
            while let Some(result) = jobs.try_join_next() {
                log_job_result(result);
            }
        }
        trace!("📬️ All producers are gone. {} hook jobs still running", jobs.len());
        while let Some(result) = jobs.join_next().await {
            log_job_result(result);
        }
        debug!("📬️ Event handler stopped");
    }
}

fn log_job_result(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => trace!("📬️ Event hook completed"),
        Err(e) => warn!("📬️ An event hook did not complete: {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Publishes the event, waiting for room in the channel if the handler is behind. Failures are logged, never
    /// returned: a missing subscriber must not fail the operation that produced the event.
    pub async fn publish_event(&self, event: E) {
        if self.sender.send(event).await.is_err() {
            warn!("📬️ Nobody is listening for this event any more. It was dropped.");
        }
    }
}
