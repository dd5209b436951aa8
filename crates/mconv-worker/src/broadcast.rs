//! Fan-out of progress events to connected observers.
//!
//! Every event goes to every registered observer; there is no per-job
//! addressing and no replay. Delivery is best-effort: an observer whose
//! receiving side has gone away is dropped from the registry on the next
//! publish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use mconv_models::{ProgressEvent, WsMessage};
use tokio::sync::mpsc;
use tracing::{debug, trace};

type Registry = HashMap<u64, mpsc::UnboundedSender<WsMessage>>;

/// Registry of connected observers, shared by the gateway and all runners.
#[derive(Debug, Clone, Default)]
pub struct ProgressBroadcast {
    observers: Arc<Mutex<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl ProgressBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. It receives the connection acknowledgment first.
    pub fn register(&self) -> Observer {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut observers = self.lock();
        // Queued before insertion so it always precedes any progress
        let _ = tx.send(WsMessage::connected());
        observers.insert(id, tx);
        debug!(observer_id = id, observers = observers.len(), "Observer registered");
        drop(observers);

        Observer {
            id,
            rx,
            registry: Arc::clone(&self.observers),
        }
    }

    /// Deliver an event to every connected observer.
    pub fn publish(&self, event: ProgressEvent) {
        let message = WsMessage::from(event);
        let mut observers = self.lock();
        observers.retain(|id, tx| {
            let delivered = tx.send(message.clone()).is_ok();
            if !delivered {
                trace!(observer_id = *id, "Skipping disconnected observer");
            }
            delivered
        });
    }

    pub fn observer_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        lock_registry(&self.observers)
    }
}

fn lock_registry(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One connected observer. Dropping it deregisters.
#[derive(Debug)]
pub struct Observer {
    id: u64,
    rx: mpsc::UnboundedReceiver<WsMessage>,
    registry: Arc<Mutex<Registry>>,
}

impl Observer {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next message, or `None` once deregistered.
    pub async fn recv(&mut self) -> Option<WsMessage> {
        self.rx.recv().await
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        let mut observers = lock_registry(&self.registry);
        if observers.remove(&self.id).is_some() {
            debug!(observer_id = self.id, observers = observers.len(), "Observer deregistered");
        }
    }
}
