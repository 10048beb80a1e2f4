//! Broadcast hub
//!
//! Fans each ingested-file event out to every live observer. The hub owns
//! its observer registry and its delivery queue and is handed to handlers
//! through shared state; there are no package-level globals.
//!
//! Delivery runs on a single dedicated worker task, strictly sequential
//! across events, so all observers see events in publish order. The queue is
//! bounded: a full queue blocks the publishing upload handler (backpressure)
//! instead of dropping the event. A dead observer is discovered lazily, on
//! the first delivery that fails to reach it, and is pruned then.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ledger::FileRecord;

/// Opaque handle identifying one registered observer.
pub type ObserverId = u64;

/// Capacity of the delivery queue between `publish` and the worker.
pub const DELIVERY_QUEUE_CAPACITY: usize = 64;

struct Registry {
    observers: Mutex<HashMap<ObserverId, mpsc::UnboundedSender<FileRecord>>>,
    next_id: AtomicU64,
}

impl Registry {
    fn new() -> Self {
        Self {
            observers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Deliver one event to every observer registered at this moment.
    /// Observers whose channel is gone are closed out of the registry.
    fn deliver(&self, record: FileRecord) {
        let snapshot: Vec<(ObserverId, mpsc::UnboundedSender<FileRecord>)> = {
            let observers = self.observers.lock().expect("registry lock poisoned");
            observers.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut dead = Vec::new();
        for (id, tx) in snapshot {
            if tx.send(record.clone()).is_err() {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            let mut observers = self.observers.lock().expect("registry lock poisoned");
            for id in dead {
                if observers.remove(&id).is_some() {
                    info!(observer = id, "pruned dead observer");
                }
            }
        }
    }
}

/// Handle to the broadcast hub. Cheap to clone; all clones share one
/// registry and one delivery worker.
#[derive(Clone)]
pub struct Hub {
    registry: Arc<Registry>,
    queue: mpsc::Sender<FileRecord>,
}

impl Hub {
    /// Create the hub and spawn its delivery worker.
    pub fn new(queue_capacity: usize) -> Self {
        let (queue, mut rx) = mpsc::channel::<FileRecord>(queue_capacity);
        let registry = Arc::new(Registry::new());

        let worker_registry = registry.clone();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                worker_registry.deliver(record);
            }
            debug!("broadcast delivery worker stopped");
        });

        Self { registry, queue }
    }

    /// Add an observer. It sees events delivered after this call returns;
    /// events already in flight may or may not reach it.
    pub fn register(&self, sender: mpsc::UnboundedSender<FileRecord>) -> ObserverId {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .observers
            .lock()
            .expect("registry lock poisoned")
            .insert(id, sender);
        debug!(observer = id, "observer registered");
        id
    }

    /// Remove an observer. Removing an already-absent handle is a no-op.
    pub fn unregister(&self, id: ObserverId) {
        self.registry
            .observers
            .lock()
            .expect("registry lock poisoned")
            .remove(&id);
    }

    /// Enqueue one event for delivery to all currently-registered observers.
    ///
    /// Blocks while the delivery queue is full; the event is never dropped.
    pub async fn publish(&self, record: FileRecord) {
        if self.queue.send(record).await.is_err() {
            // Only possible when the worker is gone, i.e. during shutdown.
            warn!("broadcast worker gone, event discarded");
        }
    }

    /// Number of currently-registered observers.
    pub fn observer_count(&self) -> usize {
        self.registry
            .observers
            .lock()
            .expect("registry lock poisoned")
            .len()
    }
}
