use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use tombstone_types::events::HostEvent;

/// An event stamped with its position in the dispatch order.
#[derive(Debug, Clone)]
pub struct Sequenced {
    pub seq: u64,
    pub event: HostEvent,
}

/// Fans host events out to every connected client.
///
/// Events are numbered as they are broadcast, so clients (and tests) can
/// check that a reaction's removal was announced after its addition.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    broadcast_tx: broadcast::Sender<Sequenced>,
    next_seq: AtomicU64,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                next_seq: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribe to host events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<Sequenced> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients. Returns its sequence number.
    pub fn broadcast(&self, event: HostEvent) -> u64 {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
        // No receivers is fine: nobody is connected
        let _ = self.inner.broadcast_tx.send(Sequenced { seq, event });
        seq
    }
}
