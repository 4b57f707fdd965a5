//! In-process typed publish/subscribe hub
//!
//! Dispatch is synchronous and snapshot-based: `publish` copies the subscriber
//! list under the lock, releases it, then invokes each handler. Handlers may
//! publish or (un)subscribe freely; changes take effect from the next publish.
//! A failing or panicking handler is logged and skipped.
//!
//! Async observers that prefer a channel can use [`EventBus::watch`] or
//! [`EventBus::stream`].

mod event;

pub use event::{Event, EventEnvelope, EventKind};

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::Result;

/// Capacity of the broadcast channel behind [`EventBus::watch`]
const WATCH_CAPACITY: usize = 256;

/// Subscriber callback type
pub type EventHandler = Arc<dyn Fn(&EventEnvelope) -> Result<()> + Send + Sync>;

#[derive(Clone)]
struct Subscriber {
    id: u64,
    handler: EventHandler,
}

#[derive(Default)]
struct Registry {
    typed: HashMap<EventKind, Vec<Subscriber>>,
    wildcard: Vec<Subscriber>,
}

struct BusInner {
    next_id: AtomicU64,
    registry: Mutex<Registry>,
    watch_tx: broadcast::Sender<EventEnvelope>,
}

impl BusInner {
    fn remove(&self, key: Option<EventKind>, id: u64) {
        let mut registry = self.registry.lock();
        let list = match key {
            Some(kind) => match registry.typed.get_mut(&kind) {
                Some(list) => list,
                None => return,
            },
            None => &mut registry.wildcard,
        };
        list.retain(|sub| sub.id != id);
    }
}

/// Process-wide event bus
///
/// Cloning is cheap and every clone shares the same subscribers.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        let (watch_tx, _) = broadcast::channel(WATCH_CAPACITY);
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicU64::new(1),
                registry: Mutex::new(Registry::default()),
                watch_tx,
            }),
        }
    }

    /// Publish an event to every current subscriber of its kind, then to
    /// wildcard subscribers, in subscription order
    pub fn publish(&self, event: Event) {
        let envelope = EventEnvelope::now(event);
        let kind = envelope.kind();

        let snapshot: Vec<Subscriber> = {
            let registry = self.inner.registry.lock();
            registry
                .typed
                .get(&kind)
                .into_iter()
                .flatten()
                .chain(registry.wildcard.iter())
                .cloned()
                .collect()
        };

        for sub in snapshot {
            match catch_unwind(AssertUnwindSafe(|| (sub.handler)(&envelope))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    log::error!("Subscriber {} failed handling {}: {}", sub.id, kind, e);
                }
                Err(_) => {
                    log::error!("Subscriber {} panicked handling {}", sub.id, kind);
                }
            }
        }

        // No receivers is the common case
        let _ = self.inner.watch_tx.send(envelope);
    }

    /// Subscribe to one event kind
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&EventEnvelope) -> Result<()> + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(handler))
    }

    /// Subscribe to every event kind
    pub fn subscribe_all<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&EventEnvelope) -> Result<()> + Send + Sync + 'static,
    {
        self.register(None, Arc::new(handler))
    }

    fn register(&self, key: Option<EventKind>, handler: EventHandler) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let sub = Subscriber { id, handler };
        {
            let mut registry = self.inner.registry.lock();
            match key {
                Some(kind) => registry.typed.entry(kind).or_default().push(sub),
                None => registry.wildcard.push(sub),
            }
        }
        Subscription {
            bus: Arc::downgrade(&self.inner),
            key,
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Number of live subscribers for a kind (excluding wildcard ones)
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.inner
            .registry
            .lock()
            .typed
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Receive every published envelope over a broadcast channel
    #[must_use]
    pub fn watch(&self) -> broadcast::Receiver<EventEnvelope> {
        self.inner.watch_tx.subscribe()
    }

    /// Every published envelope as a stream; lagged items are skipped
    pub fn stream(&self) -> impl Stream<Item = EventEnvelope> + Send + 'static {
        let mut rx = self.watch();
        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(envelope) => yield envelope,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("Event stream lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// Non-owning handle, for handlers that publish without keeping the bus alive
    #[must_use]
    pub fn downgrade(&self) -> WeakEventBus {
        WeakEventBus {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Drop every subscriber
    pub fn teardown(&self) {
        let mut registry = self.inner.registry.lock();
        let count =
            registry.typed.values().map(Vec::len).sum::<usize>() + registry.wildcard.len();
        registry.typed.clear();
        registry.wildcard.clear();
        log::debug!("Event bus torn down, dropped {} subscribers", count);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning handle to an [`EventBus`]
#[derive(Clone)]
pub struct WeakEventBus {
    inner: Weak<BusInner>,
}

impl WeakEventBus {
    /// The bus, if it is still alive
    #[must_use]
    pub fn upgrade(&self) -> Option<EventBus> {
        self.inner.upgrade().map(|inner| EventBus { inner })
    }
}

/// Capability that removes exactly one registration
///
/// Dropping a `Subscription` does not unsubscribe; call
/// [`Subscription::unsubscribe`]. Repeated calls are no-ops.
pub struct Subscription {
    bus: Weak<BusInner>,
    key: Option<EventKind>,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the registration
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.bus.upgrade() {
            inner.remove(self.key, self.id);
        }
    }

    /// True until `unsubscribe` is called
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
