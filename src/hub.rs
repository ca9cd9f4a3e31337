//! WebSocket broadcast hub
//!
//! The hub owns the registry of connected clients. Events reach it through a bounded
//! broadcast queue and are fanned out by a single run loop:
//!
//! ```text
//! broadcast loop ──► WsHub::broadcast ──► hub queue ──► run loop ──► fan_out
//!                                                                    ├─► client 1 outbound (filter ok)
//!                                                                    ├─► client 2 (filtered out)
//!                                                                    └─► client 3 outbound full → evicted
//! ```
//!
//! ## Locking
//!
//! - The registry lock is held for map operations only, never across I/O.
//! - Each client's [`TopicFilter`] has its own lock, so a client changing its filter never
//!   contends with the registry.
//! - Fan-out runs under the read lock and only collects slow clients; they are removed under a
//!   short write lock afterwards.
//!
//! ## Lifecycle
//!
//! A client stays registered until it unregisters itself or is evicted; removal drops the only
//! sender of its outbound queue, which ends its writer loop. On cancellation the hub clears the
//! registry and refuses every later registration.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::bindings::topic_for_kind;
use crate::events::Payload;

/// Outbound queue capacity per client
pub const CLIENT_BUFFER_SIZE: usize = 256;

/// Capacity of the hub's own broadcast queue
pub const BROADCAST_BUFFER_SIZE: usize = 256;

pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Read deadline, extended by every pong
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// How long the writer may keep flushing after the reader has stopped
pub const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Identifier of a connected client
pub type ClientId = u64;

/// Hub and client connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    pub client_buffer: usize,
    pub broadcast_buffer: usize,
    pub ping_interval: Duration,
    pub read_timeout: Duration,
    pub drain_grace: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            client_buffer: CLIENT_BUFFER_SIZE,
            broadcast_buffer: BROADCAST_BUFFER_SIZE,
            ping_interval: PING_INTERVAL,
            read_timeout: READ_TIMEOUT,
            drain_grace: DRAIN_GRACE,
        }
    }
}

/// Envelope sent to WebSocket clients
#[derive(Debug, Clone, Serialize)]
pub struct WsEvent {
    /// Topic name the payload was published on
    pub event: &'static str,
    pub timestamp: DateTime<Utc>,
    pub data: Payload,
}

impl WsEvent {
    /// Wrap a payload, naming the event after the topic of its kind
    pub fn new(data: Payload) -> Self {
        Self {
            event: topic_for_kind(data.kind()),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Per-client topic allow-list; `None` lets every topic through
#[derive(Debug, Default)]
pub struct TopicFilter {
    allowed: RwLock<Option<HashSet<String>>>,
}

impl TopicFilter {
    pub fn accepts(&self, topic: &str) -> bool {
        match &*self.allowed.read() {
            Some(allowed) => allowed.contains(topic),
            None => true,
        }
    }

    /// Replace the allow-list; `None` or an empty list means every topic
    pub fn set(&self, topics: Option<Vec<String>>) {
        let allowed = topics
            .filter(|t| !t.is_empty())
            .map(|t| t.into_iter().collect::<HashSet<_>>());
        *self.allowed.write() = allowed;
    }

    /// Current allow-list, sorted
    pub fn allowed(&self) -> Option<Vec<String>> {
        self.allowed.read().as_ref().map(|allowed| {
            let mut topics: Vec<_> = allowed.iter().cloned().collect();
            topics.sort();
            topics
        })
    }
}

/// What a newly registered client gets back from the hub
#[derive(Debug)]
pub struct ClientRegistration {
    pub id: ClientId,
    pub filter: Arc<TopicFilter>,
    pub outbound: mpsc::Receiver<Arc<WsEvent>>,
}

struct ClientSlot {
    sender: mpsc::Sender<Arc<WsEvent>>,
    filter: Arc<TopicFilter>,
}

#[derive(Default)]
struct Registry {
    clients: HashMap<ClientId, ClientSlot>,
    closed: bool,
}

/// Snapshot of the hub counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub connected: usize,
    pub delivered: u64,
    pub evicted: u64,
}

/// Client registry and fan-out
pub struct HubRegistry {
    inner: RwLock<Registry>,
    client_buffer: usize,
    next_id: AtomicU64,
    delivered: AtomicU64,
    evicted: AtomicU64,
}

impl HubRegistry {
    pub fn new(client_buffer: usize) -> Self {
        Self {
            inner: RwLock::new(Registry::default()),
            client_buffer: client_buffer.max(1),
            next_id: AtomicU64::new(1),
            delivered: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Add a client with an empty filter
    ///
    /// Returns `None` once the hub has shut down.
    pub fn register(&self) -> Option<ClientRegistration> {
        let (sender, outbound) = mpsc::channel(self.client_buffer);
        let filter = Arc::new(TopicFilter::default());

        let id = {
            let mut inner = self.inner.write();
            if inner.closed {
                return None;
            }

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            inner.clients.insert(
                id,
                ClientSlot {
                    sender,
                    filter: filter.clone(),
                },
            );
            id
        };

        debug!(client = id, "websocket client registered");

        Some(ClientRegistration {
            id,
            filter,
            outbound,
        })
    }

    /// Remove a client and close its outbound queue
    ///
    /// Safe to call repeatedly; returns whether this call removed it.
    pub fn unregister(&self, id: ClientId) -> bool {
        let removed = self.inner.write().clients.remove(&id).is_some();
        if removed {
            debug!(client = id, "websocket client unregistered");
        }
        removed
    }

    /// Queue `event` for every client whose filter accepts it
    ///
    /// Clients whose queue is full or closed are evicted. Returns the number of clients the
    /// event was queued for.
    pub fn fan_out(&self, event: &Arc<WsEvent>) -> usize {
        let mut delivered = 0;
        let mut slow = Vec::new();

        {
            let inner = self.inner.read();
            for (id, slot) in &inner.clients {
                if !slot.filter.accepts(event.event) {
                    continue;
                }

                match slot.sender.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        debug!(client = id, "client queue full, evicting");
                        slow.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(client = id, "client queue closed, evicting");
                        slow.push(*id);
                    }
                }
            }
        }

        if !slow.is_empty() {
            let mut inner = self.inner.write();
            let mut evicted = 0;
            for id in slow {
                if inner.clients.remove(&id).is_some() {
                    evicted += 1;
                }
            }
            self.evicted.fetch_add(evicted, Ordering::Relaxed);
        }

        self.delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        trace!(event = event.event, delivered, "fanned out event");
        delivered
    }

    /// Drop every client and refuse further registrations
    pub fn shutdown(&self) {
        let mut inner = self.inner.write();
        inner.closed = true;
        let dropped = inner.clients.len();
        inner.clients.clear();
        info!(dropped, "websocket hub closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.read().closed
    }

    pub fn client_count(&self) -> usize {
        self.inner.read().clients.len()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.inner.read().clients.contains_key(&id)
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            connected: self.client_count(),
            delivered: self.delivered.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for HubRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}

/// The hub's run loop
struct HubActor {
    registry: Arc<HubRegistry>,
    events: mpsc::Receiver<Arc<WsEvent>>,
    cancel: CancellationToken,
}

impl HubActor {
    #[instrument(skip(self), name = "ws_hub")]
    async fn run(mut self) {
        debug!("starting websocket hub");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    debug!("hub cancelled");
                    break;
                }

                event = self.events.recv() => match event {
                    Some(event) => {
                        self.registry.fan_out(&event);
                    }
                    None => {
                        debug!("hub queue closed");
                        break;
                    }
                },
            }
        }

        self.registry.shutdown();
        debug!("websocket hub stopped");
    }
}

/// Handle to a running hub
///
/// Cheap to clone; every clone feeds the same run loop and registry.
#[derive(Clone)]
pub struct WsHub {
    sender: mpsc::Sender<Arc<WsEvent>>,
    registry: Arc<HubRegistry>,
    config: Arc<HubConfig>,
}

impl WsHub {
    /// Spawn the hub's run loop; it stops and clears the registry when `cancel` fires
    pub fn spawn(config: HubConfig, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (sender, events) = mpsc::channel(config.broadcast_buffer.max(1));
        let registry = Arc::new(HubRegistry::new(config.client_buffer));

        let actor = HubActor {
            registry: registry.clone(),
            events,
            cancel,
        };
        let task = tokio::spawn(actor.run());

        let hub = Self {
            sender,
            registry,
            config: Arc::new(config),
        };
        (hub, task)
    }

    /// Hand a payload to the hub without waiting
    ///
    /// Returns `false` if the hub queue is full or the hub has stopped.
    pub fn broadcast(&self, payload: Payload) -> bool {
        self.broadcast_event(WsEvent::new(payload))
    }

    pub fn broadcast_event(&self, event: WsEvent) -> bool {
        match self.sender.try_send(Arc::new(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                debug!(event = event.event, "hub queue full, dropping event");
                false
            }
            Err(TrySendError::Closed(_)) => {
                trace!("hub stopped, dropping event");
                false
            }
        }
    }

    pub fn registry(&self) -> &Arc<HubRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}

impl fmt::Debug for WsHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsHub")
            .field("registry", &self.registry)
            .finish()
    }
}
