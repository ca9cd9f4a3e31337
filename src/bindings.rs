//! Topic → cache bindings
//!
//! [`cache_bindings`] is the one list saying which topic feeds which cache entry. Both the
//! cache subscriber (via [`CacheDispatch`]) and the WebSocket mirror (via
//! [`broadcast_topic_names`]) derive their topic sets from it, so adding a collector means
//! adding exactly one entry here.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use tracing::{trace, warn};

use crate::bus::Topic;
use crate::cache::CacheStore;
use crate::events::{topics, EventPayload, Payload, PayloadKind};
use crate::models::CollectorStateEvent;

/// Event name used for payloads no topic is known for
pub const FALLBACK_EVENT_NAME: &str = "update";

type Updater = Box<dyn Fn(&CacheStore, Payload) + Send + Sync>;

/// A topic, the payload kind published on it, and how it updates the cache
pub struct Binding {
    topic: &'static str,
    kind: PayloadKind,
    update: Updater,
}

impl Binding {
    pub fn topic(&self) -> &'static str {
        self.topic
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("topic", &self.topic)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Bind a typed topic to a cache update
pub fn bind<T>(topic: Topic<T>, store: fn(&CacheStore, Arc<T>)) -> Binding
where
    T: EventPayload,
{
    Binding {
        topic: topic.name(),
        kind: T::KIND,
        update: Box::new(move |cache: &CacheStore, payload: Payload| {
            if let Some(value) = T::from_payload(payload) {
                store(cache, value);
            }
        }),
    }
}

/// Every topic that feeds the cache
pub fn cache_bindings() -> Vec<Binding> {
    vec![
        bind(topics::SYSTEM_UPDATE, |c, v| c.system.store(v)),
        bind(topics::ARRAY_STATUS_UPDATE, |c, v| c.array.store(v)),
        bind(topics::DISK_LIST_UPDATE, |c, v| c.disks.store(v)),
        bind(topics::SHARE_LIST_UPDATE, |c, v| c.shares.store(v)),
        bind(topics::CONTAINER_LIST_UPDATE, |c, v| c.containers.store(v)),
        bind(topics::VM_LIST_UPDATE, |c, v| c.vms.store(v)),
        bind(topics::UPS_STATUS_UPDATE, |c, v| c.ups.store(v)),
        bind(topics::NUT_STATUS_UPDATE, |c, v| c.nut.store(v)),
        bind(topics::GPU_METRICS_UPDATE, |c, v| c.gpu.store(v)),
        bind(topics::NETWORK_LIST_UPDATE, |c, v| c.network.store(v)),
        bind(topics::HARDWARE_UPDATE, |c, v| c.hardware.store(v)),
        bind(topics::REGISTRATION_UPDATE, |c, v| c.registration.store(v)),
        bind(topics::NOTIFICATIONS_UPDATE, |c, v| c.notifications.store(v)),
        bind(topics::UNASSIGNED_DEVICES_UPDATE, |c, v| c.unassigned.store(v)),
        bind(topics::ZFS_POOLS_UPDATE, |c, v| c.zfs_pools.store(v)),
        bind(topics::ZFS_DATASETS_UPDATE, |c, v| c.zfs_datasets.store(v)),
        bind(topics::ZFS_SNAPSHOTS_UPDATE, |c, v| c.zfs_snapshots.store(v)),
        bind(topics::ZFS_ARC_STATS_UPDATE, |c, v| c.zfs_arc_stats.store(v)),
    ]
}

/// Topics mirrored to WebSocket clients: every cache topic plus the broadcast-only ones
pub fn broadcast_topic_names() -> Vec<&'static str> {
    let mut names: Vec<_> = cache_bindings().iter().map(Binding::topic).collect();
    names.push(topics::COLLECTOR_STATE_CHANGE.name());
    names
}

static EVENT_NAMES: LazyLock<HashMap<PayloadKind, &'static str>> = LazyLock::new(|| {
    let mut names: HashMap<_, _> = cache_bindings()
        .iter()
        .map(|b| (b.kind, b.topic))
        .collect();
    names.insert(CollectorStateEvent::KIND, topics::COLLECTOR_STATE_CHANGE.name());
    names
});

/// Event name for a payload, [`FALLBACK_EVENT_NAME`] if its kind has no topic
pub fn topic_for_kind(kind: PayloadKind) -> &'static str {
    EVENT_NAMES.get(&kind).copied().unwrap_or(FALLBACK_EVENT_NAME)
}

/// Payload kind → cache updater, derived from a binding list
pub struct CacheDispatch {
    updaters: HashMap<PayloadKind, Updater>,
    topics: Vec<&'static str>,
}

impl CacheDispatch {
    /// Derive the dispatch map; a later binding for the same kind replaces an earlier one
    pub fn from_bindings(bindings: Vec<Binding>) -> Self {
        let mut updaters = HashMap::with_capacity(bindings.len());
        let mut topics = Vec::with_capacity(bindings.len());

        for binding in bindings {
            topics.push(binding.topic);
            if updaters.insert(binding.kind, binding.update).is_some() {
                warn!(kind = ?binding.kind, "payload kind bound twice, keeping the last binding");
            }
        }

        Self { updaters, topics }
    }

    /// Topics the cache subscriber must listen on
    pub fn topics(&self) -> &[&'static str] {
        &self.topics
    }

    pub fn handles(&self, kind: PayloadKind) -> bool {
        self.updaters.contains_key(&kind)
    }

    /// Apply a bus message to the cache
    ///
    /// Returns `false` and logs a warning if no updater exists for the payload's kind.
    pub fn apply(&self, cache: &CacheStore, payload: Payload) -> bool {
        let kind = payload.kind();
        match self.updaters.get(&kind) {
            Some(update) => {
                update(cache, payload);
                trace!(?kind, "cache updated");
                true
            }
            None => {
                warn!(?kind, "no cache binding for payload kind, discarding");
                false
            }
        }
    }
}

impl Default for CacheDispatch {
    fn default() -> Self {
        Self::from_bindings(cache_bindings())
    }
}

impl fmt::Debug for CacheDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheDispatch")
            .field("topics", &self.topics)
            .finish()
    }
}
