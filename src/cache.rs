//! Latest-value cache fed by the event bus
//!
//! One lock-free cell per data kind. Writers swap in a whole new snapshot, readers get an
//! `Arc` to whichever snapshot was current when they looked, so a reader never sees a
//! half-written value and its reference stays valid after newer snapshots are swapped in.
//!
//! Lists are stored as `Arc<Vec<T>>` and never appended to in place.
//!
//! Two entries are not fed by the bus:
//! - **network services**: pull-based, re-derived from a [`NetworkServicesSource`] once the
//!   cached value is older than the staleness window (30 seconds by default)
//! - **parity history**: re-derived from a [`ParityHistorySource`] on every read, with an
//!   empty history standing in for "nothing available"

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use tracing::{debug, warn};

use crate::models::{
    ArrayStatus, ContainerInfo, DiskInfo, GpuMetrics, HardwareInfo, NetworkInfo,
    NetworkServicesStatus, NotificationList, NutStatus, ParityCheckHistory, Registration,
    ShareInfo, SystemInfo, UnassignedDeviceList, UpsStatus, VmInfo, ZfsArcStats, ZfsDataset,
    ZfsPool, ZfsSnapshot,
};

/// Staleness window of the network services entry
pub const NETWORK_SERVICES_TTL: Duration = Duration::from_secs(30);

/// Source of network services status (SMB, NFS, SSH, ...), read on demand
pub trait NetworkServicesSource: Send + Sync {
    fn network_services_status(&self) -> anyhow::Result<NetworkServicesStatus>;
}

/// Source of the parity check history log
pub trait ParityHistorySource: Send + Sync {
    fn parity_history(&self) -> anyhow::Result<ParityCheckHistory>;
}

/// An atomically swappable snapshot slot; empty until the first store
pub struct CacheCell<T> {
    inner: ArcSwapOption<T>,
}

impl<T> CacheCell<T> {
    pub fn new() -> Self {
        Self {
            inner: ArcSwapOption::empty(),
        }
    }

    /// Replace the snapshot
    pub fn store(&self, value: Arc<T>) {
        self.inner.store(Some(value));
    }

    /// Current snapshot, `None` if nothing was stored yet
    pub fn load(&self) -> Option<Arc<T>> {
        self.inner.load_full()
    }

    pub fn is_populated(&self) -> bool {
        self.inner.load().is_some()
    }
}

impl<T> CacheCell<Vec<T>> {
    /// Current list, empty if nothing was stored yet
    pub fn load_list(&self) -> Arc<Vec<T>> {
        self.load().unwrap_or_default()
    }
}

impl<T> Default for CacheCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CacheCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheCell")
            .field("populated", &self.is_populated())
            .finish()
    }
}

struct Refreshed<T> {
    value: Arc<T>,
    refreshed_at: Instant,
}

/// A cell whose value expires after `ttl` and is then re-derived on read
pub struct StalenessCell<T> {
    inner: ArcSwapOption<Refreshed<T>>,
    ttl: Duration,
}

impl<T> StalenessCell<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: ArcSwapOption::empty(),
            ttl,
        }
    }

    pub fn store(&self, value: Arc<T>) {
        self.inner.store(Some(Arc::new(Refreshed {
            value,
            refreshed_at: Instant::now(),
        })));
    }

    /// Last stored value regardless of age
    pub fn peek(&self) -> Option<Arc<T>> {
        self.inner.load_full().map(|r| r.value.clone())
    }

    /// Return the cached value while fresh, otherwise run `refresh`
    ///
    /// A failed refresh logs a warning and falls back to the last good value.
    pub fn load_or_refresh<F>(&self, refresh: F) -> Option<Arc<T>>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        if let Some(cached) = self.inner.load_full() {
            if cached.refreshed_at.elapsed() < self.ttl {
                return Some(cached.value.clone());
            }
        }

        match refresh() {
            Ok(value) => {
                let value = Arc::new(value);
                self.store(value.clone());
                debug!("refreshed stale cache entry");
                Some(value)
            }
            Err(e) => {
                warn!("failed to refresh cache entry, serving last good value: {e:#}");
                self.peek()
            }
        }
    }
}

/// Holder of the latest known snapshot of every data kind
///
/// Read by the REST layer and anything else needing current state; written only by the
/// cache subscriber loop through the dispatch table.
pub struct CacheStore {
    pub(crate) system: CacheCell<SystemInfo>,
    pub(crate) array: CacheCell<ArrayStatus>,
    pub(crate) disks: CacheCell<Vec<DiskInfo>>,
    pub(crate) shares: CacheCell<Vec<ShareInfo>>,
    pub(crate) containers: CacheCell<Vec<ContainerInfo>>,
    pub(crate) vms: CacheCell<Vec<VmInfo>>,
    pub(crate) ups: CacheCell<UpsStatus>,
    pub(crate) nut: CacheCell<NutStatus>,
    pub(crate) gpu: CacheCell<Vec<GpuMetrics>>,
    pub(crate) network: CacheCell<Vec<NetworkInfo>>,
    pub(crate) hardware: CacheCell<HardwareInfo>,
    pub(crate) registration: CacheCell<Registration>,
    pub(crate) notifications: CacheCell<NotificationList>,
    pub(crate) unassigned: CacheCell<UnassignedDeviceList>,
    pub(crate) zfs_pools: CacheCell<Vec<ZfsPool>>,
    pub(crate) zfs_datasets: CacheCell<Vec<ZfsDataset>>,
    pub(crate) zfs_snapshots: CacheCell<Vec<ZfsSnapshot>>,
    pub(crate) zfs_arc_stats: CacheCell<ZfsArcStats>,

    network_services: StalenessCell<NetworkServicesStatus>,
    network_services_source: Option<Arc<dyn NetworkServicesSource>>,
    parity_source: Option<Arc<dyn ParityHistorySource>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            system: CacheCell::new(),
            array: CacheCell::new(),
            disks: CacheCell::new(),
            shares: CacheCell::new(),
            containers: CacheCell::new(),
            vms: CacheCell::new(),
            ups: CacheCell::new(),
            nut: CacheCell::new(),
            gpu: CacheCell::new(),
            network: CacheCell::new(),
            hardware: CacheCell::new(),
            registration: CacheCell::new(),
            notifications: CacheCell::new(),
            unassigned: CacheCell::new(),
            zfs_pools: CacheCell::new(),
            zfs_datasets: CacheCell::new(),
            zfs_snapshots: CacheCell::new(),
            zfs_arc_stats: CacheCell::new(),
            network_services: StalenessCell::new(NETWORK_SERVICES_TTL),
            network_services_source: None,
            parity_source: None,
        }
    }

    pub fn with_network_services_source(mut self, source: Arc<dyn NetworkServicesSource>) -> Self {
        self.network_services_source = Some(source);
        self
    }

    /// Override the staleness window of the network services entry
    pub fn with_network_services_ttl(mut self, ttl: Duration) -> Self {
        self.network_services = StalenessCell::new(ttl);
        self
    }

    pub fn with_parity_history_source(mut self, source: Arc<dyn ParityHistorySource>) -> Self {
        self.parity_source = Some(source);
        self
    }

    pub fn system(&self) -> Option<Arc<SystemInfo>> {
        self.system.load()
    }

    pub fn array(&self) -> Option<Arc<ArrayStatus>> {
        self.array.load()
    }

    pub fn disks(&self) -> Arc<Vec<DiskInfo>> {
        self.disks.load_list()
    }

    pub fn shares(&self) -> Arc<Vec<ShareInfo>> {
        self.shares.load_list()
    }

    pub fn containers(&self) -> Arc<Vec<ContainerInfo>> {
        self.containers.load_list()
    }

    pub fn vms(&self) -> Arc<Vec<VmInfo>> {
        self.vms.load_list()
    }

    pub fn ups(&self) -> Option<Arc<UpsStatus>> {
        self.ups.load()
    }

    pub fn nut(&self) -> Option<Arc<NutStatus>> {
        self.nut.load()
    }

    pub fn gpu(&self) -> Arc<Vec<GpuMetrics>> {
        self.gpu.load_list()
    }

    pub fn network(&self) -> Arc<Vec<NetworkInfo>> {
        self.network.load_list()
    }

    pub fn hardware(&self) -> Option<Arc<HardwareInfo>> {
        self.hardware.load()
    }

    pub fn registration(&self) -> Option<Arc<Registration>> {
        self.registration.load()
    }

    pub fn notifications(&self) -> Option<Arc<NotificationList>> {
        self.notifications.load()
    }

    pub fn unassigned(&self) -> Option<Arc<UnassignedDeviceList>> {
        self.unassigned.load()
    }

    pub fn zfs_pools(&self) -> Arc<Vec<ZfsPool>> {
        self.zfs_pools.load_list()
    }

    pub fn zfs_datasets(&self) -> Arc<Vec<ZfsDataset>> {
        self.zfs_datasets.load_list()
    }

    pub fn zfs_snapshots(&self) -> Arc<Vec<ZfsSnapshot>> {
        self.zfs_snapshots.load_list()
    }

    pub fn zfs_arc_stats(&self) -> Option<Arc<ZfsArcStats>> {
        self.zfs_arc_stats.load()
    }

    /// Network services status, re-derived from its source once stale
    ///
    /// Falls back to the last good value when the source fails.
    pub fn network_services(&self) -> Option<Arc<NetworkServicesStatus>> {
        match &self.network_services_source {
            Some(source) => self
                .network_services
                .load_or_refresh(|| source.network_services_status()),
            None => self.network_services.peek(),
        }
    }

    /// Seed the network services entry, restarting its staleness window
    pub fn store_network_services(&self, status: NetworkServicesStatus) {
        self.network_services.store(Arc::new(status));
    }

    /// Parity check history, read fresh from its source on every call
    ///
    /// Never absent: without a source, or when reading fails, an empty history is returned.
    pub fn parity_history(&self) -> Arc<ParityCheckHistory> {
        let Some(source) = &self.parity_source else {
            return Arc::new(ParityCheckHistory::default());
        };

        match source.parity_history() {
            Ok(history) => Arc::new(history),
            Err(e) => {
                warn!("failed to read parity history: {e:#}");
                Arc::new(ParityCheckHistory::default())
            }
        }
    }

    /// Names of the bus-fed entries that hold a value
    pub fn populated_entries(&self) -> Vec<&'static str> {
        let entries = [
            ("system", self.system.is_populated()),
            ("array", self.array.is_populated()),
            ("disks", self.disks.is_populated()),
            ("shares", self.shares.is_populated()),
            ("containers", self.containers.is_populated()),
            ("vms", self.vms.is_populated()),
            ("ups", self.ups.is_populated()),
            ("nut", self.nut.is_populated()),
            ("gpu", self.gpu.is_populated()),
            ("network", self.network.is_populated()),
            ("hardware", self.hardware.is_populated()),
            ("registration", self.registration.is_populated()),
            ("notifications", self.notifications.is_populated()),
            ("unassigned", self.unassigned.is_populated()),
            ("zfs_pools", self.zfs_pools.is_populated()),
            ("zfs_datasets", self.zfs_datasets.is_populated()),
            ("zfs_snapshots", self.zfs_snapshots.is_populated()),
            ("zfs_arc_stats", self.zfs_arc_stats.is_populated()),
        ];

        entries
            .into_iter()
            .filter_map(|(name, populated)| populated.then_some(name))
            .collect()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("populated", &self.populated_entries())
            .finish()
    }
}
