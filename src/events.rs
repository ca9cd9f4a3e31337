//! Bus payloads and topic definitions
//!
//! Every value published on the agent's bus is a [`Payload`]: a closed set of variants, one
//! per collector output, each holding an `Arc` so fanning a message out to several mailboxes
//! only copies a pointer. [`PayloadKind`] is the explicit discriminant the dispatch table
//! keys on.

use std::sync::Arc;

use serde::Serialize;

use crate::bus::{EventBus, Topic};
use crate::models::{
    ArrayStatus, CollectorStateEvent, ContainerInfo, DiskInfo, GpuMetrics, HardwareInfo,
    NetworkInfo, NotificationList, NutStatus, Registration, ShareInfo, SystemInfo,
    UnassignedDeviceList, UpsStatus, VmInfo, ZfsArcStats, ZfsDataset, ZfsPool, ZfsSnapshot,
};

/// The bus type used by the agent
pub type AgentBus = EventBus<Payload>;

/// A type that travels on the bus as one [`Payload`] variant
pub trait EventPayload: Send + Sync + Sized + 'static {
    /// Discriminant of the variant carrying this type
    const KIND: PayloadKind;

    fn into_payload(value: Arc<Self>) -> Payload;

    /// Extract the value if `payload` is this type's variant
    fn from_payload(payload: Payload) -> Option<Arc<Self>>;
}

macro_rules! payloads {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        /// A value published on the agent bus
        ///
        /// Serialises as the inner value only, which is what WebSocket clients see in `data`.
        #[derive(Debug, Clone, Serialize)]
        #[serde(untagged)]
        pub enum Payload {
            $($variant(Arc<$ty>),)*
        }

        /// Discriminant of a [`Payload`]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PayloadKind {
            $($variant,)*
        }

        impl PayloadKind {
            pub const ALL: &'static [PayloadKind] = &[$(PayloadKind::$variant,)*];
        }

        impl Payload {
            pub fn kind(&self) -> PayloadKind {
                match self {
                    $(Payload::$variant(_) => PayloadKind::$variant,)*
                }
            }
        }

        $(
            impl EventPayload for $ty {
                const KIND: PayloadKind = PayloadKind::$variant;

                fn into_payload(value: Arc<Self>) -> Payload {
                    Payload::$variant(value)
                }

                #[allow(unreachable_patterns)]
                fn from_payload(payload: Payload) -> Option<Arc<Self>> {
                    match payload {
                        Payload::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Payload {
                fn from(value: $ty) -> Self {
                    Payload::$variant(Arc::new(value))
                }
            }

            impl From<Arc<$ty>> for Payload {
                fn from(value: Arc<$ty>) -> Self {
                    Payload::$variant(value)
                }
            }
        )*
    };
}

payloads! {
    System => SystemInfo,
    ArrayStatus => ArrayStatus,
    Disks => Vec<DiskInfo>,
    Shares => Vec<ShareInfo>,
    Containers => Vec<ContainerInfo>,
    Vms => Vec<VmInfo>,
    Ups => UpsStatus,
    Nut => NutStatus,
    Gpu => Vec<GpuMetrics>,
    Network => Vec<NetworkInfo>,
    Hardware => HardwareInfo,
    Registration => Registration,
    Notifications => NotificationList,
    Unassigned => UnassignedDeviceList,
    ZfsPools => Vec<ZfsPool>,
    ZfsDatasets => Vec<ZfsDataset>,
    ZfsSnapshots => Vec<ZfsSnapshot>,
    ZfsArcStats => ZfsArcStats,
    CollectorState => CollectorStateEvent,
}

/// Typed topic names shared by the bus and the WebSocket event stream
pub mod topics {
    use super::*;

    pub const SYSTEM_UPDATE: Topic<SystemInfo> = Topic::new("system_update");
    pub const ARRAY_STATUS_UPDATE: Topic<ArrayStatus> = Topic::new("array_status_update");
    pub const DISK_LIST_UPDATE: Topic<Vec<DiskInfo>> = Topic::new("disk_list_update");
    pub const SHARE_LIST_UPDATE: Topic<Vec<ShareInfo>> = Topic::new("share_list_update");
    pub const CONTAINER_LIST_UPDATE: Topic<Vec<ContainerInfo>> =
        Topic::new("container_list_update");
    pub const VM_LIST_UPDATE: Topic<Vec<VmInfo>> = Topic::new("vm_list_update");
    pub const UPS_STATUS_UPDATE: Topic<UpsStatus> = Topic::new("ups_status_update");
    pub const NUT_STATUS_UPDATE: Topic<NutStatus> = Topic::new("nut_status_update");
    pub const GPU_METRICS_UPDATE: Topic<Vec<GpuMetrics>> = Topic::new("gpu_metrics_update");
    pub const NETWORK_LIST_UPDATE: Topic<Vec<NetworkInfo>> = Topic::new("network_list_update");
    pub const HARDWARE_UPDATE: Topic<HardwareInfo> = Topic::new("hardware_update");
    pub const REGISTRATION_UPDATE: Topic<Registration> = Topic::new("registration_update");
    pub const NOTIFICATIONS_UPDATE: Topic<NotificationList> = Topic::new("notifications_update");
    pub const UNASSIGNED_DEVICES_UPDATE: Topic<UnassignedDeviceList> =
        Topic::new("unassigned_devices_update");
    pub const ZFS_POOLS_UPDATE: Topic<Vec<ZfsPool>> = Topic::new("zfs_pools_update");
    pub const ZFS_DATASETS_UPDATE: Topic<Vec<ZfsDataset>> = Topic::new("zfs_datasets_update");
    pub const ZFS_SNAPSHOTS_UPDATE: Topic<Vec<ZfsSnapshot>> = Topic::new("zfs_snapshots_update");
    pub const ZFS_ARC_STATS_UPDATE: Topic<ZfsArcStats> = Topic::new("zfs_arc_stats_update");
    pub const COLLECTOR_STATE_CHANGE: Topic<CollectorStateEvent> =
        Topic::new("collector_state_change");
}
