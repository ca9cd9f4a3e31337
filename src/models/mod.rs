//! Payload types carried on the event bus and served from the cache
//!
//! Collectors produce these, the cache holds the latest snapshot of each,
//! and the WebSocket hub serialises them verbatim as the `data` field of an event.

pub mod collectors;
pub mod services;
pub mod storage;
pub mod system;

pub use collectors::{CollectorStateEvent, CollectorStatus, CollectorsStatusResponse, RunState};
pub use services::{
    ContainerInfo, NetworkServiceInfo, NetworkServicesStatus, Notification, NotificationCounts,
    NotificationList, NotificationOverview, NutStatus, PortMapping, UpsStatus, VmInfo,
};
pub use storage::{
    ArrayStatus, DiskInfo, ParityCheckHistory, ParityCheckRecord, ShareInfo, UnassignedDevice,
    UnassignedDeviceList, UnassignedPartition, ZfsArcStats, ZfsDataset, ZfsPool, ZfsSnapshot,
};
pub use system::{
    FanInfo, GpuMetrics, HardwareInfo, MemoryDeviceInfo, NetworkInfo, Registration, SystemInfo,
};
