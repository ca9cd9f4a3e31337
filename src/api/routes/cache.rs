//! Read-only endpoints over the cache
//!
//! Every handler answers from the latest cached snapshot and never touches the bus. An entry
//! that was not collected yet is returned as its empty value with status 200.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::api::state::ApiState;
use crate::models::{
    ArrayStatus, ContainerInfo, DiskInfo, GpuMetrics, HardwareInfo, NetworkInfo,
    NetworkServicesStatus, NotificationList, NutStatus, ParityCheckHistory, Registration,
    ShareInfo, SystemInfo, UnassignedDeviceList, UpsStatus, VmInfo, ZfsArcStats, ZfsDataset,
    ZfsPool, ZfsSnapshot,
};

type Latest<T> = Json<Arc<T>>;

fn latest<T: Default>(value: Option<Arc<T>>) -> Latest<T> {
    Json(value.unwrap_or_default())
}

/// GET /api/v1/system
pub async fn system(State(state): State<ApiState>) -> Latest<SystemInfo> {
    latest(state.cache.system())
}

/// GET /api/v1/array
pub async fn array(State(state): State<ApiState>) -> Latest<ArrayStatus> {
    latest(state.cache.array())
}

/// GET /api/v1/array/parity-history
pub async fn parity_history(State(state): State<ApiState>) -> Latest<ParityCheckHistory> {
    Json(state.cache.parity_history())
}

/// GET /api/v1/disks
pub async fn disks(State(state): State<ApiState>) -> Latest<Vec<DiskInfo>> {
    Json(state.cache.disks())
}

/// GET /api/v1/shares
pub async fn shares(State(state): State<ApiState>) -> Latest<Vec<ShareInfo>> {
    Json(state.cache.shares())
}

/// GET /api/v1/docker
pub async fn containers(State(state): State<ApiState>) -> Latest<Vec<ContainerInfo>> {
    Json(state.cache.containers())
}

/// GET /api/v1/vm
pub async fn vms(State(state): State<ApiState>) -> Latest<Vec<VmInfo>> {
    Json(state.cache.vms())
}

/// GET /api/v1/ups
pub async fn ups(State(state): State<ApiState>) -> Latest<UpsStatus> {
    latest(state.cache.ups())
}

/// GET /api/v1/nut
pub async fn nut(State(state): State<ApiState>) -> Latest<NutStatus> {
    latest(state.cache.nut())
}

/// GET /api/v1/gpu
pub async fn gpu(State(state): State<ApiState>) -> Latest<Vec<GpuMetrics>> {
    Json(state.cache.gpu())
}

/// GET /api/v1/network
pub async fn network(State(state): State<ApiState>) -> Latest<Vec<NetworkInfo>> {
    Json(state.cache.network())
}

/// GET /api/v1/network/services
pub async fn network_services(State(state): State<ApiState>) -> Latest<NetworkServicesStatus> {
    // the source is read synchronously once the cached value is stale
    let cache = state.cache.clone();
    let status = tokio::task::spawn_blocking(move || cache.network_services())
        .await
        .unwrap_or_default();
    latest(status)
}

/// GET /api/v1/hardware
pub async fn hardware(State(state): State<ApiState>) -> Latest<HardwareInfo> {
    latest(state.cache.hardware())
}

/// GET /api/v1/registration
pub async fn registration(State(state): State<ApiState>) -> Latest<Registration> {
    latest(state.cache.registration())
}

/// GET /api/v1/notifications
pub async fn notifications(State(state): State<ApiState>) -> Latest<NotificationList> {
    latest(state.cache.notifications())
}

/// GET /api/v1/unassigned
pub async fn unassigned(State(state): State<ApiState>) -> Latest<UnassignedDeviceList> {
    latest(state.cache.unassigned())
}

/// GET /api/v1/zfs/pools
pub async fn zfs_pools(State(state): State<ApiState>) -> Latest<Vec<ZfsPool>> {
    Json(state.cache.zfs_pools())
}

/// GET /api/v1/zfs/datasets
pub async fn zfs_datasets(State(state): State<ApiState>) -> Latest<Vec<ZfsDataset>> {
    Json(state.cache.zfs_datasets())
}

/// GET /api/v1/zfs/snapshots
pub async fn zfs_snapshots(State(state): State<ApiState>) -> Latest<Vec<ZfsSnapshot>> {
    Json(state.cache.zfs_snapshots())
}

/// GET /api/v1/zfs/arc
pub async fn zfs_arc_stats(State(state): State<ApiState>) -> Latest<ZfsArcStats> {
    latest(state.cache.zfs_arc_stats())
}
