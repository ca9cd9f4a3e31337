//! Helper functions for integration tests

use std::future::Future;
use std::time::Duration;

use storage_agent::config::{Config, WebSocketConfig};
use storage_agent::models::{ArrayStatus, DiskInfo, SystemInfo};

/// Config bound to an ephemeral localhost port with short timings
pub fn test_config() -> Config {
    Config {
        addr: "127.0.0.1".parse().unwrap(),
        port: 0,
        bus_buffer: 256,
        websocket: WebSocketConfig {
            drain_grace_ms: 200,
            ..Default::default()
        },
        shutdown_grace_secs: 2,
        ..Default::default()
    }
}

pub fn array_status(state: &str) -> ArrayStatus {
    ArrayStatus {
        state: state.to_string(),
        num_disks: 6,
        num_data_disks: 4,
        num_parity_disks: 2,
        ..Default::default()
    }
}

pub fn system_info(hostname: &str) -> SystemInfo {
    SystemInfo {
        hostname: hostname.to_string(),
        cpu_usage_percent: 12.5,
        ..Default::default()
    }
}

pub fn disks(names: &[&str]) -> Vec<DiskInfo> {
    names
        .iter()
        .map(|name| DiskInfo {
            name: name.to_string(),
            status: "DISK_OK".to_string(),
            ..Default::default()
        })
        .collect()
}

/// Poll `condition` until it holds, panicking after `limit`
pub async fn wait_until<F>(limit: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(limit, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Await `fut`, panicking if it takes longer than two seconds
pub async fn within<T>(fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), fut)
        .await
        .expect("timed out")
}
