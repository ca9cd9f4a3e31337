use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayStatus {
    pub state: String,
    pub used_percent: f64,
    pub free_bytes: u64,
    pub total_bytes: u64,
    pub parity_valid: bool,
    pub parity_check_status: String,
    pub parity_check_progress: f64,
    pub num_disks: u32,
    pub num_data_disks: u32,
    pub num_parity_disks: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub id: String,
    pub device: String,
    pub name: String,
    pub status: String,
    pub size_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub temperature_celsius: f64,
    pub smart_status: String,
    pub smart_errors: u32,
    pub filesystem: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareInfo {
    pub name: String,
    pub path: String,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub total_bytes: u64,
    pub usage_percent: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnassignedDeviceList {
    pub devices: Vec<UnassignedDevice>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnassignedDevice {
    /// Kernel device name, e.g. "sdc" or "nvme0n1"
    pub device: String,
    pub serial_number: String,
    pub model: String,
    pub identification: String,
    pub partitions: Vec<UnassignedPartition>,
    /// "mounted", "unmounted", "mounting", "error"
    pub status: String,
    pub spin_state: String,
    pub temperature_celsius: Option<f64>,
    pub auto_mount: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnassignedPartition {
    pub partition_number: u32,
    pub label: Option<String>,
    pub filesystem: String,
    pub mount_point: Option<String>,
    pub size_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZfsPool {
    pub name: String,
    pub guid: Option<String>,
    /// "ONLINE", "DEGRADED", "FAULTED", ...
    pub health: String,
    pub state: String,
    pub size_bytes: u64,
    pub allocated_bytes: u64,
    pub free_bytes: u64,
    pub fragmentation_percent: f64,
    pub capacity_percent: f64,
    pub dedup_ratio: f64,
    pub scan_status: Option<String>,
    pub scan_errors: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZfsDataset {
    pub name: String,
    pub pool: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub used_bytes: u64,
    pub available_bytes: u64,
    pub referenced_bytes: u64,
    pub compress_ratio: f64,
    pub mountpoint: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZfsSnapshot {
    pub name: String,
    pub dataset: String,
    pub used_bytes: u64,
    pub referenced_bytes: u64,
    pub creation: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZfsArcStats {
    pub size_bytes: u64,
    pub target_size_bytes: u64,
    pub min_size_bytes: u64,
    pub max_size_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_ratio_percent: f64,
    pub timestamp: DateTime<Utc>,
}

/// A single parity check or sync operation from the history log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParityCheckRecord {
    /// "Parity-Check", "Parity-Sync", "Read-Check", "Clear"
    pub action: String,
    pub date: DateTime<Utc>,
    pub duration_seconds: u64,
    pub speed_mbps: f64,
    /// "OK", "Canceled" or an error count
    pub status: String,
    pub errors: u64,
    pub size_bytes: u64,
}

/// Parity history; the default value is the "no history" sentinel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParityCheckHistory {
    pub records: Vec<ParityCheckRecord>,
    pub timestamp: DateTime<Utc>,
}
