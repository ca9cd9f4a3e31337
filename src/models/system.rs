use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub cpu_usage_percent: f64,
    pub cpu_model: String,
    pub cpu_cores: usize,
    pub cpu_threads: usize,
    pub cpu_mhz: f64,
    pub cpu_temp_celsius: Option<f64>,
    pub ram_usage_percent: f64,
    pub ram_total_bytes: u64,
    pub ram_used_bytes: u64,
    pub ram_free_bytes: u64,
    pub fans: Vec<FanInfo>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FanInfo {
    pub name: String,
    pub rpm: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuMetrics {
    pub available: bool,
    pub index: u32,
    pub vendor: String,
    pub name: String,
    pub driver_version: String,
    pub temperature_celsius: f64,
    pub utilization_gpu_percent: f64,
    pub utilization_memory_percent: f64,
    pub memory_total_bytes: u64,
    pub memory_used_bytes: u64,
    pub power_draw_watts: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub name: String,
    pub mac_address: String,
    pub ip_address: String,
    pub speed_mbps: u32,
    pub state: String,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub packets_received: u64,
    pub packets_sent: u64,
    pub errors_received: u64,
    pub errors_sent: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub bios_vendor: Option<String>,
    pub bios_version: Option<String>,
    pub baseboard_manufacturer: Option<String>,
    pub baseboard_product: Option<String>,
    pub cpu_socket: Option<String>,
    pub memory_devices: Vec<MemoryDeviceInfo>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDeviceInfo {
    pub locator: String,
    pub size_bytes: u64,
    pub speed_mts: u32,
    pub manufacturer: String,
}

/// License registration state of the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// "trial", "basic", "plus", "pro", "lifetime"
    #[serde(rename = "type")]
    pub kind: String,
    pub state: String,
    pub expiration: Option<DateTime<Utc>>,
    pub server_name: Option<String>,
    pub guid: Option<String>,
    pub timestamp: DateTime<Utc>,
}
