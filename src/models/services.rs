use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    /// "running", "exited", "paused", ...
    pub state: String,
    pub status: String,
    pub network_mode: String,
    pub ip_address: Option<String>,
    pub cpu_percent: f64,
    pub memory_usage_bytes: u64,
    pub memory_limit_bytes: u64,
    pub ports: Vec<PortMapping>,
    pub restart_policy: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortMapping {
    pub private_port: u16,
    pub public_port: Option<u16>,
    #[serde(rename = "type")]
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VmInfo {
    pub id: String,
    pub name: String,
    pub state: String,
    pub cpu_count: u32,
    pub guest_cpu_percent: f64,
    pub host_cpu_percent: f64,
    pub memory_allocated_bytes: u64,
    pub memory_used_bytes: u64,
    pub autostart: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpsStatus {
    pub connected: bool,
    /// apcupsd status word, e.g. "ONLINE" or "ONBATT"
    pub status: String,
    pub load_percent: f64,
    pub battery_charge_percent: f64,
    pub runtime_left_seconds: u64,
    pub power_watts: f64,
    pub nominal_power_watts: f64,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// UPS state as reported by Network UPS Tools
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutStatus {
    pub installed: bool,
    pub running: bool,
    pub connected: bool,
    pub device_name: String,
    pub host: String,
    pub driver: String,
    pub manufacturer: String,
    pub model: String,
    /// NUT status flags, e.g. "OL" or "OB LB"
    pub status: String,
    pub status_text: String,
    pub alarms: Vec<String>,
    pub battery_charge_percent: f64,
    pub battery_runtime_seconds: u64,
    pub load_percent: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationList {
    pub overview: NotificationOverview,
    pub notifications: Vec<Notification>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationOverview {
    pub unread: NotificationCounts,
    pub archive: NotificationCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationCounts {
    pub info: u32,
    pub warning: u32,
    pub alert: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: Option<String>,
    pub subject: Option<String>,
    pub description: Option<String>,
    /// "alert", "warning", "info"
    pub importance: String,
    pub timestamp: DateTime<Utc>,
    /// "unread" or "archive"
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkServiceInfo {
    pub name: String,
    pub enabled: bool,
    pub running: bool,
    pub port: Option<u16>,
}

/// Enabled/running state of the file sharing, remote access and discovery services
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkServicesStatus {
    pub services: Vec<NetworkServiceInfo>,
    pub total_services: usize,
    pub enabled_services: usize,
    pub running_services: usize,
    pub timestamp: DateTime<Utc>,
}

impl NetworkServicesStatus {
    /// Build a status summary, deriving the counters from the service list
    pub fn from_services(services: Vec<NetworkServiceInfo>) -> Self {
        let enabled_services = services.iter().filter(|s| s.enabled).count();
        let running_services = services.iter().filter(|s| s.running).count();

        Self {
            total_services: services.len(),
            enabled_services,
            running_services,
            services,
            timestamp: Utc::now(),
        }
    }
}
