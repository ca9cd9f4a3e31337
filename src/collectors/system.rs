use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sysinfo::{Components, System};
use tracing::{instrument, trace};

use super::Collector;
use crate::events::{AgentBus, topics};
use crate::models::SystemInfo;

/// Host CPU, memory and temperature collector backed by `sysinfo`
///
/// Keeps one [`System`] across runs so CPU usage is measured between consecutive passes.
pub struct SystemCollector {
    sys: Mutex<System>,
}

impl SystemCollector {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();

        Self {
            sys: Mutex::new(sys),
        }
    }

    /// Take a fresh snapshot of the host
    pub fn snapshot(&self) -> SystemInfo {
        let mut sys = self.sys.lock();
        sys.refresh_cpu_all();
        sys.refresh_memory();

        let cpus = sys.cpus();
        let cpu_model = cpus
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .unwrap_or_default();
        let cpu_mhz = cpus.first().map_or(0.0, |cpu| cpu.frequency() as f64);
        let cpu_threads = cpus.len();

        let ram_total_bytes = sys.total_memory();
        let ram_used_bytes = sys.used_memory();
        let ram_usage_percent = if ram_total_bytes > 0 {
            ram_used_bytes as f64 / ram_total_bytes as f64 * 100.0
        } else {
            0.0
        };

        let components = Components::new_with_refreshed_list();
        let temperatures: Vec<f32> = components
            .iter()
            .filter(|c| {
                let label = c.label().to_lowercase();
                label.contains("cpu")
                    || label.contains("package")
                    || label.contains("tctl")
                    || label.contains("core")
            })
            .filter_map(|c| c.temperature())
            .collect();
        let cpu_temp_celsius = (!temperatures.is_empty())
            .then(|| temperatures.iter().sum::<f32>() as f64 / temperatures.len() as f64);

        SystemInfo {
            hostname: System::host_name().unwrap_or_default(),
            version: System::long_os_version().unwrap_or_default(),
            uptime_seconds: System::uptime(),
            cpu_usage_percent: sys.global_cpu_usage() as f64,
            cpu_model,
            cpu_cores: System::physical_core_count().unwrap_or(cpu_threads),
            cpu_threads,
            cpu_mhz,
            cpu_temp_celsius,
            ram_usage_percent,
            ram_total_bytes,
            ram_used_bytes,
            ram_free_bytes: sys.free_memory(),
            fans: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for SystemCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for SystemCollector {
    #[instrument(skip_all)]
    async fn collect(&self, bus: &AgentBus) -> anyhow::Result<()> {
        let info = self.snapshot();
        let delivered = bus.publish_typed(topics::SYSTEM_UPDATE, info);
        trace!(delivered, "published system snapshot");
        Ok(())
    }
}
