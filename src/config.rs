use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::collectors::manager::default_interval;
use crate::collectors::{MAX_INTERVAL_SECS, MIN_INTERVAL_SECS};
use crate::hub::{self, HubConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid configuration file provided: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "crate::util::get_addr")]
    pub addr: IpAddr,

    #[serde(default = "crate::util::get_port")]
    pub port: u16,

    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Capacity of every bus mailbox
    #[serde(default = "default_bus_buffer")]
    pub bus_buffer: usize,

    #[serde(default)]
    pub websocket: WebSocketConfig,

    /// Staleness window of the network services entry
    #[serde(default = "default_network_services_ttl")]
    pub network_services_ttl_secs: u64,

    /// Collection interval per collector name; 0 registers the collector disabled
    #[serde(default)]
    pub intervals: HashMap<String, u64>,

    /// How long shutdown waits for tasks to finish
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }

    /// Configured interval of a collector, or its default
    pub fn interval(&self, collector: &str) -> u64 {
        self.intervals
            .get(collector)
            .copied()
            .unwrap_or_else(|| default_interval(collector))
    }

    pub fn network_services_ttl(&self) -> Duration {
        Duration::from_secs(self.network_services_ttl_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus_buffer == 0 {
            return Err(ConfigError::Invalid("bus_buffer must be at least 1".into()));
        }

        if self.websocket.client_buffer == 0 || self.websocket.broadcast_buffer == 0 {
            return Err(ConfigError::Invalid(
                "websocket buffers must be at least 1".into(),
            ));
        }

        if self.websocket.ping_interval_secs >= self.websocket.read_timeout_secs {
            return Err(ConfigError::Invalid(
                "websocket ping interval must be shorter than the read timeout".into(),
            ));
        }

        for (name, &interval) in &self.intervals {
            if interval != 0 && !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&interval) {
                return Err(ConfigError::Invalid(format!(
                    "interval of {name} must be 0 or between {MIN_INTERVAL_SECS} and {MAX_INTERVAL_SECS} seconds"
                )));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: crate::util::get_addr(),
            port: crate::util::get_port(),
            enable_cors: default_enable_cors(),
            bus_buffer: default_bus_buffer(),
            websocket: WebSocketConfig::default(),
            network_services_ttl_secs: default_network_services_ttl(),
            intervals: HashMap::new(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    pub client_buffer: usize,
    pub broadcast_buffer: usize,
    pub ping_interval_secs: u64,
    pub read_timeout_secs: u64,
    pub drain_grace_ms: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            client_buffer: hub::CLIENT_BUFFER_SIZE,
            broadcast_buffer: hub::BROADCAST_BUFFER_SIZE,
            ping_interval_secs: hub::PING_INTERVAL.as_secs(),
            read_timeout_secs: hub::READ_TIMEOUT.as_secs(),
            drain_grace_ms: hub::DRAIN_GRACE.as_millis() as u64,
        }
    }
}

impl From<&WebSocketConfig> for HubConfig {
    fn from(ws: &WebSocketConfig) -> Self {
        HubConfig {
            client_buffer: ws.client_buffer,
            broadcast_buffer: ws.broadcast_buffer,
            ping_interval: Duration::from_secs(ws.ping_interval_secs),
            read_timeout: Duration::from_secs(ws.read_timeout_secs),
            drain_grace: Duration::from_millis(ws.drain_grace_ms),
        }
    }
}

fn default_enable_cors() -> bool {
    true
}

fn default_bus_buffer() -> usize {
    1024
}

fn default_network_services_ttl() -> u64 {
    crate::cache::NETWORK_SERVICES_TTL.as_secs()
}

fn default_shutdown_grace() -> u64 {
    5
}

pub fn read_config_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    let config: Config = serde_json::from_str(&file_content)?;
    config.validate()?;

    trace!("loaded config: {config:?}");
    Ok(config)
}
