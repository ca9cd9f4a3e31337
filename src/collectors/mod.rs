//! Collectors and their runtime control
//!
//! A [`Collector`] gathers one kind of state and publishes it on the bus. The
//! [`CollectorManager`] runs each enabled collector on its own interval and implements
//! [`CollectorControl`], the narrow interface the HTTP layer uses to enable, disable and
//! re-time collectors.

pub mod manager;
pub mod system;

use async_trait::async_trait;
use thiserror::Error;

use crate::events::AgentBus;
use crate::models::{CollectorStatus, CollectorsStatusResponse};

pub use manager::CollectorManager;
pub use system::SystemCollector;

/// Shortest accepted collection interval in seconds
pub const MIN_INTERVAL_SECS: u64 = 5;

/// Longest accepted collection interval in seconds
pub const MAX_INTERVAL_SECS: u64 = 3600;

/// A poller that gathers state and publishes it on the bus
#[async_trait]
pub trait Collector: Send + Sync {
    /// Run one collection pass
    ///
    /// Errors are counted and logged by the manager; the collector keeps its schedule.
    async fn collect(&self, bus: &AgentBus) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectorError {
    #[error("unknown collector: {0}")]
    UnknownCollector(String),

    #[error("cannot disable {0} collector (always required)")]
    RequiredCollector(String),

    #[error("invalid interval {0}s: must be between {MIN_INTERVAL_SECS} and {MAX_INTERVAL_SECS} seconds")]
    InvalidInterval(u64),
}

/// Runtime control over registered collectors
pub trait CollectorControl: Send + Sync {
    /// Start a collector; enabling a running collector is a no-op
    fn enable_collector(&self, name: &str) -> Result<(), CollectorError>;

    /// Stop a collector; disabling a stopped collector is a no-op
    fn disable_collector(&self, name: &str) -> Result<(), CollectorError>;

    /// Change a collector's interval, restarting it if it was running
    fn update_interval(&self, name: &str, seconds: u64) -> Result<(), CollectorError>;

    fn status(&self, name: &str) -> Result<CollectorStatus, CollectorError>;

    fn all_status(&self) -> CollectorsStatusResponse;
}
