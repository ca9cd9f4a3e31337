use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a managed collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Registered with an interval, not started yet
    Registered,
    Running,
    Stopped,
    /// Registered with interval 0
    Disabled,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Registered => "registered",
            RunState::Running => "running",
            RunState::Stopped => "stopped",
            RunState::Disabled => "disabled",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorStatus {
    pub name: String,
    pub enabled: bool,
    /// Seconds between runs, 0 while disabled
    pub interval_seconds: u64,
    pub status: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    pub error_count: u64,
    /// Required collectors cannot be disabled
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorsStatusResponse {
    pub collectors: Vec<CollectorStatus>,
    pub total: usize,
    pub enabled_count: usize,
    pub disabled_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Published on `collector_state_change` whenever a collector is enabled or disabled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorStateEvent {
    pub event: String,
    pub collector: String,
    pub enabled: bool,
    pub status: RunState,
    pub interval: u64,
    pub timestamp: DateTime<Utc>,
}
