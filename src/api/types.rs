//! Request and response bodies of the REST surface
//!
//! Cache reads return the model types directly; the types here cover health output and
//! collector control.

use serde::{Deserialize, Serialize};

use crate::hub::HubStats;
use crate::models::CollectorStatus;

/// Body of `GET /api/v1/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub uptime_seconds: i64,

    /// Cache entries holding a value
    pub cached: Vec<String>,

    pub bus: BusHealth,
    pub websocket: WebSocketHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusHealth {
    /// Topics with at least one subscriber
    pub topics: usize,
    pub buffer_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSocketHealth {
    pub clients: usize,
    pub events_delivered: u64,
    pub clients_evicted: u64,
    pub accepting: bool,
}

impl WebSocketHealth {
    pub fn new(stats: HubStats, accepting: bool) -> Self {
        Self {
            clients: stats.connected,
            events_delivered: stats.delivered,
            clients_evicted: stats.evicted,
            accepting,
        }
    }
}

/// Body of `PATCH /api/v1/collectors/{name}/interval`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntervalRequest {
    pub interval: u64,
}

/// Result of a collector enable/disable/interval change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectorActionResponse {
    pub success: bool,
    pub message: String,
    pub collector: CollectorStatus,
}
