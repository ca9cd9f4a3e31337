//! API shared state

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::CacheStore;
use crate::collectors::CollectorControl;
use crate::events::AgentBus;
use crate::hub::WsHub;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Latest collected values, read by every GET handler
    pub cache: Arc<CacheStore>,

    /// Hub new WebSocket clients register with
    pub hub: WsHub,

    /// Runtime collector control
    pub collectors: Arc<dyn CollectorControl>,

    /// Bus, for health introspection only
    pub bus: Arc<AgentBus>,

    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(
        cache: Arc<CacheStore>,
        hub: WsHub,
        collectors: Arc<dyn CollectorControl>,
        bus: Arc<AgentBus>,
    ) -> Self {
        Self {
            cache,
            hub,
            collectors,
            bus,
            started_at: Utc::now(),
        }
    }
}
