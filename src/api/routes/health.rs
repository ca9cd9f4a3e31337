//! Health check endpoint

use axum::{Json, extract::State};
use chrono::Utc;

use crate::api::{
    state::ApiState,
    types::{BusHealth, HealthResponse, WebSocketHealth},
};

/// GET /api/v1/health
///
/// Liveness plus a summary of the bus, cache and WebSocket hub
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let now = Utc::now();
    let registry = state.hub.registry();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: now.to_rfc3339(),
        uptime_seconds: (now - state.started_at).num_seconds(),
        cached: state
            .cache
            .populated_entries()
            .into_iter()
            .map(String::from)
            .collect(),
        bus: BusHealth {
            topics: state.bus.topic_count(),
            buffer_size: state.bus.buffer_size(),
        },
        websocket: WebSocketHealth::new(registry.stats(), !registry.is_closed()),
    })
}
