//! REST API and WebSocket server
//!
//! A thin read surface over the cache plus runtime collector control. Handlers never read the
//! bus; live updates reach clients through the WebSocket hub.
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check with bus, cache and hub summary
//! - `GET /api/v1/{system,array,disks,shares,docker,vm,ups,nut,gpu,network,...}` - Latest values
//! - `GET /api/v1/collectors/status` - All collectors
//! - `POST /api/v1/collectors/{name}/enable|disable` - Runtime control
//! - `PATCH /api/v1/collectors/{name}/interval` - Change a collector's interval
//! - `WS /api/v1/ws` - Real-time event stream

pub mod error;
pub mod routes;
pub mod state;
pub mod types;
pub mod websocket;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{CollectorActionResponse, HealthResponse, IntervalRequest};

use std::any::Any;
use std::net::SocketAddr;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde_json::json;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8043")
    pub bind_addr: SocketAddr,

    /// Enable CORS for dashboards served from elsewhere
    pub enable_cors: bool,
}

/// Build the router with all routes and layers
pub fn router(state: ApiState, enable_cors: bool) -> Router {
    use routes::{cache, collectors, health};

    let mut app = Router::new()
        .route("/api/v1/health", get(health::health_check))
        .route("/api/v1/system", get(cache::system))
        .route("/api/v1/array", get(cache::array))
        .route("/api/v1/array/parity-history", get(cache::parity_history))
        .route("/api/v1/disks", get(cache::disks))
        .route("/api/v1/shares", get(cache::shares))
        .route("/api/v1/docker", get(cache::containers))
        .route("/api/v1/vm", get(cache::vms))
        .route("/api/v1/ups", get(cache::ups))
        .route("/api/v1/nut", get(cache::nut))
        .route("/api/v1/gpu", get(cache::gpu))
        .route("/api/v1/network", get(cache::network))
        .route("/api/v1/network/services", get(cache::network_services))
        .route("/api/v1/hardware", get(cache::hardware))
        .route("/api/v1/registration", get(cache::registration))
        .route("/api/v1/notifications", get(cache::notifications))
        .route("/api/v1/unassigned", get(cache::unassigned))
        .route("/api/v1/zfs/pools", get(cache::zfs_pools))
        .route("/api/v1/zfs/datasets", get(cache::zfs_datasets))
        .route("/api/v1/zfs/snapshots", get(cache::zfs_snapshots))
        .route("/api/v1/zfs/arc", get(cache::zfs_arc_stats))
        .route("/api/v1/collectors/status", get(collectors::list_collectors))
        .route("/api/v1/collectors/:name", get(collectors::get_collector))
        .route(
            "/api/v1/collectors/:name/enable",
            post(collectors::enable_collector),
        )
        .route(
            "/api/v1/collectors/:name/disable",
            post(collectors::disable_collector),
        )
        .route(
            "/api/v1/collectors/:name/interval",
            patch(collectors::update_interval),
        )
        .route("/api/v1/ws", get(websocket::websocket_handler))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin);
        app = app.layer(cors);
    }

    app
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("request handler panicked: {detail}");

    let body = Json(json!({
        "success": false,
        "error": "internal server error",
    }));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

/// Spawn the API server
///
/// Binds immediately and serves in a background task until `cancel` fires. Returns the bound
/// address and the server task.
pub async fn spawn_api_server(
    config: ApiConfig,
    state: ApiState,
    cancel: CancellationToken,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(state, config.enable_cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    let task = tokio::spawn(async move {
        let shutdown = async move { cancel.cancelled().await };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("API server error: {}", e);
        }
    });

    Ok((addr, task))
}
