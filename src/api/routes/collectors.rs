//! Collector control endpoints

use axum::{
    Json,
    extract::{Path, State},
};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{CollectorActionResponse, IntervalRequest},
};
use crate::models::{CollectorStatus, CollectorsStatusResponse};

/// GET /api/v1/collectors/status
pub async fn list_collectors(State(state): State<ApiState>) -> Json<CollectorsStatusResponse> {
    Json(state.collectors.all_status())
}

/// GET /api/v1/collectors/{name}
pub async fn get_collector(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<CollectorStatus>> {
    Ok(Json(state.collectors.status(&name)?))
}

/// POST /api/v1/collectors/{name}/enable
pub async fn enable_collector(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<CollectorActionResponse>> {
    state.collectors.enable_collector(&name)?;
    respond(&state, &name, format!("collector {name} enabled"))
}

/// POST /api/v1/collectors/{name}/disable
pub async fn disable_collector(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<Json<CollectorActionResponse>> {
    state.collectors.disable_collector(&name)?;
    respond(&state, &name, format!("collector {name} disabled"))
}

/// PATCH /api/v1/collectors/{name}/interval
pub async fn update_interval(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(request): Json<IntervalRequest>,
) -> ApiResult<Json<CollectorActionResponse>> {
    state.collectors.update_interval(&name, request.interval)?;
    respond(
        &state,
        &name,
        format!("collector {name} interval set to {}s", request.interval),
    )
}

fn respond(
    state: &ApiState,
    name: &str,
    message: String,
) -> ApiResult<Json<CollectorActionResponse>> {
    let collector = state
        .collectors
        .status(name)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(CollectorActionResponse {
        success: true,
        message,
        collector,
    }))
}
