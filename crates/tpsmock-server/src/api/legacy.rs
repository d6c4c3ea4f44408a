//! Single-endpoint API kept for older clients; every call targets `default`.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use tpsmock_core::{EndpointConfig, EndpointReplace, RateSnapshot};

use super::error::ApiResult;
use crate::app_state::AppState;

const LEGACY_ID: &str = "default";

pub async fn get_config(State(app): State<AppState>) -> ApiResult<Json<EndpointConfig>> {
    Ok(Json(app.registry().get(LEGACY_ID)?.config))
}

pub async fn set_config(
    State(app): State<AppState>,
    payload: Result<Json<EndpointConfig>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(config) = payload?;
    app.registry().replace(
        LEGACY_ID,
        EndpointReplace {
            name: None,
            path: None,
            config,
        },
    )?;
    Ok(Json(json!({ "message": "Configuration updated" })))
}

/// Count one event against `default` without shaping a webhook response.
pub async fn record(State(app): State<AppState>) -> ApiResult<impl IntoResponse> {
    app.registry().record_and_respond(LEGACY_ID)?;
    Ok(Json(json!({
        "message": "Request recorded",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })))
}

pub async fn metrics(State(app): State<AppState>) -> ApiResult<Json<RateSnapshot>> {
    Ok(Json(app.registry().snapshot(LEGACY_ID)?))
}

pub async fn reset(State(app): State<AppState>) -> ApiResult<impl IntoResponse> {
    app.registry().reset(LEGACY_ID)?;
    Ok(Json(json!({ "message": "Metrics reset" })))
}

pub async fn request_logs() -> impl IntoResponse {
    Json(json!({
        "message": "Request logging disabled - check console for logs",
        "logs": [],
    }))
}

pub async fn clear_request_logs() -> impl IntoResponse {
    Json(json!({ "message": "Request logging disabled - no logs to clear" }))
}
