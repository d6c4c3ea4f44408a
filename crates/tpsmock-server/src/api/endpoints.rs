use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use tpsmock_core::endpoint::is_protected;
use tpsmock_core::{
    Endpoint, EndpointConfig, EndpointPatch, EndpointReplace, MockError, RateSnapshot,
};

use super::error::{ApiError, ApiResult};
use crate::app_state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReq {
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub config: EndpointConfig,
}

pub async fn list(State(app): State<AppState>) -> Json<Vec<Endpoint>> {
    Json(app.sorted_endpoints())
}

pub async fn create(
    State(app): State<AppState>,
    payload: Result<Json<CreateReq>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let ep = app
        .registry()
        .create(&req.name, req.path.as_deref(), req.config)?;
    Ok((StatusCode::CREATED, Json(ep)))
}

pub async fn get_one(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Endpoint>> {
    Ok(Json(app.registry().get(&id)?))
}

/// PUT: whole config replaced; `name`/`path` changed when present.
pub async fn replace(
    State(app): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EndpointReplace>, JsonRejection>,
) -> ApiResult<Json<Endpoint>> {
    let Json(req) = payload?;
    Ok(Json(app.registry().replace(&id, req)?))
}

/// PATCH: only the fields present in the body change.
pub async fn patch(
    State(app): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EndpointPatch>, JsonRejection>,
) -> ApiResult<Json<Endpoint>> {
    let Json(req) = payload?;
    Ok(Json(app.registry().update(&id, req)?))
}

pub async fn delete(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if app.registry().delete(&id) {
        app.metrics().forget_endpoint(&id);
        return Ok(Json(json!({ "message": "Webhook deleted" })));
    }
    if is_protected(&id) {
        return Err(ApiError(MockError::Protected(id)));
    }
    Err(ApiError(MockError::NotFound(id)))
}

pub async fn metrics(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RateSnapshot>> {
    Ok(Json(app.registry().snapshot(&id)?))
}

pub async fn reset(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    app.registry().reset(&id)?;
    tracing::info!(webhook_id = %id, "metrics reset");
    Ok(Json(json!({ "message": "Metrics reset" })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkItem {
    #[serde(default)]
    pub name: Option<String>,
    /// Replaces the whole config when present.
    #[serde(default)]
    pub config: Option<EndpointConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkReq {
    pub updates: HashMap<String, BulkItem>,
}

#[derive(Debug, Serialize)]
pub struct BulkResp {
    pub message: &'static str,
    pub updated: BTreeMap<String, Endpoint>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub failed: BTreeMap<String, String>,
}

/// Each id is applied on its own; one failure does not roll back the others.
pub async fn bulk_update(
    State(app): State<AppState>,
    payload: Result<Json<BulkReq>, JsonRejection>,
) -> ApiResult<Json<BulkResp>> {
    let Json(req) = payload?;
    if req.updates.is_empty() {
        return Err(ApiError(MockError::InvalidConfig("No updates provided".into())));
    }

    let mut updated = BTreeMap::new();
    let mut failed = BTreeMap::new();
    for (id, item) in req.updates {
        let res = match item.config {
            Some(config) => app.registry().replace(
                &id,
                EndpointReplace {
                    name: item.name,
                    path: None,
                    config,
                },
            ),
            None => app.registry().update(
                &id,
                EndpointPatch {
                    name: item.name,
                    ..Default::default()
                },
            ),
        };
        match res {
            Ok(ep) => {
                updated.insert(id, ep);
            }
            Err(e) => {
                failed.insert(id, e.to_string());
            }
        }
    }

    Ok(Json(BulkResp {
        message: "Bulk update completed",
        updated,
        failed,
    }))
}

#[derive(Debug, Serialize)]
pub struct SummaryEntry {
    pub name: String,
    pub path: String,
    pub delay_ms: u64,
    pub total_requests: u64,
    pub tps: f64,
    pub duration_seconds: f64,
}

pub async fn summary(State(app): State<AppState>) -> impl IntoResponse {
    let summary: BTreeMap<String, SummaryEntry> = app
        .registry()
        .list()
        .into_iter()
        .map(|ep| {
            let s = ep.accumulator.snapshot();
            let entry = SummaryEntry {
                name: ep.name,
                path: ep.path,
                delay_ms: ep.config.timeout_ms,
                total_requests: s.total_events,
                tps: s.rate,
                duration_seconds: s.window_seconds,
            };
            (ep.id, entry)
        })
        .collect();

    Json(json!({
        "summary": summary,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}
