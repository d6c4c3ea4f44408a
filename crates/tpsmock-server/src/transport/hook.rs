//! Webhook handler: the router fallback for every non-management path.
//!
//! Order per request:
//! 1. resolve path -> endpoint id (route table)
//! 2. `record_and_respond` (counts the hit, returns the config)
//! 3. optional request log event
//! 4. configured delay (no lock held)
//! 5. status + headers + content type + body, verbatim

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tokio::time::Instant;

use tpsmock_core::{EndpointConfig, MockError};

use crate::api::ApiError;
use crate::app_state::AppState;

/// Largest request body read for the "request received" event.
pub const LOGGED_BODY_LIMIT: usize = 2 * 1024 * 1024;

pub async fn handle_webhook(
    State(app): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    req: Request,
) -> Response {
    let started = Instant::now();
    let path = req.uri().path().to_string();

    let Some(id) = app.routes().resolve(&path) else {
        app.metrics().webhook_not_found.inc(&[]);
        return not_found();
    };

    let config = match app.registry().record_and_respond(&id) {
        Ok(c) => c,
        Err(MockError::NotFound(_)) => {
            app.metrics().webhook_not_found.inc(&[]);
            return not_found();
        }
        Err(e) => return ApiError::from(e).into_response(),
    };

    if config.logging_enabled {
        log_request(&id, &path, peer.map(|c| c.0), req).await;
    }

    // Dropped with the future if the client goes away mid-delay.
    let in_flight = app.metrics().in_flight.track(&[("endpoint", id.as_str())]);
    if config.timeout_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.timeout_ms)).await;
    }
    drop(in_flight);

    let response = build_response(&id, &config);

    let status = config.status_code.to_string();
    app.metrics()
        .webhook_requests
        .inc(&[("endpoint", id.as_str()), ("status", status.as_str())]);
    app.metrics()
        .response_duration
        .observe(&[("endpoint", id.as_str())], started.elapsed());

    if config.logging_enabled {
        tracing::info!(
            webhook_id = %id,
            response_status = config.status_code,
            response_headers = ?sorted_headers(&config),
            response_body = %config.response_body,
            processing_time = ?started.elapsed(),
            "response sent"
        );
    }

    response
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Webhook not found" })),
    )
        .into_response()
}

fn build_response(id: &str, config: &Arc<EndpointConfig>) -> Response {
    let status = StatusCode::from_u16(config.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut resp = (status, Body::from(config.response_body.clone())).into_response();

    let headers = resp.headers_mut();
    for (k, v) in &config.headers {
        match (HeaderName::try_from(k.as_str()), HeaderValue::try_from(v.as_str())) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(webhook_id = %id, header = %k, "skipping unencodable response header"),
        }
    }
    match HeaderValue::try_from(config.content_type.as_str()) {
        Ok(ct) => {
            headers.insert(header::CONTENT_TYPE, ct);
        }
        Err(_) => tracing::warn!(webhook_id = %id, content_type = %config.content_type, "skipping unencodable content type"),
    }
    resp
}

/// Emit the "request received" event. Reads the body, so call it last.
async fn log_request(id: &str, path: &str, peer: Option<SocketAddr>, req: Request) {
    let (parts, body) = req.into_parts();
    let ip = client_ip(&parts.headers, peer);
    let user_agent = header_str(&parts.headers, header::USER_AGENT.as_str());
    let request_headers: BTreeMap<String, String> = parts
        .headers
        .iter()
        .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();

    let body = match to_bytes(body, LOGGED_BODY_LIMIT).await {
        Ok(b) => String::from_utf8_lossy(&b).into_owned(),
        Err(e) => {
            tracing::warn!(
                webhook_id = %id,
                error = %e,
                limit_bytes = LOGGED_BODY_LIMIT,
                "request body unreadable or over limit, not logged"
            );
            String::new()
        }
    };

    tracing::info!(
        webhook_id = %id,
        method = %parts.method,
        path = %path,
        query_params = %parts.uri.query().unwrap_or(""),
        ip = %ip,
        user_agent = %user_agent,
        request_headers = ?request_headers,
        request_body = %body,
        content_length = body.len(),
        "request received"
    );
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = header_str(headers, "x-forwarded-for");
    if let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty()) {
        return first.to_string();
    }
    let real = header_str(headers, "x-real-ip");
    if !real.is_empty() {
        return real;
    }
    peer.map(|p| p.ip().to_string()).unwrap_or_default()
}

fn header_str(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn sorted_headers(config: &EndpointConfig) -> BTreeMap<&str, &str> {
    let mut out: BTreeMap<&str, &str> = config
        .headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    out.insert("Content-Type", config.content_type.as_str());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ip_prefers_forwarded() {
        let mut h = HeaderMap::new();
        let peer: SocketAddr = ([10, 0, 0, 9], 4000).into();
        assert_eq!(client_ip(&h, Some(peer)), "10.0.0.9");

        h.insert("x-real-ip", HeaderValue::from_static("192.0.2.7"));
        assert_eq!(client_ip(&h, Some(peer)), "192.0.2.7");

        h.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.1, 10.0.0.1"));
        assert_eq!(client_ip(&h, Some(peer)), "203.0.113.1");
    }
}
