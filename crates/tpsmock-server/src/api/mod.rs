//! Management API (JSON over HTTP).
//!
//! - `/api/webhooks[...]` : endpoint CRUD, per-endpoint metrics and reset
//! - `/api/summary`       : all endpoints with their current figures
//! - `/api/config`, `/api/request`, `/api/metrics`, `/api/reset`,
//!   `/api/requests`      : single-endpoint surface bound to `default`

pub mod endpoints;
pub mod error;
pub mod legacy;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::app_state::AppState;

pub use error::ApiError;

/// Prefix every endpoint path is kept out of.
pub const API_PREFIX: &str = "/api";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/webhooks",
            get(endpoints::list).post(endpoints::create),
        )
        .route("/api/webhooks/bulk", put(endpoints::bulk_update))
        .route(
            "/api/webhooks/:id",
            get(endpoints::get_one)
                .put(endpoints::replace)
                .patch(endpoints::patch)
                .delete(endpoints::delete),
        )
        .route("/api/webhooks/:id/metrics", get(endpoints::metrics))
        .route("/api/webhooks/:id/reset", post(endpoints::reset))
        .route("/api/summary", get(endpoints::summary))
        .route(
            "/api/config",
            get(legacy::get_config).post(legacy::set_config),
        )
        .route("/api/request", post(legacy::record))
        .route("/api/metrics", get(legacy::metrics))
        .route("/api/reset", post(legacy::reset))
        .route(
            "/api/requests",
            get(legacy::request_logs).delete(legacy::clear_request_logs),
        )
}
