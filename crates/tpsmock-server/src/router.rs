//! Axum router wiring.
//!
//! Ops and management routes are matched first; every other path falls
//! through to the webhook handler, which resolves it against the live route
//! table.

use axum::{routing::get, Router};

use crate::{api, app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .merge(api::routes())
        .fallback(transport::hook::handle_webhook)
        .with_state(state)
}
