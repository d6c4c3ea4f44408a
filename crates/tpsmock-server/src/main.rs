//! tpsmock server
//!
//! - Webhook endpoints answer on their configured paths and on /w/{id}
//! - Per-endpoint TPS accounting, readable via /api/webhooks/{id}/metrics
//! - Config: config.yaml (or the first CLI argument), built-ins when absent

use std::net::SocketAddr;
use std::process::ExitCode;

use tpsmock_core::error::{MockError, Result};
use tpsmock_server::{app_state, config, obs, router};

#[tokio::main]
async fn main() -> ExitCode {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());

    match run(&path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The subscriber may not be up yet.
            eprintln!("tpsmock-server: {e}");
            tracing::error!(error = %e, "server exited with error");
            ExitCode::FAILURE
        }
    }
}

async fn run(path: &str) -> Result<()> {
    let (cfg, source) = config::load_or_builtin(path)?;
    obs::logging::init(&cfg.logging)?;

    match &source {
        config::ConfigSource::File(p) => tracing::info!(path = %p, "config loaded"),
        config::ConfigSource::Builtin { missing } => {
            tracing::warn!(path = %missing, "config file not found, using built-in endpoints")
        }
    }

    let listen: SocketAddr = cfg
        .server
        .listen_addr()
        .parse()
        .map_err(|e| MockError::InvalidConfig(format!("server.port: {e}")))?;
    let base_url = cfg.server.base_url();

    let state = app_state::AppState::new(cfg)?;
    for ep in state.sorted_endpoints() {
        tracing::info!(
            id = %ep.id,
            name = %ep.name,
            url = %format!("{base_url}{}", ep.path),
            delay_ms = ep.config.timeout_ms,
            "endpoint ready"
        );
    }
    tracing::info!(url = %format!("{base_url}/w/{{id}}"), "custom endpoints");
    tracing::info!(url = %format!("{base_url}/api/webhooks"), "management api");

    let app = router::build_router(state.clone());

    tracing::info!(%listen, "tpsmock-server starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MockError::Internal(format!("failed to bind {listen}: {e}")))?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| MockError::Internal(format!("server failed: {e}")))?;

    tracing::info!("tpsmock-server stopped");
    Ok(())
}

async fn shutdown_signal(state: app_state::AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    state.metrics().set_draining();
    tracing::info!("shutdown requested, draining");
}
