//! Shared application state for the tpsmock server.
//!
//! One registry per process, built here from the loaded config and handed to
//! every handler by `Arc`. Startup errors are returned, not panicked.

use std::sync::Arc;

use tpsmock_core::endpoint::builtin_seeds;
use tpsmock_core::error::{MockError, Result};
use tpsmock_core::{Endpoint, Registry};

use crate::api::API_PREFIX;
use crate::config::ServerConfig;
use crate::obs::metrics::{EndpointGauge, ServerMetrics};
use crate::transport::RouteTable;

const FAIL_FAST_ON_BUILTIN_CLASH: bool = false; // if changed to true, boot fails.

/// Paths the webhook fallback must never shadow.
const RESERVED_PREFIXES: [&str; 4] = [API_PREFIX, "/healthz", "/readyz", "/metrics"];

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    registry: Registry,
    routes: Arc<RouteTable>,
    metrics: ServerMetrics,
}

impl AppState {
    /// Build application state.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        let routes = Arc::new(RouteTable::new());
        let registry = RESERVED_PREFIXES
            .iter()
            .fold(Registry::new().with_binder(routes.clone()), |r, p| r.reserve_prefix(p));

        // 1) Endpoints from config
        for (i, seed) in cfg.default_webhooks.iter().cloned().enumerate() {
            let id = seed.id.clone();
            registry.insert(seed).map_err(|e| {
                MockError::InvalidConfig(format!("default_webhooks[{i}] (id={id}): {e}"))
            })?;
        }

        // 2) Protected endpoints the config did not define
        for seed in builtin_seeds() {
            if registry.get(&seed.id).is_ok() {
                continue;
            }
            let id = seed.id.clone();
            if let Err(e) = registry.insert(seed) {
                tracing::warn!(id = %id, error = %e, "built-in endpoint not registered");
                if FAIL_FAST_ON_BUILTIN_CLASH {
                    return Err(MockError::InvalidConfig(format!(
                        "built-in endpoint {id} clashes with config: {e}"
                    )));
                }
            }
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                routes,
                metrics: ServerMetrics::default(),
            }),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn routes(&self) -> &RouteTable {
        &self.inner.routes
    }

    pub fn metrics(&self) -> &ServerMetrics {
        &self.inner.metrics
    }

    /// Endpoints ordered by creation time, then id.
    pub fn sorted_endpoints(&self) -> Vec<Endpoint> {
        let mut eps = self.registry().list();
        eps.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        eps
    }

    /// Per-endpoint accumulator figures for the `/metrics` scrape.
    pub fn endpoint_gauges(&self) -> Vec<EndpointGauge> {
        self.sorted_endpoints()
            .into_iter()
            .map(|ep| {
                let s = ep.accumulator.snapshot();
                EndpointGauge {
                    endpoint: ep.id,
                    total: s.total_events,
                    tps: s.rate,
                }
            })
            .collect()
    }
}
