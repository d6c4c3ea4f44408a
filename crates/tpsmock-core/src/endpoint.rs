//! Endpoint data model: response config, partial updates, and the endpoint view.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MockError, Result};
use crate::rate::RateAccumulator;

/// Endpoints that ship with every server and can never be deleted or moved.
pub const PROTECTED_IDS: [&str; 3] = ["default", "fast", "slow"];

pub fn is_protected(id: &str) -> bool {
    PROTECTED_IDS.contains(&id)
}

/// Path for an endpoint created without one.
pub fn default_path(id: &str) -> String {
    format!("/w/{id}")
}

/// Trim and make sure the path starts with `/`.
pub fn normalize_path(path: &str) -> Result<String> {
    let p = path.trim();
    if p.is_empty() {
        return Err(MockError::InvalidConfig("path must not be empty".into()));
    }
    if p.chars().any(char::is_whitespace) {
        return Err(MockError::InvalidConfig(format!("path contains whitespace: {p:?}")));
    }
    if p.starts_with('/') {
        Ok(p.to_string())
    } else {
        Ok(format!("/{p}"))
    }
}

/// Response shape returned by one endpoint.
///
/// Field names on the wire match the YAML config file (`timeout` is in
/// milliseconds, `enable_logging` toggles request/response log events).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointConfig {
    pub status_code: u16,
    pub content_type: String,
    pub response_body: String,
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
    pub headers: HashMap<String, String>,
    #[serde(rename = "enable_logging")]
    pub logging_enabled: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            status_code: 200,
            content_type: "application/json".into(),
            response_body: r#"{"message": "Request received"}"#.into(),
            timeout_ms: 0,
            headers: HashMap::new(),
            logging_enabled: true,
        }
    }
}

impl EndpointConfig {
    pub fn validate(&self) -> Result<()> {
        if !(100..=599).contains(&self.status_code) {
            return Err(MockError::InvalidConfig(format!(
                "status_code must be between 100 and 599, got {}",
                self.status_code
            )));
        }
        if self.content_type.trim().is_empty() {
            return Err(MockError::InvalidConfig("content_type must not be empty".into()));
        }
        for (k, v) in &self.headers {
            if k.is_empty() || k.chars().any(|c| c.is_whitespace() || c.is_control() || c == ':') {
                return Err(MockError::InvalidConfig(format!("invalid header name: {k:?}")));
            }
            if v.contains(['\r', '\n']) {
                return Err(MockError::InvalidConfig(format!("invalid value for header {k}")));
            }
        }
        Ok(())
    }
}

/// Field-level update of an [`EndpointConfig`]. `None` means "leave as is",
/// so an explicit `0` or `false` is distinguishable from an omitted field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigPatch {
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub response_body: Option<String>,
    #[serde(rename = "timeout")]
    pub timeout_ms: Option<u64>,
    /// Merged key by key into the existing headers.
    pub headers: Option<HashMap<String, String>>,
    #[serde(rename = "enable_logging")]
    pub logging_enabled: Option<bool>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, cfg: &mut EndpointConfig) {
        if let Some(v) = self.status_code {
            cfg.status_code = v;
        }
        if let Some(v) = &self.content_type {
            cfg.content_type = v.clone();
        }
        if let Some(v) = &self.response_body {
            cfg.response_body = v.clone();
        }
        if let Some(v) = self.timeout_ms {
            cfg.timeout_ms = v;
        }
        if let Some(h) = &self.headers {
            cfg.headers
                .extend(h.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(v) = self.logging_enabled {
            cfg.logging_enabled = v;
        }
    }
}

/// Partial update of an endpoint (PATCH body).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointPatch {
    pub name: Option<String>,
    pub path: Option<String>,
    pub config: Option<ConfigPatch>,
}

/// Full replacement of an endpoint's config, with optional name/path change
/// (PUT body).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointReplace {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub config: EndpointConfig,
}

/// Endpoint definition with a caller-chosen id (startup config).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSeed {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub config: EndpointConfig,
}

/// Point-in-time view of a registered endpoint.
///
/// `accumulator` is the endpoint's own counter, shared with the registry; it
/// is never serialized. Use [`RateAccumulator::snapshot`] for its figures.
#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    pub id: String,
    pub name: String,
    pub path: String,
    pub config: EndpointConfig,
    #[serde(skip)]
    pub accumulator: Arc<RateAccumulator>,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "last_request", skip_serializing_if = "Option::is_none")]
    pub last_request_at: Option<DateTime<Utc>>,
}

/// Built-in endpoints used when no config file is present.
pub fn builtin_seeds() -> Vec<EndpointSeed> {
    vec![
        EndpointSeed {
            id: "default".into(),
            name: "Default Webhook".into(),
            path: Some("/webhook".into()),
            config: EndpointConfig::default(),
        },
        EndpointSeed {
            id: "fast".into(),
            name: "Fast Webhook".into(),
            path: Some("/webhook/fast".into()),
            config: EndpointConfig {
                response_body: r#"{"message": "Fast response", "delay": "0ms"}"#.into(),
                logging_enabled: false,
                ..Default::default()
            },
        },
        EndpointSeed {
            id: "slow".into(),
            name: "Slow Webhook".into(),
            path: Some("/webhook/slow".into()),
            config: EndpointConfig {
                response_body: r#"{"message": "Slow response", "delay": "2000ms"}"#.into(),
                timeout_ms: 2000,
                ..Default::default()
            },
        },
    ]
}

impl Endpoint {
    pub fn is_protected(&self) -> bool {
        is_protected(&self.id)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn normalize_prepends_separator() {
        assert_eq!(normalize_path("hooks/a").unwrap(), "/hooks/a");
        assert_eq!(normalize_path("/hooks/a").unwrap(), "/hooks/a");
        assert_eq!(normalize_path("  x ").unwrap(), "/x");
        assert!(normalize_path("   ").is_err());
        assert!(normalize_path("/a b").is_err());
    }

    #[test]
    fn patch_merges_headers() {
        let mut cfg = EndpointConfig::default();
        cfg.headers.insert("X-A".into(), "1".into());

        let patch = ConfigPatch {
            headers: Some(HashMap::from([("X-B".to_string(), "2".to_string())])),
            ..Default::default()
        };
        patch.apply_to(&mut cfg);

        assert_eq!(cfg.headers.len(), 2);
        assert_eq!(cfg.status_code, 200);
    }

    #[test]
    fn validate_rejects_bad_status() {
        let cfg = EndpointConfig {
            status_code: 42,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate().unwrap_err().client_code().as_str(),
            "INVALID_CONFIG"
        );
    }
}
