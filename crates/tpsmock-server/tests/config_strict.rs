#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use tpsmock_server::app_state::AppState;
use tpsmock_server::config::{self, ConfigSource, LogFormat};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
server:
  port: 9090
default_webhooks:
  - id: "orders"
    name: "Orders"
    config: { status_kode: 201 } # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "INVALID_CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("{}").expect("must parse");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.server.host, "localhost");
    assert_eq!(cfg.logging.log_level, "info");
    assert_eq!(cfg.logging.log_format, LogFormat::Text);
    assert!(cfg.default_webhooks.is_empty());
}

#[test]
fn full_config() {
    let ok = r#"
server:
  port: 9090
  host: "mock.local"
logging:
  log_file: null
  log_level: debug
  log_format: json
default_webhooks:
  - id: "orders"
    name: "Orders"
    path: "hooks/orders"
    config:
      status_code: 202
      timeout: 50
      headers:
        X-Mock: "1"
      enable_logging: false
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.server.listen_addr(), "0.0.0.0:9090");
    assert_eq!(cfg.server.base_url(), "http://mock.local:9090");
    assert!(cfg.logging.log_file.is_none());
    assert_eq!(cfg.logging.log_format, LogFormat::Json);

    let w = &cfg.default_webhooks[0];
    assert_eq!(w.config.status_code, 202);
    assert_eq!(w.config.timeout_ms, 50);
    assert!(!w.config.logging_enabled);
    // Unset fields take endpoint defaults.
    assert_eq!(w.config.content_type, "application/json");
}

#[test]
fn bad_values_fail_validation() {
    for bad in [
        "server: { port: 0 }",
        "logging: { log_level: loud }",
        "default_webhooks: [ {id: a, name: A}, {id: a, name: B} ]",
        "default_webhooks: [ {id: a, name: A, config: { timeout: -5 }} ]",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.client_code().as_str(), "INVALID_CONFIG", "input={bad}");
    }
}

#[test]
fn missing_file_falls_back_to_builtins() {
    let (cfg, source) = config::load_or_builtin("/nonexistent/tpsmock/config.yaml").unwrap();
    assert!(matches!(source, ConfigSource::Builtin { .. }));

    let mut ids: Vec<&str> = cfg.default_webhooks.iter().map(|w| w.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["default", "fast", "slow"]);
}

#[test]
fn file_config_keeps_protected_builtins() {
    let cfg = config::load_from_str(
        r#"
default_webhooks:
  - id: "orders"
    name: "Orders"
    path: "/orders"
"#,
    )
    .unwrap();
    let state = AppState::new(cfg).unwrap();

    assert_eq!(state.registry().len(), 4);
    assert_eq!(state.registry().get("orders").unwrap().path, "/orders");
    assert_eq!(state.registry().get("slow").unwrap().config.timeout_ms, 2000);
    assert_eq!(state.routes().resolve("/webhook/fast").as_deref(), Some("fast"));
}

#[test]
fn config_path_on_api_prefix_is_rejected() {
    let cfg = config::load_from_str(
        r#"
default_webhooks:
  - id: "bad"
    name: "Bad"
    path: "/api/webhooks"
"#,
    )
    .unwrap();
    let err = AppState::new(cfg).err().expect("must fail");
    assert_eq!(err.client_code().as_str(), "INVALID_CONFIG");
}
