//! tpsmock server library entry.
//!
//! Wires the endpoint registry from `tpsmock-core` to an axum HTTP stack:
//! webhook transport, management API, ops endpoints, config loading and
//! logging. Consumed by the binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod transport;
