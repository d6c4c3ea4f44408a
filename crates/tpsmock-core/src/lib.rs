//! tpsmock core: throughput accounting and the endpoint registry.
//!
//! This crate holds the only shared mutable state of the mock server: one
//! [`RateAccumulator`] per virtual endpoint and the [`Registry`] that maps
//! endpoint ids to their config and counter. It carries no transport or
//! runtime dependencies; the HTTP side lives in `tpsmock-server`.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Every fallible path surfaces as `MockError`/`Result`, and every mutating
//! operation either applies fully or leaves state untouched.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod endpoint;
pub mod error;
pub mod rate;
pub mod registry;

/// Shared result type.
pub use error::{Result, MockError};
pub use endpoint::{ConfigPatch, Endpoint, EndpointConfig, EndpointPatch, EndpointReplace, EndpointSeed};
pub use rate::{RateAccumulator, RateSnapshot};
pub use registry::{Registry, RouteBinder};
