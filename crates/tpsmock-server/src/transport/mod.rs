//! Transport layer (inbound webhook traffic).
//!
//! Resolves a request path to an endpoint id through the live route table,
//! records the hit in the registry, then shapes the configured response.

pub mod hook;
pub mod routes;

pub use routes::RouteTable;
