//! Top-level facade crate for tpsmock.
//!
//! Re-exports the accounting core and the server library so users can depend on a single crate.

pub mod core {
    pub use tpsmock_core::*;
}

pub mod server {
    pub use tpsmock_server::*;
}
