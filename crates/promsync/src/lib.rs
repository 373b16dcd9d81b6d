//! Top-level facade crate for promsync.
//!
//! Re-exports the instrument registry and the bridge so users can depend on a single crate.

pub mod core {
    pub use promsync_core::*;
}

pub mod bridge {
    pub use promsync_bridge::*;
}
