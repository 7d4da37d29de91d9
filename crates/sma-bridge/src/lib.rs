//! HTTP surface of the SMA Data Manager bridge.
//!
//! The library half of the `sma-bridge` binary: shared application
//! state and the axum router. Kept separate from `main.rs` so the
//! router can be driven in tests without binding a socket.

pub mod routes;
pub mod state;

pub use routes::{http_status, router};
pub use state::AppState;
