// sma-core: Query pipeline between sma-api and the HTTP bridge.

pub mod bridge;
pub mod client_cache;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod live_data;
pub mod query;
pub mod response;
pub mod shaper;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::Bridge;
pub use client_cache::{ApiSessionFactory, ClientCache, LiveSession, SessionFactory};
pub use config::{BackendTarget, BridgeOptions, CooldownPolicy, Credentials, DEFAULT_COOLDOWN};
pub use cooldown::{CachedResult, CooldownCache, CooldownCheck, CooldownHit};
pub use error::CoreError;
pub use live_data::{LiveData, LiveDataRequest, LiveReading};
pub use query::{BridgeRequest, ChannelKey, QueryItem, ValidationError};
pub use response::{BridgeResponse, BridgeStatus, MESSAGE_KEY, STATUS_KEY};
pub use shaper::{Shaped, ShapeWarning, shape};
