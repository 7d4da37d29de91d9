// sma-api: Async Rust client for the SMA Data Manager vendor REST API

pub mod auth;
pub mod client;
pub mod error;
pub mod measurements;
pub mod models;
pub mod transport;

pub use auth::{Session, SessionState};
pub use client::SessionClient;
pub use error::Error;
pub use models::{ChannelValues, LiveMeasurementQuery, ReadingValue, TimeValuePair};
pub use transport::{Scheme, TlsMode, TransportConfig};
