//! Configuration for the SMA Data Manager bridge.
//!
//! Layered loading (built-in defaults, TOML file, `SMA_BRIDGE_*`
//! environment) and translation into the runtime types of `sma_core`
//! and `sma_api`. The binary layers its CLI flags on top.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

use sma_api::{Scheme, TlsMode, TransportConfig};
use sma_core::{BackendTarget, BridgeOptions, CooldownPolicy, Credentials, DEFAULT_COOLDOWN};

/// Prefix of every environment variable read by [`load`].
pub const ENV_PREFIX: &str = "SMA_BRIDGE_";

/// Path of the built-in live-data endpoint; the bridge endpoint may not shadow it.
pub const LIVE_DATA_PATH: &str = "/api/live-data";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Settings ────────────────────────────────────────────────────────

/// Everything the bridge process can be configured with.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeSettings {
    /// Address the HTTP server binds to.
    pub listen: SocketAddr,

    /// Path of the bridge endpoint.
    pub endpoint: String,

    /// Minimum seconds between fresh backend fetches. Anything that is not
    /// a positive finite number falls back to the default.
    #[serde(deserialize_with = "lenient_seconds")]
    pub cooldown_secs: Option<f64>,

    pub cooldown_policy: CooldownPolicy,

    /// Map statuses to HTTP error codes; when off, every response is 200.
    pub http_error_codes: bool,

    /// Log every inbound bridge request body (password redacted).
    pub log_requests: bool,

    /// Default for requests that do not set `no_warning_on_fallback`.
    pub no_warning_on_fallback: bool,

    pub use_ssl: bool,
    pub verify_ssl: bool,

    /// PEM file trusted in addition to the system store when verifying.
    pub ca_cert: Option<PathBuf>,

    pub timeout_secs: u64,

    /// Appliance served by the live-data endpoint.
    pub backend: Option<BackendSettings>,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            endpoint: "/bridge".into(),
            cooldown_secs: Some(DEFAULT_COOLDOWN.as_secs_f64()),
            cooldown_policy: CooldownPolicy::default(),
            http_error_codes: true,
            log_requests: false,
            no_warning_on_fallback: false,
            use_ssl: true,
            verify_ssl: false,
            ca_cert: None,
            timeout_secs: 30,
            backend: None,
        }
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct BackendSettings {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Accept numbers and numeric strings; anything else becomes `None`.
fn lenient_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Some(n),
        Raw::Text(s) => s.trim().parse().ok(),
        Raw::Other(_) => None,
    })
}

impl BridgeSettings {
    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint.starts_with('/') {
            return Err(invalid(
                "endpoint",
                format!("must start with '/', got '{}'", self.endpoint),
            ));
        }
        if self.endpoint == LIVE_DATA_PATH {
            return Err(invalid("endpoint", format!("{LIVE_DATA_PATH} is reserved")));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be greater than zero"));
        }
        if let Some(ca) = &self.ca_cert {
            if !ca.is_file() {
                return Err(invalid("ca_cert", format!("{} is not a file", ca.display())));
            }
        }
        if let Some(backend) = &self.backend {
            if backend.host.trim().is_empty() {
                return Err(invalid("backend.host", "must not be empty"));
            }
            if backend.username.is_empty() {
                return Err(invalid("backend.username", "must not be empty"));
            }
        }
        Ok(())
    }

    /// The effective cooldown. Invalid values reset to the default.
    pub fn cooldown(&self) -> Duration {
        match self
            .cooldown_secs
            .filter(|secs| *secs > 0.0)
            .map(Duration::try_from_secs_f64)
        {
            Some(Ok(cooldown)) => cooldown,
            _ => {
                warn!(
                    value = ?self.cooldown_secs,
                    default = DEFAULT_COOLDOWN.as_secs(),
                    "invalid cooldown, using the default"
                );
                DEFAULT_COOLDOWN
            }
        }
    }

    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions {
            cooldown: self.cooldown(),
            cooldown_policy: self.cooldown_policy,
            no_warning_on_fallback: self.no_warning_on_fallback,
            log_requests: self.log_requests,
        }
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = match (&self.ca_cert, self.verify_ssl) {
            (_, false) => TlsMode::DangerAcceptInvalid,
            (Some(ca), true) => TlsMode::CustomCa(ca.clone()),
            (None, true) => TlsMode::System,
        };

        TransportConfig {
            tls,
            timeout: Duration::from_secs(self.timeout_secs),
            scheme: if self.use_ssl {
                Scheme::Https
            } else {
                Scheme::Http
            },
        }
    }

    /// Target of the live-data endpoint, if one is configured.
    pub fn backend_target(&self) -> Option<BackendTarget> {
        self.backend.as_ref().map(|b| BackendTarget {
            host: b.host.clone(),
            credentials: Credentials {
                username: b.username.clone(),
                password: SecretString::from(b.password.clone()),
            },
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the default config file path via platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "sma-bridge").map_or_else(
        || PathBuf::from("sma-bridge").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// The layered provider chain: defaults, then `file`, then environment.
///
/// Nested keys use a double underscore: `SMA_BRIDGE_BACKEND__HOST`.
pub fn figment(file: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BridgeSettings::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load and validate settings.
///
/// An explicit `path` must exist; the default location is optional.
pub fn load(path: Option<&Path>) -> Result<BridgeSettings, ConfigError> {
    let file = match path {
        Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => path.to_path_buf(),
        None => config_path(),
    };

    let settings: BridgeSettings = figment(&file).extract()?;
    settings.validate()?;
    Ok(settings)
}
