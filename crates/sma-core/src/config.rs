// ── Runtime bridge configuration ──
//
// These types describe *how* the pipeline behaves and which appliance
// the live-data endpoint talks to. They never touch disk: the config
// crate resolves them and hands them in.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Cooldown applied when none (or an invalid one) is configured.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// What to do with a query that arrives inside the cooldown window.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CooldownPolicy {
    /// Answer from the cached result, with status `cache`.
    #[default]
    ServeCache,
    /// Refuse the query with status `cooldown` (HTTP 429).
    Reject,
}

/// Username/password pair for the vendor login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Behaviour of a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Minimum interval between fresh backend fetches.
    pub cooldown: Duration,
    pub cooldown_policy: CooldownPolicy,
    /// Applied when a request does not say whether fallbacks warn.
    pub no_warning_on_fallback: bool,
    /// Log every parsed inbound request. The password stays redacted.
    pub log_requests: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            cooldown_policy: CooldownPolicy::default(),
            no_warning_on_fallback: false,
            log_requests: false,
        }
    }
}

/// The appliance queried by the live-data endpoint.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    pub host: String,
    pub credentials: Credentials,
}
