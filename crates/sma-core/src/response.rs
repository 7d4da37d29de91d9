// ── Bridge response ──
//
// The flat JSON object returned to the caller: one key per emitted
// value plus the two reserved status keys.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use strum::{Display, IntoStaticStr};

use crate::shaper::Shaped;

/// Reserved key carrying the [`BridgeStatus`].
pub const STATUS_KEY: &str = "bridge_status";
/// Reserved key carrying the diagnostic message.
pub const MESSAGE_KEY: &str = "bridge_status_message";

/// Keys a data alias may never claim.
pub const RESERVED_KEYS: [&str; 2] = [STATUS_KEY, MESSAGE_KEY];

/// Aggregated outcome of one bridge query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
pub enum BridgeStatus {
    #[strum(serialize = "ok")]
    Ok,
    #[strum(serialize = "ok with warnings")]
    OkWithWarnings,
    #[strum(serialize = "live")]
    Live,
    #[strum(serialize = "live with warnings")]
    LiveWithWarnings,
    #[strum(serialize = "cache")]
    Cache,
    #[strum(serialize = "cache with warnings")]
    CacheWithWarnings,
    #[strum(serialize = "invalid request")]
    InvalidRequest,
    #[strum(serialize = "invalid query")]
    InvalidQuery,
    #[strum(serialize = "cooldown")]
    Cooldown,
    #[strum(serialize = "request failed")]
    RequestFailed,
    #[strum(serialize = "no results")]
    NoResults,
}

impl BridgeStatus {
    /// The "with warnings" form of a success status; other statuses are unchanged.
    pub fn with_warnings(self) -> Self {
        match self {
            Self::Ok => Self::OkWithWarnings,
            Self::Live => Self::LiveWithWarnings,
            Self::Cache => Self::CacheWithWarnings,
            other => other,
        }
    }

    /// Whether values were delivered (possibly with warnings).
    pub fn is_success(self) -> bool {
        matches!(
            self,
            Self::Ok
                | Self::OkWithWarnings
                | Self::Live
                | Self::LiveWithWarnings
                | Self::Cache
                | Self::CacheWithWarnings
        )
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Values keyed by alias, plus status and message.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeResponse {
    pub status: BridgeStatus,
    pub message: String,
    pub values: IndexMap<String, serde_json::Value>,
}

impl BridgeResponse {
    /// A response without values.
    pub fn failure(status: BridgeStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            values: IndexMap::new(),
        }
    }

    /// A successful response built from shaped values.
    ///
    /// `status` is the warning-free status; it is upgraded to its
    /// "with warnings" form when shaping produced any. `notice` leads
    /// the message, followed by every warning in encounter order.
    pub fn shaped(status: BridgeStatus, notice: Option<String>, shaped: Shaped) -> Self {
        let status = if shaped.has_warnings() {
            status.with_warnings()
        } else {
            status
        };

        let message = notice
            .into_iter()
            .chain(shaped.warnings.iter().map(ToString::to_string))
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            status,
            message,
            values: shaped.values,
        }
    }

    pub fn value(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }
}

impl Serialize for BridgeResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 2))?;
        for (key, value) in &self.values {
            // Shaping never emits reserved keys; skip them all the same.
            if !RESERVED_KEYS.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry(STATUS_KEY, self.status.as_str())?;
        map.serialize_entry(MESSAGE_KEY, &self.message)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn statuses_render_as_words() {
        assert_eq!(BridgeStatus::OkWithWarnings.to_string(), "ok with warnings");
        assert_eq!(BridgeStatus::Cache.with_warnings().as_str(), "cache with warnings");
        assert_eq!(BridgeStatus::Cooldown.with_warnings(), BridgeStatus::Cooldown);
        assert!(!BridgeStatus::NoResults.is_success());
        assert!(BridgeStatus::LiveWithWarnings.is_success());
    }

    #[test]
    fn failure_serializes_to_status_keys_only() {
        let response = BridgeResponse::failure(BridgeStatus::RequestFailed, "request failed: login failed");
        assert_eq!(
            serde_json::to_value(&response).ok(),
            Some(json!({
                "bridge_status": "request failed",
                "bridge_status_message": "request failed: login failed"
            }))
        );
    }

    #[test]
    fn reserved_keys_cannot_be_overwritten_by_values() {
        let mut values = IndexMap::new();
        values.insert(STATUS_KEY.to_owned(), json!("hijacked"));
        values.insert("power".to_owned(), json!(42));
        let response = BridgeResponse {
            status: BridgeStatus::Ok,
            message: String::new(),
            values,
        };

        assert_eq!(
            serde_json::to_value(&response).ok(),
            Some(json!({ "power": 42, "bridge_status": "ok", "bridge_status_message": "" }))
        );
    }
}
