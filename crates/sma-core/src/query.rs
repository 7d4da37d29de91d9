// ── Inbound query model ──
//
// The bridge request body and its validation. A request names the
// appliance, the credentials, and an ordered list of channels to read,
// each optionally renamed (alias) and backed by a static fallback value.

use std::collections::HashSet;
use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use sma_api::{LiveMeasurementQuery, ReadingValue};

use crate::config::Credentials;

/// Why an inbound request was refused before any backend call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Body is not JSON of the expected shape, or the query list is empty.
    #[error("the request body was not valid")]
    InvalidBody { reason: String },

    /// Two query items name the same component and channel.
    #[error("query item {key} is duplicate")]
    DuplicateItem { key: ChannelKey },
}

/// Identity of a channel: component id plus channel id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub component: String,
    pub channel: String,
}

impl ChannelKey {
    pub fn new(component: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            channel: channel.into(),
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.component, self.channel)
    }
}

/// One requested channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryItem {
    pub component: String,
    pub channel: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub fallback: Option<ReadingValue>,
}

impl QueryItem {
    pub fn new(component: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            channel: channel.into(),
            alias: None,
            fallback: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<ReadingValue>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn key(&self) -> ChannelKey {
        ChannelKey::new(&self.component, &self.channel)
    }

    /// Whether this item asks for the given component/channel.
    pub fn matches(&self, component: &str, channel: &str) -> bool {
        self.component == component && self.channel == channel
    }

    pub fn to_live_query(&self) -> LiveMeasurementQuery {
        LiveMeasurementQuery::channel(&self.component, &self.channel)
    }
}

/// Body of `POST /bridge`.
#[derive(Debug, Deserialize)]
pub struct BridgeRequest {
    pub host: String,
    pub username: String,
    #[serde(deserialize_with = "secret_string")]
    pub password: SecretString,
    /// Suppress the warning emitted when a fallback replaces a missing
    /// value. Unset means the bridge-wide default.
    #[serde(default)]
    pub no_warning_on_fallback: Option<bool>,
    pub query: Vec<QueryItem>,
}

fn secret_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

impl BridgeRequest {
    /// Parse and validate a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let request: Self =
            serde_json::from_slice(body).map_err(|e| ValidationError::InvalidBody {
                reason: e.to_string(),
            })?;
        request.validate()?;
        Ok(request)
    }

    /// Check the invariants serde cannot express: a non-empty query
    /// and unique (component, channel) pairs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.query.is_empty() {
            return Err(ValidationError::InvalidBody {
                reason: "query is empty".into(),
            });
        }

        let mut seen = HashSet::with_capacity(self.query.len());
        for item in &self.query {
            let key = item.key();
            if seen.contains(&key) {
                return Err(ValidationError::DuplicateItem { key });
            }
            seen.insert(key);
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }

    /// The backend query for every requested channel, in request order.
    pub fn live_query(&self) -> Vec<LiveMeasurementQuery> {
        self.query.iter().map(QueryItem::to_live_query).collect()
    }
}
