// Vendor API wire models
//
// Shapes of the token reply, the live-measurement query, and the
// per-channel readings returned by `measurements/live`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Token reply of `POST /api/v1/token`.
///
/// Every field is optional here so that a reply missing one of them is
/// reported as an authentication failure rather than a parse failure.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
}

/// A single item of the `measurements/live` query.
///
/// Without a `channelId` the backend returns every channel of the component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveMeasurementQuery {
    pub component_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

impl LiveMeasurementQuery {
    pub fn channel(component_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            channel_id: Some(channel_id.into()),
        }
    }

    pub fn component(component_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            channel_id: None,
        }
    }
}

/// The readings of one channel of one component.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelValues {
    pub component_id: String,
    pub channel_id: String,
    pub values: Vec<TimeValuePair>,
}

impl ChannelValues {
    /// The most recent value, if the backend reported one.
    pub fn current_value(&self) -> Option<&ReadingValue> {
        self.values.first().and_then(|v| v.value.as_ref())
    }

    /// The most recent reading, only when it carries a value.
    pub fn current(&self) -> Option<&TimeValuePair> {
        self.values.first().filter(|v| v.value.is_some())
    }
}

/// A single value paired with the time it was taken.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TimeValuePair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ReadingValue>,
    pub time: String,
}

/// A channel value: the backend reports either numbers or strings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Number(serde_json::Number),
    Text(String),
}

impl From<ReadingValue> for serde_json::Value {
    fn from(value: ReadingValue) -> Self {
        match value {
            ReadingValue::Number(n) => Self::Number(n),
            ReadingValue::Text(s) => Self::String(s),
        }
    }
}

impl From<i64> for ReadingValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for ReadingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn query_omits_missing_channel() {
        let items = vec![
            LiveMeasurementQuery::channel("IGULD:SELF", "Measurement.GridMs.TotW"),
            LiveMeasurementQuery::component("Plant:1"),
        ];
        assert_eq!(
            serde_json::to_value(&items).ok(),
            Some(json!([
                { "componentId": "IGULD:SELF", "channelId": "Measurement.GridMs.TotW" },
                { "componentId": "Plant:1" }
            ]))
        );
    }

    #[test]
    fn null_and_missing_values_count_as_no_value() {
        let readings: Vec<ChannelValues> = serde_json::from_value(json!([
            { "componentId": "a", "channelId": "x", "values": [{ "time": "t" }] },
            { "componentId": "a", "channelId": "y", "values": [{ "value": null, "time": "t" }] },
            { "componentId": "a", "channelId": "z", "values": [] },
            { "componentId": "a", "channelId": "w", "values": [{ "value": "on", "time": "t" }] }
        ]))
        .unwrap_or_default();

        let current: Vec<_> = readings.iter().map(ChannelValues::current_value).collect();
        assert_eq!(current, vec![None, None, None, Some(&ReadingValue::from("on"))]);
    }

    #[test]
    fn booleans_are_not_reading_values() {
        let parsed = serde_json::from_value::<TimeValuePair>(json!({ "value": true, "time": "t" }));
        assert!(parsed.is_err());
    }
}
