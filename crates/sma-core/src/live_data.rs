// ── Live data ──
//
// Raw readings of whole components of the configured appliance. Shares
// the client cache with the bridge but keeps its own cooldown slot.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use sma_api::{ChannelValues, LiveMeasurementQuery, ReadingValue};

use crate::client_cache::{ClientCache, SessionFactory};
use crate::config::BackendTarget;
use crate::cooldown::CooldownCache;
use crate::error::CoreError;
use crate::query::ValidationError;

/// Parsed query string of the live-data endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveDataRequest {
    pub component_ids: Vec<String>,
    pub unique_channels_only: bool,
}

impl LiveDataRequest {
    /// Parse the raw `component_ids` (a JSON array of strings) and
    /// `unique_channels_only` parameters.
    ///
    /// The flag is set by any value other than empty, `0` or `false`.
    pub fn parse(
        component_ids: Option<&str>,
        unique_channels_only: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let raw = component_ids.ok_or_else(|| ValidationError::InvalidBody {
            reason: "component_ids is missing".into(),
        })?;
        let component_ids: Vec<String> =
            serde_json::from_str(raw).map_err(|e| ValidationError::InvalidBody {
                reason: format!("component_ids: {e}"),
            })?;
        if component_ids.is_empty() {
            return Err(ValidationError::InvalidBody {
                reason: "component_ids is empty".into(),
            });
        }

        let unique_channels_only = unique_channels_only
            .is_some_and(|flag| !matches!(flag.trim(), "" | "0" | "false"));

        Ok(Self {
            component_ids,
            unique_channels_only,
        })
    }
}

/// One reading with a value, as returned by the live-data endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveReading {
    pub component_id: String,
    pub channel_id: String,
    pub value: ReadingValue,
    pub time: String,
}

pub struct LiveData<F: SessionFactory> {
    clients: Arc<ClientCache<F>>,
    target: BackendTarget,
    cooldown: CooldownCache,
}

impl<F: SessionFactory> LiveData<F> {
    pub fn new(clients: Arc<ClientCache<F>>, target: BackendTarget, cooldown: CooldownCache) -> Self {
        Self {
            clients,
            target,
            cooldown,
        }
    }

    pub fn host(&self) -> &str {
        &self.target.host
    }

    /// Readings of the requested components; inside the cooldown window
    /// the previous readings are reused.
    pub async fn fetch(
        &self,
        request: &LiveDataRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<LiveReading>, CoreError> {
        let readings = if let Some(hit) = self.cooldown.lookup(now) {
            debug!(remaining = hit.remaining_secs, "serving cached live data");
            Arc::clone(&hit.result.readings)
        } else {
            let query: Vec<_> = request
                .component_ids
                .iter()
                .map(LiveMeasurementQuery::component)
                .collect();
            let readings = self
                .clients
                .fetch_live(&self.target.host, &self.target.credentials, &query)
                .await?;
            if readings.is_empty() {
                return Err(CoreError::EmptyResult);
            }
            info!(host = %self.target.host, readings = readings.len(), "fetched live data");
            Arc::clone(&self.cooldown.store(readings, now).readings)
        };

        Ok(flatten(&readings, request.unique_channels_only))
    }
}

fn flatten(readings: &[ChannelValues], unique_channels_only: bool) -> Vec<LiveReading> {
    let mut seen: Vec<&str> = Vec::new();
    readings
        .iter()
        .filter(|r| {
            if !unique_channels_only {
                return true;
            }
            if seen.contains(&r.channel_id.as_str()) {
                return false;
            }
            seen.push(&r.channel_id);
            true
        })
        .filter_map(|r| {
            let current = r.current()?;
            Some(LiveReading {
                component_id: r.component_id.clone(),
                channel_id: r.channel_id.clone(),
                value: current.value.clone()?,
                time: current.time.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::{FakeFactory, credentials, empty_reading, reading};

    fn t0() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    fn live_data(factory: FakeFactory) -> LiveData<FakeFactory> {
        LiveData::new(
            Arc::new(ClientCache::new(factory)),
            BackendTarget {
                host: "sma.local".into(),
                credentials: credentials(),
            },
            CooldownCache::new(Duration::from_secs(60)),
        )
    }

    fn request(unique: bool) -> LiveDataRequest {
        LiveDataRequest {
            component_ids: vec!["Plant:1".into()],
            unique_channels_only: unique,
        }
    }

    #[test]
    fn parses_query_parameters() {
        let parsed = LiveDataRequest::parse(Some(r#"["Plant:1","IGULD:SELF"]"#), Some("true"));
        assert_eq!(
            parsed,
            Ok(LiveDataRequest {
                component_ids: vec!["Plant:1".into(), "IGULD:SELF".into()],
                unique_channels_only: true,
            })
        );

        let parsed = LiveDataRequest::parse(Some(r#"["a"]"#), Some("false"));
        assert_eq!(parsed.map(|r| r.unique_channels_only), Ok(false));
    }

    #[test]
    fn rejects_missing_or_empty_component_ids() {
        for raw in [None, Some("[]"), Some("Plant:1"), Some("[1, 2]")] {
            assert!(
                LiveDataRequest::parse(raw, None).is_err(),
                "{raw:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn drops_readings_without_value_and_dedups_channels() {
        let factory = FakeFactory::ok(vec![
            reading("inv:1", "Power", 1),
            reading("inv:2", "Power", 2),
            empty_reading("inv:1", "Status"),
        ]);
        let live = live_data(factory);

        let all = live.fetch(&request(false), t0()).await.unwrap_or_default();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].component_id, "inv:2");
        assert_eq!(all[1].value, ReadingValue::from(2_i64));

        let unique = live.fetch(&request(true), t0()).await.unwrap_or_default();
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].component_id, "inv:1");
    }

    #[tokio::test]
    async fn reuses_readings_inside_cooldown() {
        let factory = FakeFactory::ok(vec![reading("inv:1", "Power", 1)]);
        let stats = factory.stats();
        let live = live_data(factory);

        assert!(live.fetch(&request(false), t0()).await.is_ok());
        assert!(
            live.fetch(&request(false), t0() + TimeDelta::seconds(30))
                .await
                .is_ok()
        );
        assert!(
            live.fetch(&request(false), t0() + TimeDelta::seconds(60))
                .await
                .is_ok()
        );
        assert_eq!(stats.fetches(), 2);
    }

    #[tokio::test]
    async fn empty_result_is_an_error() {
        let live = live_data(FakeFactory::ok(Vec::new()));
        let result = live.fetch(&request(false), t0()).await;
        assert!(matches!(result, Err(CoreError::EmptyResult)));
    }
}
