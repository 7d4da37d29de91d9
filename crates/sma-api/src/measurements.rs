// Live measurement endpoint
//
// `POST /api/v1/measurements/live` takes a JSON array of query items and
// returns one `ChannelValues` per matching channel.

use tracing::debug;

use crate::client::{SessionClient, preview};
use crate::error::Error;
use crate::models::{ChannelValues, LiveMeasurementQuery};

impl SessionClient {
    /// Fetch the current readings for the given components/channels.
    ///
    /// Requires an established session. A 401 reply means the session went
    /// stale and is reported as `Authentication`; a body that is not an array
    /// of channel readings is a `Protocol` error.
    pub async fn fetch_live_measurements(
        &self,
        query: &[LiveMeasurementQuery],
    ) -> Result<Vec<ChannelValues>, Error> {
        let session = self.require_session()?;
        let url = self.endpoint("measurements/live")?;

        debug!(%url, items = query.len(), "querying live measurements");

        let resp = self
            .http()
            .post(url)
            .headers(self.auth_headers(&session)?)
            .json(query)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "session expired or was revoked".into(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: preview(&body).to_owned(),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let readings: Vec<ChannelValues> = serde_json::from_str(&body).map_err(|e| {
            let shown = preview(&body);
            Error::Protocol {
                message: format!("{e} (body preview: {shown:?})"),
                body: body.clone(),
            }
        })?;

        debug!(channels = readings.len(), "live measurements received");
        Ok(readings)
    }
}
