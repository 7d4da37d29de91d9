//! Routes of the bridge service.
//!
//! `POST {endpoint}` answers bridge queries; `GET /api/live-data` exposes
//! raw readings of the configured appliance when one is configured.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use sma_config::LIVE_DATA_PATH;
use sma_core::{BridgeStatus, LiveDataRequest};

use crate::state::AppState;

type AppStateArc = Arc<AppState>;

/// Build the router for `state`.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new().route(&state.endpoint, post(bridge_query));
    if state.live_data.is_some() {
        app = app.route(LIVE_DATA_PATH, get(live_data));
    }
    app.with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

/// HTTP status for a bridge outcome. With `http_error_codes` off every
/// outcome is 200 and callers read `bridge_status` instead.
pub fn http_status(status: BridgeStatus, http_error_codes: bool) -> StatusCode {
    if !http_error_codes || status.is_success() {
        return StatusCode::OK;
    }
    match status {
        BridgeStatus::InvalidRequest | BridgeStatus::InvalidQuery => StatusCode::BAD_REQUEST,
        BridgeStatus::Cooldown => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ── Bridge endpoint ─────────────────────────────────────────────────

async fn bridge_query(State(state): State<AppStateArc>, body: Bytes) -> Response {
    let response = state.bridge.handle(&body, Utc::now()).await;
    debug!(status = %response.status, "bridge query answered");

    let code = http_status(response.status, state.http_error_codes);
    (code, Json(response)).into_response()
}

// ── Live data ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LiveDataParams {
    component_ids: Option<String>,
    unique_channels_only: Option<String>,
}

async fn live_data(
    State(state): State<AppStateArc>,
    Query(params): Query<LiveDataParams>,
) -> Response {
    let Some(live) = &state.live_data else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let request = match LiveDataRequest::parse(
        params.component_ids.as_deref(),
        params.unique_channels_only.as_deref(),
    ) {
        Ok(request) => request,
        Err(err) => {
            debug!(error = ?err, "rejected live-data request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match live.fetch(&request, Utc::now()).await {
        Ok(readings) => Json(readings).into_response(),
        Err(err) => {
            error!(host = live.host(), error = %err, "live-data query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_http_codes() {
        assert_eq!(http_status(BridgeStatus::Live, true), StatusCode::OK);
        assert_eq!(
            http_status(BridgeStatus::CacheWithWarnings, true),
            StatusCode::OK
        );
        assert_eq!(
            http_status(BridgeStatus::InvalidQuery, true),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            http_status(BridgeStatus::Cooldown, true),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            http_status(BridgeStatus::NoResults, true),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn every_success_status_is_200() {
        for status in [
            BridgeStatus::Ok,
            BridgeStatus::OkWithWarnings,
            BridgeStatus::Live,
            BridgeStatus::LiveWithWarnings,
            BridgeStatus::Cache,
            BridgeStatus::CacheWithWarnings,
        ] {
            assert_eq!(http_status(status, true), StatusCode::OK, "{status}");
        }
        assert_eq!(
            http_status(BridgeStatus::RequestFailed, true),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            http_status(BridgeStatus::InvalidRequest, true),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn error_codes_can_be_disabled() {
        assert_eq!(http_status(BridgeStatus::Cooldown, false), StatusCode::OK);
        assert_eq!(http_status(BridgeStatus::RequestFailed, false), StatusCode::OK);
    }
}
