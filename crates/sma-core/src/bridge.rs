// ── Bridge orchestrator ──
//
// Runs one inbound query through the pipeline: validation, cooldown
// gate, fetch through the client cache, and shaping. Every outcome,
// failures included, ends up as a `BridgeResponse`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::client_cache::{ClientCache, SessionFactory};
use crate::config::{BridgeOptions, CooldownPolicy};
use crate::cooldown::CooldownCache;
use crate::error::CoreError;
use crate::query::{BridgeRequest, ValidationError};
use crate::response::{BridgeResponse, BridgeStatus};
use crate::shaper::shape;

pub struct Bridge<F: SessionFactory> {
    clients: Arc<ClientCache<F>>,
    cooldown: CooldownCache,
    options: BridgeOptions,
}

impl<F: SessionFactory> Bridge<F> {
    pub fn new(factory: F, options: BridgeOptions) -> Self {
        Self::with_clients(Arc::new(ClientCache::new(factory)), options)
    }

    /// A bridge sharing an existing client cache.
    pub fn with_clients(clients: Arc<ClientCache<F>>, options: BridgeOptions) -> Self {
        Self {
            clients,
            cooldown: CooldownCache::new(options.cooldown),
            options,
        }
    }

    pub fn clients(&self) -> &Arc<ClientCache<F>> {
        &self.clients
    }

    pub fn cooldown(&self) -> &CooldownCache {
        &self.cooldown
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Parse, validate and run a raw request body.
    pub async fn handle(&self, body: &[u8], now: DateTime<Utc>) -> BridgeResponse {
        match BridgeRequest::from_slice(body) {
            Ok(request) => {
                if self.options.log_requests {
                    // `SecretString` redacts the password in Debug output.
                    info!(?request, "bridge request");
                }
                self.run(&request, now).await
            }
            Err(err) => {
                if self.options.log_requests {
                    info!(bytes = body.len(), error = %err, "bridge request rejected");
                }
                rejection(&err)
            }
        }
    }

    async fn run(&self, request: &BridgeRequest, now: DateTime<Utc>) -> BridgeResponse {
        let warn_on_fallback = !request
            .no_warning_on_fallback
            .unwrap_or(self.options.no_warning_on_fallback);

        if let Some(hit) = self.cooldown.lookup(now) {
            let remaining = hit.remaining_secs;
            return match self.options.cooldown_policy {
                CooldownPolicy::ServeCache => {
                    debug!(host = %request.host, remaining, "serving cached result");
                    let shaped = shape(&request.query, &hit.result.readings, warn_on_fallback);
                    BridgeResponse::shaped(
                        BridgeStatus::Cache,
                        Some(format!(
                            "cached result, next live query in {remaining} seconds"
                        )),
                        shaped,
                    )
                }
                CooldownPolicy::Reject => {
                    debug!(host = %request.host, remaining, "rejecting query inside cooldown");
                    BridgeResponse::failure(
                        BridgeStatus::Cooldown,
                        format!(
                            "too many requests, next request is allowed in {remaining} seconds"
                        ),
                    )
                }
            };
        }

        let readings = match self.fetch(request).await {
            Ok(readings) => readings,
            Err(CoreError::EmptyResult) => {
                error!(host = %request.host, "backend returned no readings");
                return BridgeResponse::failure(
                    BridgeStatus::NoResults,
                    format!("request failed: {}", CoreError::EmptyResult.failure_detail()),
                );
            }
            Err(err) => {
                error!(host = %request.host, error = %err, "query failed");
                return BridgeResponse::failure(
                    BridgeStatus::RequestFailed,
                    format!("request failed: {}", err.failure_detail()),
                );
            }
        };

        info!(host = %request.host, readings = readings.len(), "fetched live readings");
        let result = self.cooldown.store(readings, now);
        let shaped = shape(&request.query, &result.readings, warn_on_fallback);

        let status = match self.options.cooldown_policy {
            CooldownPolicy::ServeCache => BridgeStatus::Live,
            CooldownPolicy::Reject => BridgeStatus::Ok,
        };
        BridgeResponse::shaped(status, None, shaped)
    }

    async fn fetch(
        &self,
        request: &BridgeRequest,
    ) -> Result<Vec<sma_api::ChannelValues>, CoreError> {
        let readings = self
            .clients
            .fetch_live(&request.host, &request.credentials(), &request.live_query())
            .await?;
        if readings.is_empty() {
            return Err(CoreError::EmptyResult);
        }
        Ok(readings)
    }
}

fn rejection(err: &ValidationError) -> BridgeResponse {
    debug!(error = ?err, "rejected bridge request");
    let status = match err {
        ValidationError::InvalidBody { .. } => BridgeStatus::InvalidRequest,
        ValidationError::DuplicateItem { .. } => BridgeStatus::InvalidQuery,
    };
    BridgeResponse::failure(status, err.to_string())
}
