// Application state shared across handlers.

use std::sync::Arc;

use sma_config::BridgeSettings;
use sma_core::{ApiSessionFactory, Bridge, CooldownCache, LiveData};

pub struct AppState {
    pub bridge: Bridge<ApiSessionFactory>,
    /// Present only when a `[backend]` is configured.
    pub live_data: Option<LiveData<ApiSessionFactory>>,
    /// Path of the bridge endpoint.
    pub endpoint: String,
    pub http_error_codes: bool,
}

impl AppState {
    pub fn from_settings(settings: &BridgeSettings) -> Self {
        let factory = ApiSessionFactory::new(settings.transport());
        let bridge = Bridge::new(factory, settings.bridge_options());

        let live_data = settings.backend_target().map(|target| {
            LiveData::new(
                Arc::clone(bridge.clients()),
                target,
                CooldownCache::new(bridge.options().cooldown),
            )
        });

        Self {
            bridge,
            live_data,
            endpoint: settings.endpoint.clone(),
            http_error_codes: settings.http_error_codes,
        }
    }
}
