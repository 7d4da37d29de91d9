// ── Per-host session client cache ──
//
// Keeps at most one authenticated session per backend host so repeated
// queries skip the login round-trip. A cached session that fails is
// logged out (best effort), dropped, and replaced by a freshly
// authenticated one; the fetch is retried exactly once.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use sma_api::{ChannelValues, LiveMeasurementQuery, SessionClient, TransportConfig};

use crate::config::Credentials;
use crate::error::CoreError;

// ── Session seam ─────────────────────────────────────────────────

/// One authenticated session against one backend host.
pub trait LiveSession: Send + Sync + 'static {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<(), sma_api::Error>> + Send;

    /// Best-effort: failures are logged by the implementation, never returned.
    fn logout(&self) -> impl Future<Output = ()> + Send;

    fn fetch_live_measurements(
        &self,
        query: &[LiveMeasurementQuery],
    ) -> impl Future<Output = Result<Vec<ChannelValues>, sma_api::Error>> + Send;
}

/// Builds unauthenticated sessions for a host.
pub trait SessionFactory: Send + Sync + 'static {
    type Session: LiveSession;

    fn create(&self, host: &str) -> Result<Self::Session, sma_api::Error>;
}

impl LiveSession for SessionClient {
    async fn login(&self, credentials: &Credentials) -> Result<(), sma_api::Error> {
        SessionClient::login(self, &credentials.username, &credentials.password).await
    }

    async fn logout(&self) {
        SessionClient::logout(self).await;
    }

    async fn fetch_live_measurements(
        &self,
        query: &[LiveMeasurementQuery],
    ) -> Result<Vec<ChannelValues>, sma_api::Error> {
        SessionClient::fetch_live_measurements(self, query).await
    }
}

/// Creates real [`SessionClient`]s sharing one transport configuration.
#[derive(Debug, Clone, Default)]
pub struct ApiSessionFactory {
    transport: TransportConfig,
}

impl ApiSessionFactory {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }
}

impl SessionFactory for ApiSessionFactory {
    type Session = SessionClient;

    fn create(&self, host: &str) -> Result<SessionClient, sma_api::Error> {
        SessionClient::new(host, &self.transport)
    }
}

// ── ClientCache ──────────────────────────────────────────────────

/// Authenticated sessions keyed by the literal host string.
///
/// Hosts are not normalised: `SMA.local` and `sma.local` get separate sessions.
pub struct ClientCache<F: SessionFactory> {
    factory: F,
    clients: DashMap<String, Arc<F::Session>>,
}

impl<F: SessionFactory> ClientCache<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            clients: DashMap::new(),
        }
    }

    /// Number of hosts with a cached session.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// The cached session for `host`, if any.
    pub fn cached(&self, host: &str) -> Option<Arc<F::Session>> {
        self.clients.get(host).map(|entry| Arc::clone(entry.value()))
    }

    /// The cached session for `host`, or a freshly authenticated one
    /// that is cached before returning.
    pub async fn get_or_create(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<Arc<F::Session>, CoreError> {
        if let Some(client) = self.cached(host) {
            return Ok(client);
        }
        self.create_session(host, credentials).await
    }

    /// Fetch live readings from `host`, recovering once from a stale
    /// cached session.
    ///
    /// A cached session that errors or returns no readings is replaced by
    /// a new one and the fetch is retried once. An error from the new
    /// session is final. An empty result from a new session is returned
    /// as-is; the caller decides what "no readings" means.
    pub async fn fetch_live(
        &self,
        host: &str,
        credentials: &Credentials,
        query: &[LiveMeasurementQuery],
    ) -> Result<Vec<ChannelValues>, CoreError> {
        if let Some(client) = self.cached(host) {
            match client.fetch_live_measurements(query).await {
                Ok(readings) if !readings.is_empty() => return Ok(readings),
                Ok(_) => warn!(host, "cached session returned no readings, replacing it"),
                Err(e) => warn!(host, error = %e, "cached session failed, replacing it"),
            }
            self.discard(host, &client).await;
        }

        let client = self.create_session(host, credentials).await?;
        match client.fetch_live_measurements(query).await {
            Ok(readings) => Ok(readings),
            Err(e) => {
                self.discard(host, &client).await;
                Err(CoreError::from_api(host, e))
            }
        }
    }

    /// Log out (best effort) and forget `client`, unless another request
    /// already replaced it.
    async fn discard(&self, host: &str, client: &Arc<F::Session>) {
        client.logout().await;
        let removed = self
            .clients
            .remove_if(host, |_, cached| Arc::ptr_eq(cached, client));
        if removed.is_some() {
            debug!(host, "discarded cached session");
        }
    }

    async fn create_session(
        &self,
        host: &str,
        credentials: &Credentials,
    ) -> Result<Arc<F::Session>, CoreError> {
        let client = self
            .factory
            .create(host)
            .map_err(|e| CoreError::from_api(host, e))?;

        client
            .login(credentials)
            .await
            .map_err(|e| CoreError::from_api(host, e))?;

        let client = Arc::new(client);
        if self
            .clients
            .insert(host.to_owned(), Arc::clone(&client))
            .is_some()
        {
            debug!(host, "replaced a session cached by a concurrent request");
        }
        info!(host, username = %credentials.username, "new session established");
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use sma_api::ReadingValue;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::testing::{FakeFactory, credentials, reading};

    fn query() -> Vec<LiveMeasurementQuery> {
        vec![LiveMeasurementQuery::channel("IGULD:SELF", "Measurement.GridMs.TotW")]
    }

    #[tokio::test]
    async fn creates_and_caches_one_session_per_host() {
        let factory = FakeFactory::ok(vec![reading("IGULD:SELF", "Measurement.GridMs.TotW", 1)]);
        let stats = factory.stats();
        let cache = ClientCache::new(factory);

        assert_ok!(cache.fetch_live("sma-a", &credentials(), &query()).await);
        assert_ok!(cache.fetch_live("sma-a", &credentials(), &query()).await);

        assert_eq!(stats.created(), 1);
        assert_eq!(stats.logins(), 1);
        assert_eq!(stats.fetches(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn host_keys_are_case_sensitive() {
        let factory = FakeFactory::ok(vec![reading("c", "x", 1)]);
        let stats = factory.stats();
        let cache = ClientCache::new(factory);

        assert_ok!(cache.get_or_create("SMA.local", &credentials()).await);
        assert_ok!(cache.get_or_create("sma.local", &credentials()).await);

        assert_eq!(stats.created(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn stale_session_is_replaced_and_retried_once() {
        // Session #1 answers its first fetch, then fails; session #2 answers.
        let factory = FakeFactory::scripted(|session, fetch| {
            if session == 1 && fetch > 1 {
                Err(sma_api::Error::Authentication {
                    message: "expired".into(),
                })
            } else {
                Ok(vec![reading("c", "x", i64::from(session))])
            }
        });
        let stats = factory.stats();
        let cache = ClientCache::new(factory);

        assert_ok!(cache.fetch_live("sma", &credentials(), &query()).await);
        let first = cache.cached("sma").map(|s| s.id());

        let readings = assert_ok!(cache.fetch_live("sma", &credentials(), &query()).await);
        assert_eq!(readings[0].current_value(), Some(&ReadingValue::from(2_i64)));

        assert_eq!(stats.created(), 2);
        assert_eq!(stats.logins(), 2);
        assert_eq!(stats.fetches(), 3);
        assert_eq!(stats.logouts(), 1);
        assert_eq!(first, Some(1));
        assert_eq!(cache.cached("sma").map(|s| s.id()), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_retry_fails_the_query() {
        let factory = FakeFactory::scripted(|session, fetch| {
            if session == 1 && fetch == 1 {
                Ok(vec![reading("c", "x", 1)])
            } else {
                Err(sma_api::Error::Api {
                    status: 500,
                    message: "boom".into(),
                })
            }
        });
        let stats = factory.stats();
        let cache = ClientCache::new(factory);

        assert_ok!(cache.fetch_live("sma", &credentials(), &query()).await);

        let err = assert_err!(cache.fetch_live("sma", &credentials(), &query()).await);

        assert!(matches!(err, CoreError::Api { status: Some(500), .. }), "got {err:?}");
        assert_eq!(stats.created(), 2);
        assert_eq!(stats.fetches(), 3);
        assert_eq!(stats.logouts(), 2);
        assert!(cache.is_empty(), "failed sessions must not stay cached");
    }

    #[tokio::test]
    async fn empty_cached_result_triggers_fresh_session() {
        let factory = FakeFactory::scripted(|session, _| {
            if session == 1 {
                Ok(Vec::new())
            } else {
                Ok(vec![reading("c", "x", 7)])
            }
        });
        let stats = factory.stats();
        let cache = ClientCache::new(factory);

        let first = assert_ok!(cache.fetch_live("sma", &credentials(), &query()).await);
        assert!(first.is_empty());

        let second = assert_ok!(cache.fetch_live("sma", &credentials(), &query()).await);
        assert_eq!(second.len(), 1);
        assert_eq!(stats.created(), 2);
    }

    #[tokio::test]
    async fn login_failure_caches_nothing() {
        let factory = FakeFactory::ok(vec![reading("c", "x", 1)]).failing_logins();
        let stats = factory.stats();
        let cache = ClientCache::new(factory);

        let err = assert_err!(cache.fetch_live("sma", &credentials(), &query()).await);

        assert!(matches!(err, CoreError::Authentication { .. }), "got {err:?}");
        assert_eq!(err.failure_detail(), "login failed");
        assert_eq!(stats.fetches(), 0);
        assert!(cache.is_empty());
    }
}
