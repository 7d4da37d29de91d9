// Test doubles for the session seam.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use secrecy::SecretString;
use sma_api::{ChannelValues, LiveMeasurementQuery, TimeValuePair};

use crate::client_cache::{LiveSession, SessionFactory};
use crate::config::Credentials;

/// Decides the reply of fetch number `fetch` (1-based) of session `session` (1-based).
type Script = dyn Fn(u32, u32) -> Result<Vec<ChannelValues>, sma_api::Error> + Send + Sync;

#[derive(Debug, Default)]
pub(crate) struct FakeStats {
    created: AtomicUsize,
    logins: AtomicUsize,
    fetches: AtomicUsize,
    logouts: AtomicUsize,
}

impl FakeStats {
    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub(crate) fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

pub(crate) struct FakeFactory {
    stats: Arc<FakeStats>,
    script: Arc<Script>,
    fail_logins: bool,
    next_id: AtomicU32,
}

impl FakeFactory {
    /// Every fetch of every session returns `readings`.
    pub(crate) fn ok(readings: Vec<ChannelValues>) -> Self {
        Self::scripted(move |_, _| Ok(readings.clone()))
    }

    pub(crate) fn scripted(
        script: impl Fn(u32, u32) -> Result<Vec<ChannelValues>, sma_api::Error>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            stats: Arc::new(FakeStats::default()),
            script: Arc::new(script),
            fail_logins: false,
            next_id: AtomicU32::new(1),
        }
    }

    pub(crate) fn failing_logins(mut self) -> Self {
        self.fail_logins = true;
        self
    }

    pub(crate) fn stats(&self) -> Arc<FakeStats> {
        Arc::clone(&self.stats)
    }
}

impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    fn create(&self, _host: &str) -> Result<FakeSession, sma_api::Error> {
        self.stats.created.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            fetches: AtomicU32::new(0),
            stats: Arc::clone(&self.stats),
            script: Arc::clone(&self.script),
            fail_login: self.fail_logins,
        })
    }
}

pub(crate) struct FakeSession {
    id: u32,
    fetches: AtomicU32,
    stats: Arc<FakeStats>,
    script: Arc<Script>,
    fail_login: bool,
}

impl FakeSession {
    pub(crate) fn id(&self) -> u32 {
        self.id
    }
}

impl fmt::Debug for FakeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeSession").field("id", &self.id).finish()
    }
}

impl LiveSession for FakeSession {
    async fn login(&self, _credentials: &Credentials) -> Result<(), sma_api::Error> {
        self.stats.logins.fetch_add(1, Ordering::SeqCst);
        if self.fail_login {
            Err(sma_api::Error::Authentication {
                message: "rejected".into(),
            })
        } else {
            Ok(())
        }
    }

    async fn logout(&self) {
        self.stats.logouts.fetch_add(1, Ordering::SeqCst);
    }

    async fn fetch_live_measurements(
        &self,
        _query: &[LiveMeasurementQuery],
    ) -> Result<Vec<ChannelValues>, sma_api::Error> {
        self.stats.fetches.fetch_add(1, Ordering::SeqCst);
        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        (self.script)(self.id, fetch)
    }
}

pub(crate) fn credentials() -> Credentials {
    Credentials {
        username: "user".into(),
        password: SecretString::from("pw".to_string()),
    }
}

/// A reading whose most recent value is `value`.
pub(crate) fn reading(component: &str, channel: &str, value: i64) -> ChannelValues {
    ChannelValues {
        component_id: component.into(),
        channel_id: channel.into(),
        values: vec![TimeValuePair {
            value: Some(value.into()),
            time: "2024-01-01T00:00:00Z".into(),
        }],
    }
}

/// A reading that exists but carries no current value.
pub(crate) fn empty_reading(component: &str, channel: &str) -> ChannelValues {
    ChannelValues {
        component_id: component.into(),
        channel_id: channel.into(),
        values: vec![TimeValuePair {
            value: None,
            time: "2024-01-01T00:00:00Z".into(),
        }],
    }
}
