// Vendor API HTTP client
//
// Wraps `reqwest::Client` with the appliance's URL layout, origin headers,
// and the session state established by `login`. Endpoint groups (auth,
// measurements) are implemented as inherent methods in separate files to
// keep this module focused on transport mechanics.

use std::sync::{PoisonError, RwLock};

use reqwest::header::{AUTHORIZATION, COOKIE, HOST, HeaderMap, HeaderValue, ORIGIN};
use secrecy::ExposeSecret;
use url::Url;

use crate::auth::{SESSION_COOKIE, Session, SessionState};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Client for one authenticated session against one appliance.
///
/// A client starts unauthenticated; [`login`](Self::login) establishes the
/// session and [`logout`](Self::logout) ends it. Once a request fails the
/// owner is expected to discard the client rather than repair it.
pub struct SessionClient {
    http: reqwest::Client,
    host: String,
    base_url: Url,
    session: RwLock<SessionState>,
}

impl SessionClient {
    /// Create a new client for `host` from a `TransportConfig`.
    ///
    /// `host` is the appliance host name or IP, without scheme
    /// (e.g. `192.168.1.50` or `datamanager.local:8443`).
    pub fn new(host: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = transport.api_base_url(host)?;
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, host.to_owned()))
    }

    /// Create a client with a pre-built `reqwest::Client` and API base URL.
    ///
    /// `base_url` is the API root and must end with `/` (e.g. `http://host/api/v1/`).
    pub fn with_client(http: reqwest::Client, base_url: Url, host: String) -> Self {
        Self {
            http,
            host,
            base_url,
            session: RwLock::new(SessionState::Unauthenticated),
        }
    }

    /// The appliance host this client talks to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Whether a login has completed and no logout happened since.
    pub fn is_authenticated(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_authenticated()
    }

    // ── Session state ────────────────────────────────────────────────

    /// Swap in a new session state, returning the previous one.
    pub(crate) fn replace_session(&self, state: SessionState) -> SessionState {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, state)
    }

    /// A copy of the current session, or `SessionNotEstablished`.
    pub(crate) fn require_session(&self) -> Result<Session, Error> {
        match &*self.session.read().unwrap_or_else(PoisonError::into_inner) {
            SessionState::Authenticated(session) => Ok(session.clone()),
            SessionState::Unauthenticated => Err(Error::SessionNotEstablished),
        }
    }

    // ── URL & header builders ────────────────────────────────────────

    /// Resolve an endpoint path relative to the API root.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// `Origin` and `Host` headers matching the configured appliance.
    pub(crate) fn origin_headers(&self) -> Result<HeaderMap, Error> {
        let origin = self.base_url.as_str().trim_end_matches('/');

        let mut headers = HeaderMap::new();
        headers.insert(ORIGIN, HeaderValue::from_str(origin)?);
        headers.insert(HOST, HeaderValue::from_str(&self.host)?);
        Ok(headers)
    }

    /// Origin headers plus the bearer token and session cookie.
    pub(crate) fn auth_headers(&self, session: &Session) -> Result<HeaderMap, Error> {
        let mut headers = self.origin_headers()?;

        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {}", session.access_token.expose_secret()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let mut cookie = HeaderValue::from_str(&format!(
            "{SESSION_COOKIE}={}",
            session.session_cookie.expose_secret()
        ))?;
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);

        Ok(headers)
    }
}

/// First 200 characters of a response body, for error messages.
pub(crate) fn preview(body: &str) -> &str {
    body.char_indices().nth(200).map_or(body, |(i, _)| &body[..i])
}
