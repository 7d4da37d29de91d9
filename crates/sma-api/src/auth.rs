// Vendor API authentication
//
// Token login and refresh-token logout. Login exchanges credentials for a
// bearer token pair and captures the `JSESSIONID` cookie from the same reply;
// both are required before any authenticated request is made.

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::client::{SessionClient, preview};
use crate::error::Error;
use crate::models::TokenResponse;

/// Name of the session cookie set by the login reply.
pub(crate) const SESSION_COOKIE: &str = "JSESSIONID";

/// Credentials of an established session.
///
/// Only constructed from a complete login reply, so a half-populated
/// session cannot exist.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) access_token: SecretString,
    pub(crate) refresh_token: SecretString,
    pub(crate) session_cookie: SecretString,
}

/// Authentication state of one session client.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(Session),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

impl SessionClient {
    /// Authenticate with the appliance using username/password.
    ///
    /// `POST /api/v1/token` with a form-encoded password grant. On success
    /// the token pair and the session cookie become this client's session.
    /// Any previous session is dropped first, whatever the outcome.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        self.replace_session(SessionState::Unauthenticated);

        let url = self.endpoint("token")?;
        debug!(%url, username, "logging in");

        let resp = self
            .http()
            .post(url)
            .headers(self.origin_headers()?)
            .form(&[
                ("grant_type", "password"),
                ("username", username),
                ("password", password.expose_secret()),
            ])
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!(
                    "login as {username} rejected (HTTP {status}): {}",
                    preview(&body)
                ),
            });
        }

        // The cookie travels in the headers, independent of the token payload.
        let session_cookie = resp
            .cookies()
            .find(|c| c.name().eq_ignore_ascii_case(SESSION_COOKIE))
            .map(|c| c.value().to_owned());

        let body = resp.text().await.map_err(Error::Transport)?;
        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| Error::Authentication {
            message: format!("failed to login as {username}: malformed token reply ({e})"),
        })?;

        let (Some(access_token), Some(refresh_token), Some(token_type)) =
            (token.access_token, token.refresh_token, token.token_type)
        else {
            return Err(Error::Authentication {
                message: format!("failed to login as {username}: token reply is incomplete"),
            });
        };

        if !token_type.eq_ignore_ascii_case("bearer") {
            return Err(Error::Authentication {
                message: format!("failed to login as {username}: unexpected token type {token_type}"),
            });
        }

        let Some(session_cookie) = session_cookie else {
            return Err(Error::Authentication {
                message: format!("failed to login as {username}: no {SESSION_COOKIE} cookie in reply"),
            });
        };

        self.replace_session(SessionState::Authenticated(Session {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            session_cookie: session_cookie.into(),
        }));

        debug!("login successful");
        Ok(())
    }

    /// End the session with the appliance.
    ///
    /// `DELETE /api/v1/refreshtoken?refreshToken=...`; HTTP 200 and 401
    /// (token already invalid) both count as success. The local session is
    /// cleared regardless, and failures are logged, never returned, so a
    /// broken session never blocks a later login.
    pub async fn logout(&self) {
        let SessionState::Authenticated(session) =
            self.replace_session(SessionState::Unauthenticated)
        else {
            debug!("logout skipped, no session");
            return;
        };

        match self.revoke_refresh_token(&session).await {
            Ok(()) => debug!("logout complete"),
            Err(e) => warn!(error = %e, "logout failed (non-fatal)"),
        }
    }

    async fn revoke_refresh_token(&self, session: &Session) -> Result<(), Error> {
        let mut url = self.endpoint("refreshtoken")?;
        url.query_pairs_mut()
            .append_pair("refreshToken", session.refresh_token.expose_secret());

        debug!(path = url.path(), "logging out");

        let resp = self
            .http()
            .delete(url)
            .headers(self.auth_headers(session)?)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::OK || status == reqwest::StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                message: "refresh token was not revoked".into(),
            })
        }
    }
}
