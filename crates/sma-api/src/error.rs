use thiserror::Error;

/// Top-level error type for the `sma-api` crate.
///
/// Covers every failure mode of a vendor session: authentication,
/// session misuse, transport, and response-shape mismatches.
/// `sma-core` maps these into the bridge's error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, malformed token reply, or no session cookie.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// An authenticated operation was attempted without a session.
    #[error("Session not established -- login required")]
    SessionNotEstablished,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header value (host, token, cookie) is not valid HTTP.
    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Vendor API ──────────────────────────────────────────────────
    /// Non-success HTTP status from an authenticated endpoint.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape, with the raw body for debugging.
    #[error("Protocol error: {message}")]
    Protocol { message: String, body: String },
}

/// Fragments that transport errors carry when a host name could not be resolved.
const UNRESOLVED_HOST_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "no such host",
    "enotfound",
];

impl Error {
    /// Returns `true` if this error indicates the session is no longer usable
    /// and a fresh login might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::SessionNotEstablished
        )
    }

    /// Returns `true` if the backend host name could not be resolved.
    ///
    /// reqwest does not expose resolver failures as a distinct kind, so the
    /// whole source chain is inspected for well-known resolver messages.
    pub fn is_host_unresolved(&self) -> bool {
        let Self::Transport(e) = self else {
            return false;
        };

        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(e);
        while let Some(err) = current {
            let text = err.to_string().to_lowercase();
            if UNRESOLVED_HOST_MARKERS.iter().any(|m| text.contains(m)) {
                return true;
            }
            current = err.source();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_are_expired_sessions() {
        assert!(Error::SessionNotEstablished.is_auth_expired());
        assert!(
            Error::Authentication {
                message: "nope".into()
            }
            .is_auth_expired()
        );
        assert!(
            !Error::Api {
                status: 500,
                message: String::new()
            }
            .is_auth_expired()
        );
    }

    #[test]
    fn non_transport_errors_are_never_unresolved_hosts() {
        let err = Error::Protocol {
            message: "dns error".into(),
            body: String::new(),
        };
        assert!(!err.is_host_unresolved());
    }

    #[tokio::test]
    async fn unresolvable_host_is_detected() {
        let err = reqwest::Client::new()
            .get("http://does-not-exist.invalid/")
            .send()
            .await
            .expect_err("the .invalid TLD never resolves");
        assert!(Error::Transport(err).is_host_unresolved());
    }
}
