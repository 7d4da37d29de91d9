// ── Core error types ──
//
// Errors of the query pipeline. Consumers never see HTTP status codes or
// JSON parse failures of the vendor API directly: the
// `From<sma_api::Error>` impl translates them into this taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    /// Bad credentials or malformed token reply.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// An operation ran without a valid session.
    #[error("Session error: {message}")]
    Session { message: String },

    // ── Backend errors ───────────────────────────────────────────────
    /// Backend reply did not have the expected shape.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The backend host name did not resolve.
    #[error("Host {host} could not be resolved")]
    HostUnresolved { host: String },

    #[error("Cannot connect to {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    /// The backend answered, but with no readings at all.
    #[error("Backend returned an empty result")]
    EmptyResult,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Translate a vendor API error raised while talking to `host`.
    ///
    /// Resolver failures are only recognisable with the host at hand,
    /// so this is preferred over the plain `From` conversion.
    pub fn from_api(host: &str, err: sma_api::Error) -> Self {
        if err.is_host_unresolved() {
            return Self::HostUnresolved {
                host: host.to_owned(),
            };
        }
        match err {
            sma_api::Error::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                Self::ConnectionFailed {
                    host: host.to_owned(),
                    reason: e.to_string(),
                }
            }
            other => other.into(),
        }
    }

    /// Short caller-facing description of a failed query.
    pub fn failure_detail(&self) -> String {
        match self {
            Self::HostUnresolved { host } => format!("host {host} could not be resolved"),
            Self::Authentication { .. } => "login failed".into(),
            Self::EmptyResult => "empty result".into(),
            _ => "unknown error".into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<sma_api::Error> for CoreError {
    fn from(err: sma_api::Error) -> Self {
        match err {
            sma_api::Error::Authentication { message } => CoreError::Authentication { message },
            sma_api::Error::SessionNotEstablished => CoreError::Session {
                message: "session not established".into(),
            },
            sma_api::Error::Transport(e) => CoreError::ConnectionFailed {
                host: e
                    .url()
                    .and_then(|u| u.host_str().map(str::to_owned))
                    .unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            sma_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            sma_api::Error::InvalidHeader(e) => CoreError::Config {
                message: format!("Invalid header value: {e}"),
            },
            sma_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            sma_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            sma_api::Error::Protocol { message, body: _ } => CoreError::Protocol { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_details() {
        assert_eq!(
            CoreError::HostUnresolved {
                host: "sma.local".into()
            }
            .failure_detail(),
            "host sma.local could not be resolved"
        );
        assert_eq!(
            CoreError::from(sma_api::Error::Authentication {
                message: "rejected".into()
            })
            .failure_detail(),
            "login failed"
        );
        assert_eq!(CoreError::EmptyResult.failure_detail(), "empty result");
        assert_eq!(
            CoreError::from(sma_api::Error::Protocol {
                message: "bad".into(),
                body: String::new()
            })
            .failure_detail(),
            "unknown error"
        );
    }

    #[test]
    fn session_misuse_maps_to_session_error() {
        assert!(matches!(
            CoreError::from_api("h", sma_api::Error::SessionNotEstablished),
            CoreError::Session { .. }
        ));
    }
}
