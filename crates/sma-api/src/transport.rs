// Shared transport configuration for building reqwest::Client instances.
//
// Every session client for every host is built through this module, so TLS,
// timeout, and scheme settings live in one place.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::Error;

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (appliances ship self-signed certificates).
    DangerAcceptInvalid,
}

/// URL scheme used to reach the appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Https,
    Http,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
    pub scheme: Scheme,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(30),
            scheme: Scheme::Https,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// No cookie store is attached: the session cookie is tracked
    /// explicitly by the session client and sent as a header.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("sma-bridge/", env!("CARGO_PKG_VERSION")));

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// The vendor API root for `host`: `{scheme}://{host}/api/v1/`.
    ///
    /// `host` is the bare host name or IP (optionally with port), without scheme.
    pub fn api_base_url(&self, host: &str) -> Result<Url, Error> {
        let url = Url::parse(&format!("{}://{host}/api/v1/", self.scheme.as_str()))?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_follows_scheme() {
        let https = TransportConfig::default();
        assert_eq!(
            https.api_base_url("192.168.0.10").map(String::from).ok(),
            Some("https://192.168.0.10/api/v1/".to_owned())
        );

        let http = TransportConfig {
            scheme: Scheme::Http,
            ..TransportConfig::default()
        };
        assert_eq!(
            http.api_base_url("datamanager:8080").map(String::from).ok(),
            Some("http://datamanager:8080/api/v1/".to_owned())
        );
    }

    #[test]
    fn base_url_rejects_garbage_host() {
        let transport = TransportConfig::default();
        assert!(matches!(
            transport.api_base_url("bad host/"),
            Err(Error::InvalidUrl(_))
        ));
    }
}
