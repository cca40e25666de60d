//! Client-side configuration: credentials, transport settings, polling.
//!
//! Everything here is immutable once built and is validated before the
//! first network call, so a bad setting always surfaces as a
//! configuration error rather than as a confusing transport failure.

use crate::error::{PdfServicesError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Environment variable holding the service-principal client id.
pub const CLIENT_ID_VAR: &str = "PDF_SERVICES_CLIENT_ID";
/// Environment variable holding the service-principal client secret.
pub const CLIENT_SECRET_VAR: &str = "PDF_SERVICES_CLIENT_SECRET";

// ── Credentials ──────────────────────────────────────────────────────────

/// Service-principal credentials.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Build credentials from explicit values. Both must be non-empty.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.trim().is_empty() {
            return Err(PdfServicesError::MissingCredential { var: CLIENT_ID_VAR });
        }
        if client_secret.trim().is_empty() {
            return Err(PdfServicesError::MissingCredential {
                var: CLIENT_SECRET_VAR,
            });
        }
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Read `PDF_SERVICES_CLIENT_ID` and `PDF_SERVICES_CLIENT_SECRET` from the
    /// process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the two credential variables through an arbitrary lookup.
    ///
    /// Tests use this to supply a fake environment without touching the
    /// real one.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = lookup(CLIENT_ID_VAR).unwrap_or_default();
        let client_secret = lookup(CLIENT_SECRET_VAR).unwrap_or_default();
        Self::new(client_id, client_secret)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

// ── Proxy ────────────────────────────────────────────────────────────────

/// Scheme used to talk to the proxy server itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyScheme {
    #[default]
    Http,
    Https,
}

impl ProxyScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyScheme::Http => "http",
            ProxyScheme::Https => "https",
        }
    }

    /// Standard port for the scheme, used when no port is configured.
    pub fn default_port(&self) -> u16 {
        match self {
            ProxyScheme::Http => 80,
            ProxyScheme::Https => 443,
        }
    }
}

impl fmt::Display for ProxyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basic-auth credentials for an authenticating proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Proxy server every outbound call is routed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyServerConfig {
    pub host: String,
    pub scheme: ProxyScheme,
    /// `None` means the scheme's standard port.
    pub port: Option<u16>,
    pub credentials: Option<ProxyCredentials>,
}

impl ProxyServerConfig {
    pub fn new(host: impl Into<String>, scheme: ProxyScheme) -> Self {
        Self {
            host: host.into(),
            scheme,
            port: None,
            credentials: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(ProxyCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Effective port: the configured one, else the scheme default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.scheme.default_port())
    }

    /// Proxy URL in the form `scheme://host:port`.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port())
    }

    fn validate(&self) -> Result<()> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(PdfServicesError::InvalidConfig(
                "Proxy host must not be empty".into(),
            ));
        }
        if host.contains("://") || host.contains('/') || host.contains(char::is_whitespace) {
            return Err(PdfServicesError::InvalidConfig(format!(
                "Proxy host must be a bare hostname, got '{}'",
                self.host
            )));
        }
        if self.port == Some(0) {
            return Err(PdfServicesError::InvalidConfig(
                "Proxy port must be 1–65535".into(),
            ));
        }
        Ok(())
    }
}

// ── Region ───────────────────────────────────────────────────────────────

/// Service region. Each region has its own API host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    pub fn base_url(&self) -> &'static str {
        match self {
            Region::Us => "https://pdf-services.adobe.io",
            Region::Eu => "https://pdf-services-ue1.adobe.io",
        }
    }
}

// ── Client config ────────────────────────────────────────────────────────

/// Transport settings for the service client.
///
/// Built via [`ClientConfig::builder()`] or [`ClientConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_services_jobs::{ClientConfig, ProxyScheme, ProxyServerConfig};
///
/// let config = ClientConfig::builder()
///     .connect_timeout_ms(10_000)
///     .read_timeout_ms(40_000)
///     .proxy(ProxyServerConfig::new("proxy.internal", ProxyScheme::Http).with_port(3128))
///     .build()
///     .unwrap();
/// assert_eq!(config.proxy.unwrap().url(), "http://proxy.internal:3128");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// TCP connect timeout in milliseconds. Default: 10 000.
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds, applied to every call. Default: 40 000.
    pub read_timeout_ms: u64,
    /// Route every call through this proxy. Default: direct.
    pub proxy: Option<ProxyServerConfig>,
    /// Service region. Ignored when `base_url` is set. Default: US.
    pub region: Region,
    /// Explicit API host, e.g. for a staging endpoint or a test server.
    pub base_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            read_timeout_ms: 40_000,
            proxy: None,
            region: Region::default(),
            base_url: None,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// API host without a trailing slash.
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.region.base_url())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    pub fn proxy(mut self, proxy: ProxyServerConfig) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    pub fn region(mut self, region: Region) -> Self {
        self.config.region = region;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig> {
        let c = &self.config;
        if c.connect_timeout_ms == 0 || c.read_timeout_ms == 0 {
            return Err(PdfServicesError::InvalidConfig(
                "Timeouts must be at least 1ms".into(),
            ));
        }
        if let Some(ref proxy) = c.proxy {
            proxy.validate()?;
        }
        if let Some(ref base) = c.base_url {
            let parsed = url::Url::parse(base).map_err(|e| {
                PdfServicesError::InvalidConfig(format!("Invalid base URL '{base}': {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(PdfServicesError::InvalidConfig(format!(
                    "Base URL must be http or https, got '{base}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Polling ──────────────────────────────────────────────────────────────

/// How the result retriever waits for a job to finish.
///
/// The service gives no completion callback, so the job location is polled
/// every `interval` until it reports `done` or `failed`, giving up with
/// [`PdfServicesError::PollTimeout`] after `timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between status requests. Default: 3 s.
    pub interval: Duration,
    /// Overall bound on the wait. Default: 10 min.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(600),
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.interval.is_zero() || self.timeout.is_zero() {
            return Err(PdfServicesError::InvalidConfig(
                "Poll interval and timeout must be non-zero".into(),
            ));
        }
        if self.interval > self.timeout {
            return Err(PdfServicesError::InvalidConfig(format!(
                "Poll interval ({:?}) exceeds poll timeout ({:?})",
                self.interval, self.timeout
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn credentials_from_lookup() {
        let vars = env(&[(CLIENT_ID_VAR, "id-123"), (CLIENT_SECRET_VAR, "s3cret")]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.client_id(), "id-123");
        assert_eq!(creds.client_secret(), "s3cret");
    }

    #[test]
    fn missing_secret_names_the_variable() {
        let vars = env(&[(CLIENT_ID_VAR, "id-123")]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(
            matches!(err, PdfServicesError::MissingCredential { var } if var == CLIENT_SECRET_VAR)
        );
    }

    #[test]
    fn empty_id_is_missing() {
        let vars = env(&[(CLIENT_ID_VAR, "  "), (CLIENT_SECRET_VAR, "s3cret")]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, PdfServicesError::MissingCredential { var } if var == CLIENT_ID_VAR));
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("id", "hunter2").unwrap();
        let shown = format!("{creds:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn proxy_default_ports() {
        let http = ProxyServerConfig::new("proxy.local", ProxyScheme::Http);
        let https = ProxyServerConfig::new("proxy.local", ProxyScheme::Https);
        assert_eq!(http.url(), "http://proxy.local:80");
        assert_eq!(https.url(), "https://proxy.local:443");
        assert_eq!(https.clone().with_port(8443).port(), 8443);
    }

    #[test]
    fn proxy_host_with_scheme_rejected() {
        let err = ClientConfig::builder()
            .proxy(ProxyServerConfig::new("http://proxy.local", ProxyScheme::Http))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn proxy_port_zero_rejected() {
        assert!(ClientConfig::builder()
            .proxy(ProxyServerConfig::new("proxy.local", ProxyScheme::Http).with_port(0))
            .build()
            .is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(ClientConfig::builder().read_timeout_ms(0).build().is_err());
    }

    #[test]
    fn base_url_override_wins_over_region() {
        let config = ClientConfig::builder()
            .region(Region::Eu)
            .base_url("http://127.0.0.1:9000/")
            .build()
            .unwrap();
        assert_eq!(config.resolved_base_url(), "http://127.0.0.1:9000");
        assert_eq!(
            ClientConfig::builder().region(Region::Eu).build().unwrap().resolved_base_url(),
            "https://pdf-services-ue1.adobe.io"
        );
    }

    #[test]
    fn ftp_base_url_rejected() {
        assert!(ClientConfig::builder()
            .base_url("ftp://example.test")
            .build()
            .is_err());
    }

    #[test]
    fn poll_policy_validation() {
        assert!(PollPolicy::default().validate().is_ok());
        assert!(PollPolicy::new(Duration::ZERO, Duration::from_secs(1))
            .validate()
            .is_err());
        assert!(PollPolicy::new(Duration::from_secs(5), Duration::from_secs(1))
            .validate()
            .is_err());
    }
}
