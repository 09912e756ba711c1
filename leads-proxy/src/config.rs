use crate::error::{Error, Result};
use std::time::Duration;
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;
/// Longest accepted token lifetime (one year)
pub const MAX_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 3600;
const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Which data backend serves the protected routes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// Seeded in-memory collections
    Memory,
    /// MockAPI-style remote store
    Remote {
        base_url: Url,
        api_key: Option<String>,
        timeout: Duration,
    },
}

/// Client id/secret pair token requests must present when configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Configuration for the leads proxy server
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Data backend selection
    pub backend: BackendKind,

    /// Out-of-band secret for `/__reset`; reset is refused when unset
    pub reset_key: Option<String>,

    /// Optional client credential check on `/oauth/token`
    pub client_credentials: Option<ClientCredentials>,

    /// Issued token lifetime in seconds (default: 3600 = 1 hour)
    pub token_ttl_seconds: i64,

    /// TCP port to listen on
    pub port: u16,
}

impl ProxyConfig {
    /// Create a new configuration with sensible defaults
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            reset_key: None,
            client_credentials: None,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            port: DEFAULT_PORT,
        }
    }

    /// Configuration backed by a remote store at `base_url`
    pub fn remote(base_url: Url) -> Self {
        Self::new(BackendKind::Remote {
            base_url,
            api_key: None,
            timeout: DEFAULT_REMOTE_TIMEOUT,
        })
    }

    /// Configuration backed by the in-memory dataset
    pub fn memory() -> Self {
        Self::new(BackendKind::Memory)
    }

    /// Set the reset secret
    pub fn with_reset_key(mut self, key: impl Into<String>) -> Self {
        self.reset_key = Some(key.into());
        self
    }

    /// Require a client id/secret pair on token requests
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_credentials = Some(ClientCredentials {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        });
        self
    }

    /// Set token lifetime in seconds
    pub fn with_token_ttl(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    /// Set listen port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the API key sent to the remote store. No-op for the memory backend.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        if let BackendKind::Remote { api_key, .. } = &mut self.backend {
            *api_key = Some(key.into());
        }
        self
    }

    /// Set the remote request timeout. No-op for the memory backend.
    pub fn with_remote_timeout(mut self, value: Duration) -> Self {
        if let BackendKind::Remote { timeout, .. } = &mut self.backend {
            *timeout = value;
        }
        self
    }

    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut config = match var("DATA_BACKEND").as_deref() {
            None | Some("remote") => {
                let base = var("MOCKAPI_BASE").ok_or_else(|| {
                    Error::Config(
                        "missing MOCKAPI_BASE (e.g. https://<proj>.mockapi.io/api/v1)".to_string(),
                    )
                })?;
                let base_url = Url::parse(&base)
                    .map_err(|e| Error::Config(format!("invalid MOCKAPI_BASE: {}", e)))?;
                Self::remote(base_url)
            }
            Some("memory") => Self::memory(),
            Some(other) => {
                return Err(Error::Config(format!(
                    "DATA_BACKEND must be 'remote' or 'memory', got '{}'",
                    other
                )));
            }
        };

        if let Some(key) = var("MOCKAPI_API_KEY") {
            config = config.with_api_key(key);
        }
        if let Some(seconds) = var("MOCKAPI_TIMEOUT_SECONDS") {
            config = config.with_remote_timeout(Duration::from_secs(parse_number(
                "MOCKAPI_TIMEOUT_SECONDS",
                &seconds,
            )?));
        }
        if let Some(key) = var("RESET_KEY") {
            config = config.with_reset_key(key);
        }
        match (var("OAUTH_CLIENT_ID"), var("OAUTH_CLIENT_SECRET")) {
            (Some(id), Some(secret)) => config = config.with_client_credentials(id, secret),
            (None, None) => {}
            _ => {
                return Err(Error::Config(
                    "OAUTH_CLIENT_ID and OAUTH_CLIENT_SECRET must be set together".to_string(),
                ));
            }
        }
        if let Some(ttl) = var("TOKEN_TTL_SECONDS") {
            let ttl: i64 = parse_number("TOKEN_TTL_SECONDS", &ttl)?;
            if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&ttl) {
                return Err(Error::Config(format!(
                    "TOKEN_TTL_SECONDS must be between 1 and {}, got {}",
                    MAX_TOKEN_TTL_SECONDS, ttl
                )));
            }
            config = config.with_token_ttl(ttl);
        }
        if let Some(port) = var("PORT") {
            config = config.with_port(parse_number("PORT", &port)?);
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", name, value)))
}
