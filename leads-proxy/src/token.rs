use crate::config::ClientCredentials;
use crate::error::{Error, Result};
use crate::store::{Clock, TokenRecord, TokenStore};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Scope granted when a token request names none
pub const DEFAULT_SCOPE: &str = "api";

/// Grant types the token endpoint approves. All of them are handled the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    ClientCredentials,
    AuthorizationCode,
    Password,
    RefreshToken,
}

impl GrantType {
    pub const ALL: [GrantType; 4] = [
        GrantType::ClientCredentials,
        GrantType::AuthorizationCode,
        GrantType::Password,
        GrantType::RefreshToken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::ClientCredentials => "client_credentials",
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Password => "password",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

impl FromStr for GrantType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        GrantType::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or(Error::UnsupportedGrantType)
    }
}

/// Parameters accepted by the token endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub scope: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl TokenRequest {
    /// Fill unset fields from `other`
    pub fn or(self, other: TokenRequest) -> TokenRequest {
        TokenRequest {
            grant_type: self.grant_type.or(other.grant_type),
            scope: self.scope.or(other.scope),
            client_id: self.client_id.or(other.client_id),
            client_secret: self.client_secret.or(other.client_secret),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub scope: String,
}

/// Issues opaque bearer tokens and validates them against the token store
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    ttl_seconds: i64,
    client_credentials: Option<ClientCredentials>,
}

impl TokenManager {
    pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>, ttl_seconds: i64) -> Self {
        Self {
            store,
            clock,
            ttl_seconds,
            client_credentials: None,
        }
    }

    /// Require this client id/secret pair on every token request
    pub fn with_client_credentials(mut self, credentials: Option<ClientCredentials>) -> Self {
        self.client_credentials = credentials;
        self
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Handle a token endpoint request: check grant type and client, then issue.
    pub async fn handle_token_request(&self, request: TokenRequest) -> Result<TokenResponse> {
        let grant_type: GrantType = request
            .grant_type
            .as_deref()
            .filter(|g| !g.is_empty())
            .ok_or_else(|| Error::InvalidRequest("grant_type required".to_string()))?
            .parse()?;

        if let Some(expected) = &self.client_credentials {
            let presented = (request.client_id.as_deref(), request.client_secret.as_deref());
            if presented
                != (
                    Some(expected.client_id.as_str()),
                    Some(expected.client_secret.as_str()),
                )
            {
                tracing::warn!(client_id = ?request.client_id, "rejected client credentials");
                return Err(Error::InvalidClient);
            }
        }

        let scope = parse_scope(request.scope.as_deref());
        self.issue(scope, grant_type).await
    }

    /// Issue a new token with the configured lifetime
    pub async fn issue(&self, scope: Vec<String>, grant_type: GrantType) -> Result<TokenResponse> {
        let expires_at = self
            .clock
            .now()
            .checked_add(self.ttl_seconds)
            .ok_or_else(|| Error::Internal("token expiry out of range".to_string()))?;
        let token = generate_token();
        let scope_str = scope.join(" ");

        self.store
            .insert(&token, TokenRecord { expires_at, scope })
            .await?;

        tracing::info!(
            grant_type = grant_type.as_str(),
            scope = %scope_str,
            "issued access token"
        );

        Ok(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.ttl_seconds,
            scope: scope_str,
        })
    }

    /// Validate a presented token. Expired tokens are evicted on detection.
    pub async fn validate(&self, token: &str) -> Result<TokenRecord> {
        let record = self
            .store
            .get(token)
            .await?
            .ok_or_else(|| Error::InvalidToken("unknown token".to_string()))?;

        if self.clock.now() >= record.expires_at {
            self.store.remove(token).await?;
            return Err(Error::InvalidToken("expired token".to_string()));
        }

        Ok(record)
    }
}

/// Split a space-separated scope parameter, defaulting to [`DEFAULT_SCOPE`]
pub fn parse_scope(scope: Option<&str>) -> Vec<String> {
    let scope: Vec<String> = scope
        .unwrap_or_default()
        .split_whitespace()
        .map(String::from)
        .collect();
    if scope.is_empty() {
        vec![DEFAULT_SCOPE.to_string()]
    } else {
        scope
    }
}

/// 24 random bytes, hex encoded
fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
