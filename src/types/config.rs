//! Configuration Types
//!
//! OAuth2 client configuration types.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OAuth2 client configuration.
#[derive(Clone, Debug)]
pub struct OAuth2Config {
    /// Token endpoint URL.
    pub token_endpoint: String,
    /// Client credentials sent with every grant request, if any.
    pub credentials: Option<ClientCredentials>,
    /// Scopes requested with the password grant.
    pub default_scopes: Vec<String>,
    /// HTTP timeout.
    pub timeout: Duration,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            token_endpoint: String::new(),
            credentials: None,
            default_scopes: Vec::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Client credentials for OAuth2 authentication.
#[derive(Clone)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: String,
    /// Client secret (for confidential clients).
    pub client_secret: Option<SecretString>,
    /// Client authentication method.
    pub auth_method: ClientAuthMethod,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("auth_method", &self.auth_method)
            .finish()
    }
}

/// Client authentication method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// client_id and client_secret in request body.
    ClientSecretPost,
    /// HTTP Basic Authentication header.
    #[default]
    ClientSecretBasic,
    /// client_id only, in the request body (public client).
    None,
}

/// Grant type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantType {
    #[serde(rename = "password")]
    Password,
    #[serde(rename = "refresh_token")]
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

/// Coordinator settings.
#[derive(Clone, Debug, Default)]
pub struct CoordinatorConfig {
    /// Treat tokens as expired this long before their actual expiry.
    pub expiry_leeway: Duration,
}

/// Default configuration values.
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;
