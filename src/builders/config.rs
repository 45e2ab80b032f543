//! Configuration Builder
//!
//! Fluent builder for OAuth2 configuration.

use secrecy::SecretString;
use std::time::Duration;
use url::Url;

use crate::error::{ConfigurationError, OAuth2Error};
use crate::types::{ClientAuthMethod, ClientCredentials, OAuth2Config, DEFAULT_TIMEOUT_MS};

/// OAuth2 configuration builder.
#[derive(Default)]
pub struct OAuth2ConfigBuilder {
    token_endpoint: Option<String>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    auth_method: Option<ClientAuthMethod>,
    default_scopes: Vec<String>,
    timeout: Option<Duration>,
}

impl OAuth2ConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from `OAUTH2_*` environment variables.
    ///
    /// Unset variables leave the corresponding field unset; an unparsable
    /// `OAUTH2_TIMEOUT_SECS` falls back to the default timeout.
    pub fn from_env() -> Self {
        let mut builder = Self::new();

        if let Ok(endpoint) = std::env::var("OAUTH2_TOKEN_ENDPOINT") {
            builder = builder.token_endpoint(endpoint);
        }
        if let Ok(client_id) = std::env::var("OAUTH2_CLIENT_ID") {
            builder = builder.client_id(client_id);
        }
        if let Ok(secret) = std::env::var("OAUTH2_CLIENT_SECRET") {
            builder = builder.client_secret(secret);
        }
        if let Ok(scopes) = std::env::var("OAUTH2_SCOPES") {
            builder = builder.default_scopes(scopes.split_whitespace().map(String::from).collect());
        }

        builder.timeout = std::env::var("OAUTH2_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs);

        builder
    }

    /// Set token endpoint.
    pub fn token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = Some(endpoint.into());
        self
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set client authentication method.
    pub fn auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.auth_method = Some(method);
        self
    }

    /// Set default scopes.
    pub fn default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Add a default scope.
    pub fn add_default_scope(mut self, scope: impl Into<String>) -> Self {
        self.default_scopes.push(scope.into());
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the OAuth2 configuration.
    pub fn build(self) -> Result<OAuth2Config, OAuth2Error> {
        let token_endpoint = self.token_endpoint.ok_or_else(|| {
            OAuth2Error::Configuration(ConfigurationError::MissingRequired {
                field: "token_endpoint".to_string(),
            })
        })?;

        match Url::parse(&token_endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(OAuth2Error::Configuration(
                    ConfigurationError::InvalidEndpoint {
                        url: token_endpoint,
                    },
                ))
            }
        }

        let credentials = match self.client_id {
            Some(client_id) => {
                let auth_method = self.auth_method.unwrap_or_default();

                // Validate: if auth method requires secret, ensure it's provided
                if matches!(
                    auth_method,
                    ClientAuthMethod::ClientSecretBasic | ClientAuthMethod::ClientSecretPost
                ) && self.client_secret.is_none()
                {
                    return Err(OAuth2Error::Configuration(
                        ConfigurationError::MissingRequired {
                            field: "client_secret".to_string(),
                        },
                    ));
                }

                Some(ClientCredentials {
                    client_id,
                    client_secret: self.client_secret,
                    auth_method,
                })
            }
            None if self.client_secret.is_some() => {
                return Err(OAuth2Error::Configuration(
                    ConfigurationError::MissingRequired {
                        field: "client_id".to_string(),
                    },
                ));
            }
            None => None,
        };

        Ok(OAuth2Config {
            token_endpoint,
            credentials,
            default_scopes: self.default_scopes,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
        })
    }
}

/// Create a new OAuth2 configuration builder.
pub fn oauth2_config() -> OAuth2ConfigBuilder {
    OAuth2ConfigBuilder::new()
}
