//! OAuth2 Error Types
//!
//! Error hierarchy for grant requests and token coordination.

use std::time::Duration;
use thiserror::Error;

/// Root error type.
///
/// Every variant is `Clone` so a single refresh failure can be handed to
/// every caller waiting on it.
#[derive(Error, Debug, Clone)]
pub enum OAuth2Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl OAuth2Error {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "OAUTH2_CONFIG",
            Self::Authorization(_) => "OAUTH2_NOT_AUTHORIZED",
            Self::Network(_) => "OAUTH2_NETWORK",
            Self::Protocol(_) => "OAUTH2_PROTOCOL",
            Self::Provider(_) => "OAUTH2_PROVIDER",
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_retryable(),
            Self::Provider(ProviderError::ServerError { .. }) => true,
            Self::Provider(ProviderError::TemporarilyUnavailable { .. }) => true,
            _ => false,
        }
    }

    /// Check if error requires the user to supply credentials again.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            Self::Authorization(_)
                | Self::Provider(ProviderError::InvalidGrant { .. })
                | Self::Provider(ProviderError::InvalidClient { .. })
        )
    }

    /// No usable token is held and none can be obtained without credentials.
    pub fn is_not_authorized(&self) -> bool {
        matches!(self, Self::Authorization(_))
    }

    /// A grant response was missing required fields or could not be decoded.
    pub fn is_invalid_data(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::InvalidData { .. }))
    }

    /// The `error` code reported by the authorization server, verbatim.
    pub fn oauth_error_code(&self) -> Option<&str> {
        match self {
            Self::Provider(e) => Some(e.code()),
            _ => None,
        }
    }

    pub(crate) fn invalid_data(message: impl Into<String>) -> Self {
        Self::Protocol(ProtocolError::InvalidData {
            message: message.into(),
        })
    }
}

/// Configuration error.
#[derive(Error, Debug, Clone)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },
}

/// Raised when a request cannot be authorized with the token on hand.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Not authorized: no access token available")]
    NoAccessToken,

    #[error("Not authorized: access token expired and no refresh token is available")]
    AccessTokenExpired,
}

/// Network/transport error.
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Request failed: {message}")]
    RequestFailed { message: String },
}

impl NetworkError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout { .. })
    }
}

/// Protocol/response decoding error.
#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    #[error("Invalid header value: {message}")]
    InvalidHeaderValue { message: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },
}

/// Error reported by the authorization server (RFC 6749 Section 5.2).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Invalid request: {}", .description.as_deref().unwrap_or("invalid_request"))]
    InvalidRequest { description: Option<String> },

    #[error("Invalid client credentials")]
    InvalidClient { description: Option<String> },

    #[error("Invalid grant: {}", .description.as_deref().unwrap_or("invalid_grant"))]
    InvalidGrant { description: Option<String> },

    #[error("Unauthorized client for this grant type")]
    UnauthorizedClient { description: Option<String> },

    #[error("Unsupported grant type")]
    UnsupportedGrantType { description: Option<String> },

    #[error("Invalid scope")]
    InvalidScope { description: Option<String> },

    #[error("Server error")]
    ServerError { description: Option<String> },

    #[error("Server temporarily unavailable")]
    TemporarilyUnavailable { description: Option<String> },

    #[error("OAuth2 error: {code}")]
    Other {
        code: String,
        description: Option<String>,
    },
}

impl ProviderError {
    /// The wire `error` code this variant was decoded from.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidRequest { .. } => "invalid_request",
            Self::InvalidClient { .. } => "invalid_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::UnauthorizedClient { .. } => "unauthorized_client",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::ServerError { .. } => "server_error",
            Self::TemporarilyUnavailable { .. } => "temporarily_unavailable",
            Self::Other { code, .. } => code,
        }
    }

    /// Human readable `error_description`, if the server sent one.
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::InvalidRequest { description }
            | Self::InvalidClient { description }
            | Self::InvalidGrant { description }
            | Self::UnauthorizedClient { description }
            | Self::UnsupportedGrantType { description }
            | Self::InvalidScope { description }
            | Self::ServerError { description }
            | Self::TemporarilyUnavailable { description }
            | Self::Other { description, .. } => description.as_deref(),
        }
    }
}

/// Result type for OAuth2 operations.
pub type OAuth2Result<T> = Result<T, OAuth2Error>;

/// OAuth2 error response from provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct OAuth2ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub error_uri: Option<String>,
}

/// Map token endpoint error response to error type.
pub fn map_token_error(response: &OAuth2ErrorResponse) -> ProviderError {
    let description = response.error_description.clone();
    match response.error.as_str() {
        "invalid_request" => ProviderError::InvalidRequest { description },
        "invalid_client" => ProviderError::InvalidClient { description },
        "invalid_grant" => ProviderError::InvalidGrant { description },
        "unauthorized_client" => ProviderError::UnauthorizedClient { description },
        "unsupported_grant_type" => ProviderError::UnsupportedGrantType { description },
        "invalid_scope" => ProviderError::InvalidScope { description },
        "server_error" => ProviderError::ServerError { description },
        "temporarily_unavailable" => ProviderError::TemporarilyUnavailable { description },
        other => ProviderError::Other {
            code: other.to_string(),
            description,
        },
    }
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<OAuth2ErrorResponse> {
    serde_json::from_str::<OAuth2ErrorResponse>(body)
        .ok()
        .filter(|response| !response.error.is_empty())
}

/// Create error from a non-success HTTP response.
///
/// Without a decodable `error` field there is no code to pass through, so the
/// response is reported as invalid data.
pub fn create_error_from_response(status: u16, body: &str) -> OAuth2Error {
    match parse_error_response(body) {
        Some(response) => OAuth2Error::Provider(map_token_error(&response)),
        None => OAuth2Error::invalid_data(format!(
            "HTTP {} with undecodable error body",
            status
        )),
    }
}

/// Get user-friendly error message.
pub fn get_user_message(error: &OAuth2Error) -> String {
    match error {
        OAuth2Error::Authorization(AuthorizationError::NoAccessToken) => {
            "You are not signed in. Please sign in to continue.".to_string()
        }
        OAuth2Error::Authorization(AuthorizationError::AccessTokenExpired) => {
            "Your session has expired. Please sign in again.".to_string()
        }
        OAuth2Error::Provider(ProviderError::InvalidGrant { .. }) => {
            "The supplied credentials were rejected. Please sign in again.".to_string()
        }
        OAuth2Error::Network(NetworkError::Timeout { .. }) => {
            "The request timed out. Please check your connection and try again.".to_string()
        }
        OAuth2Error::Provider(ProviderError::ServerError { .. })
        | OAuth2Error::Provider(ProviderError::TemporarilyUnavailable { .. }) => {
            "The authentication service is temporarily unavailable. Please try again later."
                .to_string()
        }
        _ => "An authentication error occurred. Please try again.".to_string(),
    }
}
