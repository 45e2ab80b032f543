//! OAuth2 Session Module
//!
//! Client-side OAuth2 token lifecycle: obtain an access token with the
//! resource owner password grant, persist it, attach it to outgoing
//! requests and refresh it transparently when it expires.
//!
//! # Features
//!
//! - Resource Owner Password Credentials Grant (RFC 6749 Section 4.3)
//! - Token Refresh (RFC 6749 Section 6), coalesced across concurrent callers
//! - Pluggable token storage (in-memory, JSON file, mock)
//! - Request decoration for `reqwest::Request` and the crate's `HttpRequest`
//!
//! # Example
//!
//! ```rust,ignore
//! use oauth2_session::{oauth2_config, FileAccessTokenStorage, OAuth2Client};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = oauth2_config()
//!         .token_endpoint("https://provider.com/oauth/token")
//!         .client_id("my-client-id")
//!         .client_secret("my-client-secret")
//!         .build()?;
//!
//!     let storage = Arc::new(FileAccessTokenStorage::new("token.json"));
//!     let client = OAuth2Client::new(config, storage)?;
//!
//!     if !client.has_access_token() {
//!         client.authorize("user", "password").await?;
//!     }
//!
//!     let request = reqwest::Client::new()
//!         .get("https://api.provider.com/me")
//!         .build()?;
//!     let response = client.execute(request).await?;
//!     println!("Status: {}", response.status());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: Access token and configuration types
//! - `error`: Error hierarchy with token endpoint error mapping
//! - `core`: HTTP transport and request decoration
//! - `flows`: Password and refresh grant requests
//! - `token`: Token storage and the token coordinator
//! - `telemetry`: Metrics sink
//! - `builders`: Fluent builders for configuration
//! - `client`: High-level client combining all of the above

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{oauth2_client, ClientCoordinator, OAuth2Client};

// Re-export builders
pub use builders::{oauth2_config, OAuth2ConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, get_user_message, map_token_error, parse_error_response,
    AuthorizationError, ConfigurationError, NetworkError, OAuth2Error, OAuth2ErrorResponse,
    OAuth2Result, ProtocolError, ProviderError,
};

// Re-export types
pub use types::{
    // Config
    ClientAuthMethod, ClientCredentials, CoordinatorConfig, GrantType, OAuth2Config,
    // Token
    AccessToken, StoredTokens, TokenResponse,
};

// Re-export core components
pub use core::{
    // Request decoration
    AuthorizableRequest,
    // Transport
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
};

// Re-export flows
pub use flows::{decode_token_response, GrantClient, MockGrantClient, OAuth2GrantClient};

// Re-export token management
pub use token::{
    // Storage
    AccessTokenStorage, FileAccessTokenStorage, InMemoryAccessTokenStorage,
    MockAccessTokenStorage,
    // Coordinator
    TokenCoordinator,
};

// Re-export telemetry
pub use telemetry::{
    create_in_memory_metrics, no_op_metrics, InMemoryMetrics, MetricEntry, MetricLabels,
    NoOpMetrics, OAuth2Metrics,
};
