//! OAuth2 Client
//!
//! High-level client that wires the reqwest transport, the grant client and
//! the token coordinator together and dispatches authorized requests.

use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::core::{map_reqwest_error, ReqwestHttpTransport, DEFAULT_MAX_RESPONSE_SIZE};
use crate::error::{NetworkError, OAuth2Error};
use crate::flows::OAuth2GrantClient;
use crate::telemetry::{NoOpMetrics, OAuth2Metrics};
use crate::token::{AccessTokenStorage, InMemoryAccessTokenStorage, TokenCoordinator};
use crate::types::{AccessToken, CoordinatorConfig, OAuth2Config};

/// Coordinator type used by [`OAuth2Client`].
pub type ClientCoordinator<S> = TokenCoordinator<OAuth2GrantClient<ReqwestHttpTransport>, S>;

/// OAuth2 client for a password-grant protected API.
pub struct OAuth2Client<S: AccessTokenStorage + ?Sized = InMemoryAccessTokenStorage> {
    coordinator: ClientCoordinator<S>,
    http: reqwest::Client,
    timeout: Duration,
}

impl<S: AccessTokenStorage + ?Sized + 'static> OAuth2Client<S> {
    /// Create a client, loading any persisted token from `storage`.
    pub fn new(config: OAuth2Config, storage: Arc<S>) -> Result<Self, OAuth2Error> {
        Self::with_components(
            config,
            CoordinatorConfig::default(),
            storage,
            Arc::new(NoOpMetrics),
        )
    }

    /// Create a client with explicit coordinator settings and metrics sink.
    pub fn with_components(
        config: OAuth2Config,
        coordinator_config: CoordinatorConfig,
        storage: Arc<S>,
        metrics: Arc<dyn OAuth2Metrics>,
    ) -> Result<Self, OAuth2Error> {
        let timeout = config.timeout;
        let transport = Arc::new(ReqwestHttpTransport::with_options(
            timeout,
            DEFAULT_MAX_RESPONSE_SIZE,
        )?);
        let grant_client = OAuth2GrantClient::new(config, transport);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                OAuth2Error::Network(NetworkError::RequestFailed {
                    message: e.to_string(),
                })
            })?;

        Ok(Self {
            coordinator: TokenCoordinator::with_components(
                coordinator_config,
                grant_client,
                storage,
                metrics,
            ),
            http,
            timeout,
        })
    }

    /// The underlying token coordinator.
    pub fn coordinator(&self) -> &ClientCoordinator<S> {
        &self.coordinator
    }

    /// Obtain a token with the password grant.
    pub async fn authorize(&self, username: &str, password: &str) -> Result<(), OAuth2Error> {
        self.coordinator.authorize(username, password).await
    }

    /// Drop the held token and clear storage.
    pub fn deauthorize(&self) {
        self.coordinator.deauthorize()
    }

    /// Whether a token is held. Expiry is not considered.
    pub fn has_access_token(&self) -> bool {
        self.coordinator.has_access_token()
    }

    /// The token currently held, if any.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.coordinator.access_token()
    }

    /// Add the `Authorization` header to `request`, refreshing first if needed.
    pub async fn authorize_request(
        &self,
        request: reqwest::Request,
    ) -> Result<reqwest::Request, OAuth2Error> {
        self.coordinator.authorize_request(request).await
    }

    /// Authorize and send `request`.
    ///
    /// Nothing is sent when authorization fails.
    #[instrument(skip(self, request), fields(method = %request.method(), url = %request.url()))]
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response, OAuth2Error> {
        let request = self.authorize_request(request).await?;
        self.http
            .execute(request)
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))
    }
}

/// Create a client backed by in-memory token storage.
pub fn oauth2_client(config: OAuth2Config) -> Result<OAuth2Client, OAuth2Error> {
    OAuth2Client::new(config, Arc::new(InMemoryAccessTokenStorage::new()))
}
