//! Token Grants
//!
//! RFC 6749 Section 4.3 (Resource Owner Password Credentials) and Section 6
//! (Refreshing an Access Token).

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::error::{create_error_from_response, OAuth2Error, OAuth2Result};
use crate::types::{AccessToken, ClientAuthMethod, GrantType, OAuth2Config};

/// Issues grant requests against a token endpoint.
#[async_trait]
pub trait GrantClient: Send + Sync {
    /// Exchange resource owner credentials for a token.
    async fn request_password_grant(
        &self,
        username: &str,
        password: &str,
    ) -> OAuth2Result<AccessToken>;

    /// Exchange a refresh token for a new token.
    ///
    /// The returned token carries no refresh token when the server omitted one.
    async fn request_refresh_grant(&self, refresh_token: &str) -> OAuth2Result<AccessToken>;
}

#[async_trait]
impl<G: GrantClient + ?Sized> GrantClient for Arc<G> {
    async fn request_password_grant(
        &self,
        username: &str,
        password: &str,
    ) -> OAuth2Result<AccessToken> {
        (**self).request_password_grant(username, password).await
    }

    async fn request_refresh_grant(&self, refresh_token: &str) -> OAuth2Result<AccessToken> {
        (**self).request_refresh_grant(refresh_token).await
    }
}

/// Grant client speaking the token endpoint wire protocol.
pub struct OAuth2GrantClient<T: HttpTransport> {
    config: OAuth2Config,
    transport: Arc<T>,
}

impl<T: HttpTransport> OAuth2GrantClient<T> {
    /// Create new grant client.
    pub fn new(config: OAuth2Config, transport: Arc<T>) -> Self {
        Self { config, transport }
    }

    /// The configuration requests are built from.
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    fn build_request_body(&self, mut params: Vec<(&'static str, String)>) -> String {
        if let Some(credentials) = &self.config.credentials {
            match credentials.auth_method {
                ClientAuthMethod::ClientSecretPost => {
                    params.push(("client_id", credentials.client_id.clone()));
                    if let Some(secret) = &credentials.client_secret {
                        params.push(("client_secret", secret.expose_secret().to_string()));
                    }
                }
                ClientAuthMethod::None => {
                    params.push(("client_id", credentials.client_id.clone()));
                }
                ClientAuthMethod::ClientSecretBasic => {}
            }
        }

        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish()
    }

    fn build_request_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        headers.insert("accept".to_string(), "application/json".to_string());

        if let Some(credentials) = &self.config.credentials {
            if credentials.auth_method == ClientAuthMethod::ClientSecretBasic {
                if let Some(secret) = &credentials.client_secret {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(format!(
                        "{}:{}",
                        credentials.client_id,
                        secret.expose_secret()
                    ));
                    headers.insert("authorization".to_string(), format!("Basic {}", encoded));
                }
            }
        }

        headers
    }

    async fn request_token(
        &self,
        grant_type: GrantType,
        params: Vec<(&'static str, String)>,
    ) -> OAuth2Result<AccessToken> {
        let http_request = HttpRequest {
            method: HttpMethod::Post,
            url: self.config.token_endpoint.clone(),
            headers: self.build_request_headers(),
            body: Some(self.build_request_body(params)),
            timeout: Some(self.config.timeout),
        };

        let response = self.transport.send(http_request).await?;
        let result = decode_token_response(&response);

        match &result {
            Ok(_) => debug!(grant_type = grant_type.as_str(), "Token grant succeeded"),
            Err(e) => warn!(
                grant_type = grant_type.as_str(),
                status = response.status,
                error = %e,
                "Token grant failed"
            ),
        }

        result
    }
}

/// Decode a token endpoint response into a token or the error it carries.
pub fn decode_token_response(response: &HttpResponse) -> OAuth2Result<AccessToken> {
    if !response.is_success() {
        return Err(create_error_from_response(response.status, &response.body));
    }

    let payload: serde_json::Value = serde_json::from_str(&response.body)
        .map_err(|e| OAuth2Error::invalid_data(format!("undecodable token response: {}", e)))?;

    AccessToken::parse_at(&payload, Utc::now())
}

#[async_trait]
impl<T: HttpTransport> GrantClient for OAuth2GrantClient<T> {
    #[instrument(skip(self, password), fields(grant_type = "password"))]
    async fn request_password_grant(
        &self,
        username: &str,
        password: &str,
    ) -> OAuth2Result<AccessToken> {
        let mut params = vec![
            ("grant_type", GrantType::Password.as_str().to_string()),
            ("username", username.to_string()),
            ("password", password.to_string()),
        ];
        if !self.config.default_scopes.is_empty() {
            params.push(("scope", self.config.default_scopes.join(" ")));
        }

        self.request_token(GrantType::Password, params).await
    }

    #[instrument(skip_all, fields(grant_type = "refresh_token"))]
    async fn request_refresh_grant(&self, refresh_token: &str) -> OAuth2Result<AccessToken> {
        let params = vec![
            ("grant_type", GrantType::RefreshToken.as_str().to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];

        self.request_token(GrantType::RefreshToken, params).await
    }
}

/// Mock grant client for testing.
///
/// Results are queued per grant type. An empty queue yields a fresh bearer
/// token. An optional delay holds every call open so concurrent callers can
/// overlap.
#[derive(Default)]
pub struct MockGrantClient {
    password_results: Mutex<VecDeque<OAuth2Result<AccessToken>>>,
    refresh_results: Mutex<VecDeque<OAuth2Result<AccessToken>>>,
    password_history: Mutex<Vec<String>>,
    refresh_history: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl MockGrantClient {
    /// Create new mock grant client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next password grant.
    pub fn queue_password_result(&self, result: OAuth2Result<AccessToken>) -> &Self {
        self.password_results.lock().push_back(result);
        self
    }

    /// Queue the result of the next refresh grant.
    pub fn queue_refresh_result(&self, result: OAuth2Result<AccessToken>) -> &Self {
        self.refresh_results.lock().push_back(result);
        self
    }

    /// Delay every grant by `delay`.
    pub fn set_delay(&self, delay: Duration) -> &Self {
        *self.delay.lock() = Some(delay);
        self
    }

    /// Usernames passed to password grants.
    pub fn get_password_history(&self) -> Vec<String> {
        self.password_history.lock().clone()
    }

    /// Refresh tokens passed to refresh grants.
    pub fn get_refresh_history(&self) -> Vec<String> {
        self.refresh_history.lock().clone()
    }

    /// Total grants issued.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn default_token(prefix: &str, n: usize) -> OAuth2Result<AccessToken> {
        AccessToken::new(
            format!("{}-token-{}", prefix, n),
            "bearer",
            Some(Utc::now() + chrono::Duration::hours(1)),
            None,
        )
    }
}

#[async_trait]
impl GrantClient for MockGrantClient {
    async fn request_password_grant(
        &self,
        username: &str,
        _password: &str,
    ) -> OAuth2Result<AccessToken> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.password_history.lock().push(username.to_string());
        self.pause().await;

        let queued = self.password_results.lock().pop_front();
        queued.unwrap_or_else(|| Self::default_token("password", n))
    }

    async fn request_refresh_grant(&self, refresh_token: &str) -> OAuth2Result<AccessToken> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_history.lock().push(refresh_token.to_string());
        self.pause().await;

        let queued = self.refresh_results.lock().pop_front();
        queued.unwrap_or_else(|| Self::default_token("refreshed", n))
    }
}
