//! Integration tests using WireMock
//!
//! These tests drive the real reqwest transport against a mock token endpoint
//! and a mock protected API, covering the full grant, storage and request
//! decoration cycle.

mod authorize;
mod authorized_requests;

use std::sync::Arc;

use chrono::{Duration, Utc};
use oauth2_session::{oauth2_config, AccessToken, MockAccessTokenStorage, OAuth2Client, OAuth2Config};
use serde_json::json;
use wiremock::{MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/oauth/token";

pub const VALID_ACCESS_TOKEN: &str =
    "MTQzM2U3YTI3YmQyOWQ5YzQ0NjY4YTZkYjM0MjczYmZhNWI1M2YxM2Y1MjgwYTg3NDk3ZDc4ZGUzM2YxZmJjZQ";

/// `Basic` credentials for `test-client:test-secret`.
pub const BASIC_CREDENTIALS: &str = "Basic dGVzdC1jbGllbnQ6dGVzdC1zZWNyZXQ=";

/// Helper to start a mock server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Configuration pointing at the mock server's token endpoint.
pub fn test_config(server: &MockServer) -> OAuth2Config {
    oauth2_config()
        .token_endpoint(format!("{}{}", server.uri(), TOKEN_PATH))
        .client_id("test-client")
        .client_secret("test-secret")
        .build()
        .expect("Failed to build config")
}

/// Client over mock storage preloaded with `token`.
pub fn test_client(
    server: &MockServer,
    token: Option<AccessToken>,
) -> (OAuth2Client<MockAccessTokenStorage>, Arc<MockAccessTokenStorage>) {
    let storage = Arc::new(MockAccessTokenStorage::new());
    storage.set_mocked_token(token);

    let client = OAuth2Client::new(test_config(server), storage.clone())
        .expect("Failed to build client");
    (client, storage)
}

pub fn valid_token() -> AccessToken {
    AccessToken::new(
        VALID_ACCESS_TOKEN,
        "bearer",
        Some(Utc::now() + Duration::hours(1)),
        None,
    )
    .unwrap()
}

pub fn expired_token(refresh_token: Option<&str>) -> AccessToken {
    AccessToken::new(
        "expired-access-token",
        "bearer",
        Some(Utc::now() - Duration::minutes(5)),
        refresh_token.map(String::from),
    )
    .unwrap()
}

/// Helper to create success response templates
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Helper to create error response templates
pub fn error_response(status: u16, error_body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(error_body)
}

/// A refreshed-token body carrying the well-known valid access token.
pub fn valid_token_body() -> serde_json::Value {
    json!({
        "access_token": VALID_ACCESS_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "next-refresh-token"
    })
}

pub fn api_request(server: &MockServer) -> reqwest::Request {
    reqwest::Client::new()
        .get(format!("{}/api/me", server.uri()))
        .build()
        .expect("Failed to build request")
}
