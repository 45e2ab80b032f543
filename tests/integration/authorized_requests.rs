//! Integration tests for request authorization and refresh

use super::*;
use futures::future::join_all;
use oauth2_session::AccessTokenStorage;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::Mock;

const EXPECTED_HEADER: &str =
    "bearer MTQzM2U3YTI3YmQyOWQ5YzQ0NjY4YTZkYjM0MjczYmZhNWI1M2YxM2Y1MjgwYTg3NDk3ZDc4ZGUzM2YxZmJjZQ";

fn authorization(request: &reqwest::Request) -> Option<&str> {
    request
        .headers()
        .get(reqwest::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_loads_token_from_storage() {
    let mock_server = setup_mock_server().await;
    let (client, _storage) = test_client(&mock_server, Some(valid_token()));

    assert!(client.has_access_token());
}

#[tokio::test]
async fn test_request_when_not_authorized() {
    let mock_server = setup_mock_server().await;
    let (client, _storage) = test_client(&mock_server, None);

    let err = assert_err!(client.authorize_request(api_request(&mock_server)).await);
    assert!(err.is_not_authorized());
}

#[tokio::test]
async fn test_request_with_valid_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(success_response(valid_token_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (client, _storage) = test_client(&mock_server, Some(valid_token()));

    let request = assert_ok!(client.authorize_request(api_request(&mock_server)).await);
    assert_eq!(authorization(&request), Some(EXPECTED_HEADER));
}

#[tokio::test]
async fn test_request_with_expired_token_and_no_refresh_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(success_response(valid_token_body()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (client, storage) = test_client(&mock_server, Some(expired_token(None)));

    let err = assert_err!(client.authorize_request(api_request(&mock_server)).await);
    assert!(err.is_not_authorized());
    assert!(!storage.store_called());
}

#[tokio::test]
async fn test_request_with_expired_token_and_valid_refresh_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("authorization", BASIC_CREDENTIALS))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(success_response(valid_token_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, storage) = test_client(&mock_server, Some(expired_token(Some("refresh-1"))));

    let request = assert_ok!(client.authorize_request(api_request(&mock_server)).await);
    assert_eq!(authorization(&request), Some(EXPECTED_HEADER));

    let stored = storage.stored_token().expect("refreshed token should be stored");
    assert_eq!(stored.secret(), VALID_ACCESS_TOKEN);
    assert_eq!(stored.refresh_token(), Some("next-refresh-token"));
}

#[tokio::test]
async fn test_refresh_without_rotation_keeps_refresh_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(success_response(json!({
            "access_token": VALID_ACCESS_TOKEN,
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _storage) = test_client(&mock_server, Some(expired_token(Some("refresh-1"))));

    assert_ok!(client.authorize_request(api_request(&mock_server)).await);

    let held = client.access_token().expect("token should be held");
    assert_eq!(held.refresh_token(), Some("refresh-1"));
}

#[tokio::test]
async fn test_failed_refresh_keeps_expired_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(error_response(400, json!({ "error": "invalid_grant" })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (client, storage) = test_client(&mock_server, Some(expired_token(Some("refresh-1"))));

    let err = assert_err!(client.authorize_request(api_request(&mock_server)).await);
    assert_eq!(err.oauth_error_code(), Some("invalid_grant"));
    assert!(!storage.store_called());

    // The next request retries with the same refresh token.
    assert_err!(client.authorize_request(api_request(&mock_server)).await);
    assert_eq!(
        client.access_token().map(|t| t.secret().to_string()),
        Some("expired-access-token".to_string())
    );
}

#[tokio::test]
async fn test_concurrent_requests_share_one_refresh() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(
            success_response(valid_token_body())
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, storage) = test_client(&mock_server, Some(expired_token(Some("refresh-1"))));

    let results = join_all((0..5).map(|_| client.authorize_request(api_request(&mock_server)))).await;

    for result in results {
        let request = assert_ok!(result);
        assert_eq!(authorization(&request), Some(EXPECTED_HEADER));
    }
    assert_eq!(storage.get_store_history().len(), 1);
}

#[tokio::test]
async fn test_execute_sends_authorized_request() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", EXPECTED_HEADER))
        .respond_with(success_response(json!({ "name": "alice" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _storage) = test_client(&mock_server, Some(valid_token()));

    let response = assert_ok!(client.execute(api_request(&mock_server)).await);
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_execute_fails_closed_when_not_authorized() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(success_response(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (client, _storage) = test_client(&mock_server, Some(expired_token(None)));

    let err = assert_err!(client.execute(api_request(&mock_server)).await);
    assert!(err.is_not_authorized());
}

#[tokio::test]
async fn test_deauthorize_clears_token_and_storage() {
    let mock_server = setup_mock_server().await;
    let (client, storage) = test_client(&mock_server, None);

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(success_response(valid_token_body()))
        .mount(&mock_server)
        .await;

    assert_ok!(client.authorize("alice", "password").await);
    assert!(client.has_access_token());

    client.deauthorize();

    assert!(!client.has_access_token());
    assert_eq!(storage.get_store_history().last(), Some(&None));
    assert!(storage.retrieve_access_token().is_none());
}
