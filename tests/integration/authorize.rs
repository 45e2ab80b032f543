//! Integration tests for the password grant

use super::*;
use oauth2_session::AccessTokenStorage;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::Mock;

#[tokio::test]
async fn test_authorize_with_valid_response() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("authorization", BASIC_CREDENTIALS))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=alice"))
        .and(body_string_contains("password=s3cret%21"))
        .respond_with(success_response(json!({
            "access_token": "foo",
            "token_type": "bar"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, storage) = test_client(&mock_server, None);
    assert!(!client.has_access_token());

    assert_ok!(client.authorize("alice", "s3cret!").await);

    assert!(client.has_access_token());
    assert!(storage.store_called());

    let stored = storage.stored_token().expect("token should be stored");
    assert_eq!(stored.secret(), "foo");
    assert_eq!(stored.token_type(), "bar");
    assert!(stored.expires_at().is_none());
    assert!(!stored.has_refresh_token());
}

#[tokio::test]
async fn test_authorize_sends_default_scopes() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("scope=read+write"))
        .respond_with(success_response(valid_token_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = oauth2_config()
        .token_endpoint(format!("{}{}", mock_server.uri(), TOKEN_PATH))
        .add_default_scope("read")
        .add_default_scope("write")
        .build()
        .unwrap();
    let client = oauth2_session::oauth2_client(config).unwrap();

    assert_ok!(client.authorize("alice", "password").await);
}

#[tokio::test]
async fn test_authorize_with_error_response() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(error_response(
            400,
            json!({
                "error": "invalid_client",
                "error_description": "Client authentication failed"
            }),
        ))
        .mount(&mock_server)
        .await;

    let (client, storage) = test_client(&mock_server, None);

    let err = assert_err!(client.authorize("alice", "password").await);
    assert_eq!(err.oauth_error_code(), Some("invalid_client"));
    assert!(!err.is_invalid_data());
    assert!(err.needs_reauth());

    assert!(!client.has_access_token());
    assert!(!storage.store_called());
}

#[tokio::test]
async fn test_authorize_passes_unknown_error_codes_through() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(error_response(401, json!({ "error": "account_locked" })))
        .mount(&mock_server)
        .await;

    let (client, _storage) = test_client(&mock_server, None);

    let err = assert_err!(client.authorize("alice", "password").await);
    assert_eq!(err.oauth_error_code(), Some("account_locked"));
}

#[tokio::test]
async fn test_authorize_with_invalid_response() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&mock_server)
        .await;

    let (client, storage) = test_client(&mock_server, None);

    let err = assert_err!(client.authorize("alice", "password").await);
    assert!(err.is_invalid_data());
    assert!(!client.has_access_token());
    assert!(!storage.store_called());
}

#[tokio::test]
async fn test_authorize_with_response_missing_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(success_response(json!({ "token_type": "bearer" })))
        .mount(&mock_server)
        .await;

    let (client, _storage) = test_client(&mock_server, None);

    let err = assert_err!(client.authorize("alice", "password").await);
    assert!(err.is_invalid_data());
    assert!(!client.has_access_token());
}

#[tokio::test]
async fn test_authorize_with_response_missing_type() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(success_response(json!({ "access_token": VALID_ACCESS_TOKEN })))
        .mount(&mock_server)
        .await;

    let (client, _storage) = test_client(&mock_server, None);

    let err = assert_err!(client.authorize("alice", "password").await);
    assert!(err.is_invalid_data());
    assert!(!client.has_access_token());
}

#[tokio::test]
async fn test_failed_authorize_keeps_previous_token() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(error_response(400, json!({ "error": "invalid_grant" })))
        .mount(&mock_server)
        .await;

    let (client, storage) = test_client(&mock_server, Some(valid_token()));

    assert_err!(client.authorize("alice", "wrong").await);

    let held = client.access_token().expect("token should be held");
    assert_eq!(held.secret(), VALID_ACCESS_TOKEN);
    assert!(!storage.store_called());
    assert_eq!(
        storage.retrieve_access_token().map(|t| t.secret().to_string()),
        Some(VALID_ACCESS_TOKEN.to_string())
    );
}

#[tokio::test]
async fn test_authorize_with_unreachable_endpoint() {
    let config = oauth2_config()
        .token_endpoint("http://127.0.0.1:1/oauth/token")
        .build()
        .unwrap();
    let client = oauth2_session::oauth2_client(config).unwrap();

    let err = assert_err!(client.authorize("alice", "password").await);
    assert!(matches!(err, oauth2_session::OAuth2Error::Network(_)));
    assert!(!client.has_access_token());
}
