//! Token Types
//!
//! Access token value and its wire and storage representations.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{OAuth2Error, OAuth2Result};

/// Token endpoint success body.
///
/// Every field is optional here; [`AccessToken::from_response`] decides what
/// is required.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Token type (usually "bearer").
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds, relative to the time the response was received.
    ///
    /// Servers send integers, floats or numeric strings; see
    /// [`TokenResponse::expires_in_secs`].
    #[serde(default)]
    pub expires_in: Option<serde_json::Value>,
    /// Refresh token. Ignored unless it is a non-empty string.
    #[serde(default)]
    pub refresh_token: Option<serde_json::Value>,
    /// Granted scopes, as sent by the server.
    #[serde(default)]
    pub scope: Option<serde_json::Value>,
    /// Additional fields.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenResponse {
    /// `expires_in` as whole seconds, or `None` when absent or not numeric.
    pub fn expires_in_secs(&self) -> Option<i64> {
        match self.expires_in.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_secs)),
            serde_json::Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(float_secs))
            }
            _ => None,
        }
    }

    /// The refresh token, when it is a non-empty string.
    pub fn refresh_token_str(&self) -> Option<&str> {
        self.refresh_token
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .filter(|t| !t.is_empty())
    }
}

fn float_secs(secs: f64) -> Option<i64> {
    (secs.is_finite() && secs > i64::MIN as f64 && secs < i64::MAX as f64)
        .then(|| secs.trunc() as i64)
}

/// An issued credential.
///
/// Never holds an empty token or token type.
#[derive(Clone)]
pub struct AccessToken {
    token: SecretString,
    token_type: String,
    expires_at: Option<DateTime<Utc>>,
    refresh_token: Option<SecretString>,
}

impl AccessToken {
    /// Create a new access token, rejecting empty token or token type.
    pub fn new(
        token: impl Into<String>,
        token_type: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
        refresh_token: Option<String>,
    ) -> OAuth2Result<Self> {
        let token = token.into();
        let token_type = token_type.into();

        if token.is_empty() {
            return Err(OAuth2Error::invalid_data("access_token is empty"));
        }
        if token_type.is_empty() {
            return Err(OAuth2Error::invalid_data("token_type is empty"));
        }

        Ok(Self {
            token: SecretString::new(token),
            token_type,
            expires_at,
            refresh_token: refresh_token.map(SecretString::new),
        })
    }

    /// Parse a token endpoint payload, anchoring `expires_in` at the current time.
    pub fn parse(payload: &serde_json::Value) -> OAuth2Result<Self> {
        Self::parse_at(payload, Utc::now())
    }

    /// Parse a token endpoint payload, anchoring `expires_in` at `issued_at`.
    pub fn parse_at(payload: &serde_json::Value, issued_at: DateTime<Utc>) -> OAuth2Result<Self> {
        if !payload.is_object() {
            return Err(OAuth2Error::invalid_data("token payload is not a JSON object"));
        }

        let response = TokenResponse::deserialize(payload)
            .map_err(|e| OAuth2Error::invalid_data(e.to_string()))?;

        Self::from_response(response, issued_at)
    }

    /// Build from a decoded token response.
    ///
    /// Only `access_token` and `token_type` are required. An `expires_in`
    /// that is not numeric or does not fit a timestamp is treated as absent.
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> OAuth2Result<Self> {
        let expires_at = response
            .expires_in_secs()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime));
        let refresh_token = response.refresh_token_str().map(String::from);

        let token = response
            .access_token
            .ok_or_else(|| OAuth2Error::invalid_data("missing access_token"))?;
        let token_type = response
            .token_type
            .ok_or_else(|| OAuth2Error::invalid_data("missing token_type"))?;

        Self::new(token, token_type, expires_at, refresh_token)
    }

    /// Token value.
    pub fn secret(&self) -> &str {
        self.token.expose_secret()
    }

    /// Token type as issued.
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Whether the token type is `bearer`, ignoring case.
    pub fn is_bearer(&self) -> bool {
        self.token_type.eq_ignore_ascii_case("bearer")
    }

    /// Absolute expiry. `None` never expires.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Refresh token, if the server issued one.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|t| t.expose_secret().as_str())
    }

    /// Whether a refresh token is present.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Check if token is expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Format as Authorization header value.
    pub fn authorization_header_value(&self) -> String {
        format!("{} {}", self.token_type, self.token.expose_secret())
    }

    /// Keep `fallback` as the refresh token when this token carries none.
    pub fn or_refresh_token(mut self, fallback: Option<&str>) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = fallback.map(|t| SecretString::new(t.to_string()));
        }
        self
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.secret() == other.secret()
            && self.token_type == other.token_type
            && self.expires_at == other.expires_at
            && self.refresh_token() == other.refresh_token()
    }
}

impl Eq for AccessToken {}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Persisted token shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredTokens {
    /// Access token.
    pub access_token: String,
    /// Token type.
    pub token_type: String,
    /// Expiration time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When tokens were stored.
    pub stored_at: DateTime<Utc>,
}

impl From<&AccessToken> for StoredTokens {
    fn from(token: &AccessToken) -> Self {
        Self {
            access_token: token.secret().to_string(),
            token_type: token.token_type().to_string(),
            expires_at: token.expires_at(),
            refresh_token: token.refresh_token().map(String::from),
            stored_at: Utc::now(),
        }
    }
}

impl TryFrom<StoredTokens> for AccessToken {
    type Error = OAuth2Error;

    fn try_from(stored: StoredTokens) -> Result<Self, Self::Error> {
        AccessToken::new(
            stored.access_token,
            stored.token_type,
            stored.expires_at,
            stored.refresh_token,
        )
    }
}
