//! Request Decoration
//!
//! Outgoing request types that can carry an `Authorization` header.

use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::core::HttpRequest;
use crate::error::{OAuth2Error, ProtocolError};

/// A request that can have its `Authorization` header set.
pub trait AuthorizableRequest: Send {
    /// Replace the `Authorization` header with `value`.
    fn set_authorization(&mut self, value: &str) -> Result<(), OAuth2Error>;
}

impl AuthorizableRequest for HttpRequest {
    fn set_authorization(&mut self, value: &str) -> Result<(), OAuth2Error> {
        self.headers
            .retain(|key, _| !key.eq_ignore_ascii_case("authorization"));
        self.headers
            .insert("authorization".to_string(), value.to_string());
        Ok(())
    }
}

impl AuthorizableRequest for reqwest::Request {
    fn set_authorization(&mut self, value: &str) -> Result<(), OAuth2Error> {
        let mut header = HeaderValue::from_str(value).map_err(|e| {
            OAuth2Error::Protocol(ProtocolError::InvalidHeaderValue {
                message: e.to_string(),
            })
        })?;
        header.set_sensitive(true);
        self.headers_mut().insert(AUTHORIZATION, header);
        Ok(())
    }
}
