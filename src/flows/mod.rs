//! OAuth2 Flows
//!
//! Token grant implementations:
//!
//! - **Password Grant** (RFC 6749 Section 4.3): resource owner credentials for a token
//! - **Refresh Grant** (RFC 6749 Section 6): refresh token for a new token

pub mod grant;

pub use grant::{decode_token_response, GrantClient, MockGrantClient, OAuth2GrantClient};
