//! OAuth2 Core Components
//!
//! HTTP transport and request decoration.

pub mod request;
pub mod transport;

pub use request::*;
pub use transport::*;
