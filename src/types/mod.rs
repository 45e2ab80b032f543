//! OAuth2 Types
//!
//! Core type definitions for token grants and coordination.

pub mod config;
pub mod token;

pub use config::*;
pub use token::*;
