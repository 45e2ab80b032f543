//! Token Management
//!
//! This module provides:
//!
//! - **Token Storage**: Durable mirrors for the current access token
//! - **Token Coordinator**: Token lifecycle with single-flight refresh

pub mod coordinator;
pub mod storage;

// Token Storage
pub use storage::{
    AccessTokenStorage, FileAccessTokenStorage, InMemoryAccessTokenStorage,
    MockAccessTokenStorage,
};

// Token Coordinator
pub use coordinator::TokenCoordinator;
