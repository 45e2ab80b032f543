//! Token Storage
//!
//! Durable mirrors for the coordinator's current access token.

use parking_lot::Mutex;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::types::{AccessToken, StoredTokens};

/// Persists the current access token.
///
/// Failures are the backend's concern; callers treat both operations as
/// always succeeding.
pub trait AccessTokenStorage: Send + Sync {
    /// Store the token, or clear storage with `None`.
    fn store_access_token(&self, token: Option<&AccessToken>);

    /// Last stored token. Has no side effects.
    fn retrieve_access_token(&self) -> Option<AccessToken>;
}

/// In-memory token storage implementation.
#[derive(Default)]
pub struct InMemoryAccessTokenStorage {
    token: Mutex<Option<AccessToken>>,
}

impl InMemoryAccessTokenStorage {
    /// Create new in-memory token storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-populated with `token`.
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl AccessTokenStorage for InMemoryAccessTokenStorage {
    fn store_access_token(&self, token: Option<&AccessToken>) {
        *self.token.lock() = token.cloned();
    }

    fn retrieve_access_token(&self) -> Option<AccessToken> {
        self.token.lock().clone()
    }
}

/// JSON file token storage.
///
/// The file is readable by its owner only. A missing, unreadable or corrupt
/// file reads as no token.
///
/// Reads and writes are small blocking file operations. The coordinator calls
/// `store_access_token` outside its token state lock, so a slow disk delays
/// only the committing caller.
pub struct FileAccessTokenStorage {
    path: PathBuf,
}

impl FileAccessTokenStorage {
    /// Create storage backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, token: &AccessToken) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(&StoredTokens::from(token))?;

        let parent = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        // The temp file is created owner-only (0600 on unix) and renamed into
        // place, so the token is never readable by others or half-written.
        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(&json)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn read(&self) -> Option<AccessToken> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read token file");
                return None;
            }
        };

        let stored: StoredTokens = match serde_json::from_slice(&bytes) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt token file");
                return None;
            }
        };

        AccessToken::try_from(stored)
            .map_err(|e| warn!(path = %self.path.display(), error = %e, "Invalid stored token"))
            .ok()
    }
}

impl AccessTokenStorage for FileAccessTokenStorage {
    fn store_access_token(&self, token: Option<&AccessToken>) {
        let result = match token {
            Some(token) => self.write(token),
            None => match fs::remove_file(&self.path) {
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };

        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to persist token");
        }
    }

    fn retrieve_access_token(&self) -> Option<AccessToken> {
        self.read()
    }
}

/// Mock token storage for testing.
///
/// A mocked token, when set, shadows whatever was stored.
#[derive(Default)]
pub struct MockAccessTokenStorage {
    mocked: Mutex<Option<AccessToken>>,
    stored: Mutex<Option<AccessToken>>,
    store_history: Mutex<Vec<Option<AccessToken>>>,
}

impl MockAccessTokenStorage {
    /// Create new mock token storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token `retrieve_access_token` reports regardless of stores.
    pub fn set_mocked_token(&self, token: Option<AccessToken>) -> &Self {
        *self.mocked.lock() = token;
        self
    }

    /// Last value passed to `store_access_token`.
    pub fn stored_token(&self) -> Option<AccessToken> {
        self.stored.lock().clone()
    }

    /// Whether `store_access_token` was ever called.
    pub fn store_called(&self) -> bool {
        !self.store_history.lock().is_empty()
    }

    /// Every value passed to `store_access_token`, in order.
    pub fn get_store_history(&self) -> Vec<Option<AccessToken>> {
        self.store_history.lock().clone()
    }
}

impl AccessTokenStorage for MockAccessTokenStorage {
    fn store_access_token(&self, token: Option<&AccessToken>) {
        self.store_history.lock().push(token.cloned());
        *self.stored.lock() = token.cloned();
    }

    fn retrieve_access_token(&self) -> Option<AccessToken> {
        self.mocked
            .lock()
            .clone()
            .or_else(|| self.stored.lock().clone())
    }
}
