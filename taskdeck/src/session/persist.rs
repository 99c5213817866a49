//! Durable storage for the session token.
//!
//! Exactly one value is persisted: the bearer token, as a small JSON file
//! under the application's config directory. Storage failures are logged
//! and swallowed — a broken disk must not fail a login or logout, it only
//! costs session restoration on the next start.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk shape of the persisted entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredToken {
    token: String,
}

/// File-backed store for the single persisted session token.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Creates a store reading and writing the given path.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default token path: `<config_dir>/taskdeck/token.json`.
    ///
    /// Returns `None` when the platform config directory cannot be
    /// determined.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("taskdeck").join("token.json"))
    }

    /// Returns the path this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted token, if any.
    ///
    /// A missing file means no session to restore; unreadable or malformed
    /// files are logged and treated the same way.
    #[must_use]
    pub fn load(&self) -> Option<String> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), err = %e, "token read failed");
                return None;
            }
        };
        match serde_json::from_str::<StoredToken>(&contents) {
            Ok(stored) => Some(stored.token),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), err = %e, "token file malformed");
                None
            }
        }
    }

    /// Persists the token, replacing any previous entry.
    pub fn save(&self, token: &str) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), err = %e, "token dir create failed");
                return;
            }
        }
        let stored = StoredToken {
            token: token.to_string(),
        };
        let contents = match serde_json::to_string(&stored) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(err = %e, "token serialize failed");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, contents) {
            tracing::warn!(path = %self.path.display(), err = %e, "token write failed");
        }
    }

    /// Removes the persisted token. Missing file is not an error.
    pub fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), err = %e, "token remove failed");
            }
        }
    }
}
