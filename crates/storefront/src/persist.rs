//! Persisted login and cart lines.
//!
//! State is stored as JSON under a fixed store name and version. A file
//! written under another name or version is ignored, not migrated.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cart::CartLine;
use crate::session::{Session, UserProfile};

/// Name under which state is persisted.
pub const STORE_NAME: &str = "orebi";

/// Current persisted-state version.
pub const STORE_VERSION: u32 = 1;

/// Errors reading or writing persisted state.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid persisted state: {0}")]
    Format(#[from] serde_json::Error),
}

/// Persisted login.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone, Serialize, Deserialize)]
pub struct PersistedLogin {
    pub token: String,
    pub user: UserProfile,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for PersistedLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedLogin")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .field("permissions", &self.permissions)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl From<&Session> for PersistedLogin {
    fn from(session: &Session) -> Self {
        Self {
            token: session.token.expose_secret().to_string(),
            user: session.user.clone(),
            permissions: session.permissions.clone(),
            expires_at: session.expires_at,
        }
    }
}

impl From<PersistedLogin> for Session {
    fn from(login: PersistedLogin) -> Self {
        Self {
            token: SecretString::from(login.token),
            user: login.user,
            permissions: login.permissions,
            expires_at: login.expires_at,
        }
    }
}

/// Everything that survives a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub key: String,
    pub version: u32,
    #[serde(default)]
    pub login: Option<PersistedLogin>,
    #[serde(default)]
    pub cart: Vec<CartLine>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            key: STORE_NAME.to_string(),
            version: STORE_VERSION,
            login: None,
            cart: Vec::new(),
        }
    }
}

impl PersistedState {
    /// Whether this state was written under the current name and version.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.key == STORE_NAME && self.version == STORE_VERSION
    }
}

/// Backing store for [`PersistedState`].
pub trait StateStorage: Send + Sync {
    /// Load state; `Ok(None)` when nothing usable has been stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn load(&self) -> Result<Option<PersistedState>, PersistError>;

    /// Replace the stored state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn save(&self, state: &PersistedState) -> Result<(), PersistError>;
}

/// Decode stored JSON, discarding foreign or outdated state.
fn decode(raw: &str) -> Result<Option<PersistedState>, PersistError> {
    let state: PersistedState = serde_json::from_str(raw)?;
    if state.is_current() {
        Ok(Some(state))
    } else {
        warn!(
            key = %state.key,
            version = state.version,
            "Ignoring persisted state from another store or version"
        );
        Ok(None)
    }
}

// =============================================================================
// FileStorage
// =============================================================================

/// JSON file storage with atomic replace.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedState>, PersistError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No persisted state");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };
        decode(&raw)
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "Persisted state written");
        Ok(())
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-memory storage holding the serialized JSON.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    raw: Mutex<Option<String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-loaded with raw JSON.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    /// The stored JSON, if any.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.raw
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StateStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedState>, PersistError> {
        match self.raw() {
            Some(raw) => decode(&raw),
            None => Ok(None),
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistError> {
        let json = serde_json::to_string(state)?;
        *self.raw.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
        Ok(())
    }
}
