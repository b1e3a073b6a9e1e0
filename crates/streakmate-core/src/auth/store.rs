//! Credential storage across two mutually exclusive persistence scopes.
//!
//! A live session's tokens and user snapshot reside in exactly one scope at a
//! time: `Durable` (a JSON file that survives restarts) or `Ephemeral`
//! (in-memory, gone when the process exits). Keeping the other scope empty is
//! the caller's responsibility - this layer is pure storage and validates
//! nothing about token contents.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::UserSnapshot;

/// Durable credentials file name in the data directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Scope preference file name in the data directory
const PREFERENCE_FILE: &str = "preference.json";

/// Persistence lifetime class for stored credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageScope {
    /// Survives application restarts (on-disk).
    Durable,
    /// Cleared when the process exits (in-memory).
    Ephemeral,
}

impl StorageScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageScope::Durable => "durable",
            StorageScope::Ephemeral => "ephemeral",
        }
    }

    /// The scope a session does NOT live in when it lives in `self`.
    pub fn other(&self) -> StorageScope {
        match self {
            StorageScope::Durable => StorageScope::Ephemeral,
            StorageScope::Ephemeral => StorageScope::Durable,
        }
    }
}

/// The order scopes are probed when locating a stored session.
/// Durable is checked before ephemeral; this ordering is a contract,
/// not an implementation detail.
pub const SCOPE_PROBE_ORDER: [StorageScope; 2] = [StorageScope::Durable, StorageScope::Ephemeral];

/// A short-lived access token and the longer-lived refresh token it pairs
/// with. Both are opaque strings to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Everything one scope can hold: at most one token pair and one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub tokens: Option<TokenPair>,
    pub user: Option<UserSnapshot>,
}

impl StoredCredentials {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_none() && self.user.is_none()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ScopePreference {
    preferred_scope: StorageScope,
}

/// Storage for tokens and the cached user snapshot, shared by the transport
/// layer, the startup restore path, and the auth facade.
pub struct CredentialStore {
    data_dir: PathBuf,
    ephemeral: Mutex<StoredCredentials>,
}

impl CredentialStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        Ok(Self {
            data_dir,
            ephemeral: Mutex::new(StoredCredentials::default()),
        })
    }

    /// Read whatever the given scope currently holds.
    pub fn read(&self, scope: StorageScope) -> Result<StoredCredentials> {
        match scope {
            StorageScope::Durable => self.load_durable(),
            StorageScope::Ephemeral => Ok(self.ephemeral_lock().clone()),
        }
    }

    /// Store a token pair and snapshot in the given scope, replacing whatever
    /// was there. The other scope is not touched.
    pub fn write(&self, scope: StorageScope, tokens: &TokenPair, user: &UserSnapshot) -> Result<()> {
        let record = StoredCredentials {
            tokens: Some(tokens.clone()),
            user: Some(user.clone()),
        };
        match scope {
            StorageScope::Durable => self.save_durable(&record),
            StorageScope::Ephemeral => {
                *self.ephemeral_lock() = record;
                Ok(())
            }
        }
    }

    /// Replace only the cached snapshot, keeping any stored tokens.
    pub fn write_user(&self, scope: StorageScope, user: &UserSnapshot) -> Result<()> {
        let mut record = self.read(scope)?;
        record.user = Some(user.clone());
        self.put(scope, record)
    }

    /// Replace only the token pair, keeping any cached snapshot.
    pub fn write_tokens(&self, scope: StorageScope, tokens: &TokenPair) -> Result<()> {
        let mut record = self.read(scope)?;
        record.tokens = Some(tokens.clone());
        self.put(scope, record)
    }

    /// Overwrite the access token in-place within the given scope. The scope's
    /// refresh token and snapshot are untouched; if the scope holds no tokens
    /// at all this is a no-op.
    pub fn replace_access_token(&self, scope: StorageScope, access_token: &str) -> Result<()> {
        let mut record = self.read(scope)?;
        match record.tokens.as_mut() {
            Some(tokens) => {
                tokens.access_token = access_token.to_string();
                self.put(scope, record)
            }
            None => {
                debug!(scope = scope.as_str(), "no tokens in scope, skipping access token update");
                Ok(())
            }
        }
    }

    /// Empty a single scope. Safe to call when nothing is stored.
    pub fn clear(&self, scope: StorageScope) -> Result<()> {
        match scope {
            StorageScope::Durable => {
                Self::remove_if_present(self.durable_path())?;
                Ok(())
            }
            StorageScope::Ephemeral => {
                *self.ephemeral_lock() = StoredCredentials::default();
                Ok(())
            }
        }
    }

    /// Empty both scopes and the scope preference. Idempotent.
    pub fn clear_all(&self) -> Result<()> {
        self.clear(StorageScope::Durable)?;
        self.clear(StorageScope::Ephemeral)?;
        Self::remove_if_present(self.preference_path())?;
        Ok(())
    }

    /// Find the scope currently holding a full token pair, probing in
    /// [`SCOPE_PROBE_ORDER`]. Unreadable scope data is treated as empty.
    pub fn locate(&self) -> Option<(StorageScope, TokenPair)> {
        for scope in SCOPE_PROBE_ORDER {
            let record = match self.read(scope) {
                Ok(record) => record,
                Err(e) => {
                    warn!(scope = scope.as_str(), error = %e, "failed to read credential scope");
                    continue;
                }
            };
            if let Some(tokens) = record.tokens {
                return Some((scope, tokens));
            }
        }
        None
    }

    /// Record which scope the user last chose at login. Independent of where
    /// data currently lives, so legacy data in the wrong scope can still be
    /// recognized.
    pub fn set_preferred_scope(&self, scope: StorageScope) -> Result<()> {
        let contents = serde_json::to_string_pretty(&ScopePreference {
            preferred_scope: scope,
        })?;
        std::fs::write(self.preference_path(), contents)
            .context("Failed to write scope preference")?;
        Ok(())
    }

    pub fn preferred_scope(&self) -> Option<StorageScope> {
        let path = self.preference_path();
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(&path).ok()?;
        let preference: ScopePreference = serde_json::from_str(&contents).ok()?;
        Some(preference.preferred_scope)
    }

    fn put(&self, scope: StorageScope, record: StoredCredentials) -> Result<()> {
        match scope {
            StorageScope::Durable => self.save_durable(&record),
            StorageScope::Ephemeral => {
                *self.ephemeral_lock() = record;
                Ok(())
            }
        }
    }

    fn load_durable(&self) -> Result<StoredCredentials> {
        let path = self.durable_path();
        if !path.exists() {
            return Ok(StoredCredentials::default());
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read credentials file")?;
        serde_json::from_str(&contents).context("Failed to parse credentials file")
    }

    fn save_durable(&self, record: &StoredCredentials) -> Result<()> {
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(self.durable_path(), contents)
            .context("Failed to write credentials file")?;
        Ok(())
    }

    fn remove_if_present(path: PathBuf) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    // Recover rather than panic if a previous holder panicked mid-update.
    fn ephemeral_lock(&self) -> MutexGuard<'_, StoredCredentials> {
        self.ephemeral.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn durable_path(&self) -> PathBuf {
        self.data_dir.join(CREDENTIALS_FILE)
    }

    fn preference_path(&self) -> PathBuf {
        self.data_dir.join(PREFERENCE_FILE)
    }
}

// ============================================================================
// Tests
// ============================================================================
