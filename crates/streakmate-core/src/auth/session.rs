//! Session state and the startup restore sequence.
//!
//! `restore_session` runs once when the application starts. It locates stored
//! tokens (durable scope before ephemeral), validates them against the server,
//! refreshes once if the access token is rejected, and falls back to a
//! degraded session backed by the cached snapshot when the server cannot be
//! reached. Consumers must not branch on authentication while the state is
//! still `Loading`.

use tracing::{debug, info, warn};

use crate::api::backend::AuthApi;
use crate::api::ApiError;
use crate::auth::store::{CredentialStore, StorageScope, TokenPair};
use crate::models::UserSnapshot;

/// The application's authentication state, owned exclusively by the auth
/// facade.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Startup restore has not finished yet.
    Loading,
    Unauthenticated,
    /// Identity confirmed by the server.
    Authenticated(UserSnapshot),
    /// Cached identity served without server confirmation (refresh failed or
    /// the backend was unreachable).
    Degraded(UserSnapshot),
}

impl SessionState {
    /// Whether the UI may present the user as logged in. Includes degraded
    /// sessions, which are authenticated-for-UI-purposes but unverified.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_) | SessionState::Degraded(_))
    }

    pub fn user(&self) -> Option<&UserSnapshot> {
        match self {
            SessionState::Authenticated(user) | SessionState::Degraded(user) => Some(user),
            _ => None,
        }
    }
}

/// Resolve the stored credentials into a terminal session state.
///
/// Issues no network calls at all when nothing is stored.
pub(crate) async fn restore_session<B>(backend: &B, store: &CredentialStore) -> SessionState
where
    B: AuthApi + ?Sized,
{
    let Some((scope, tokens)) = store.locate() else {
        debug!("no stored tokens, starting unauthenticated");
        return SessionState::Unauthenticated;
    };

    match backend.fetch_identity(&tokens.access_token).await {
        Ok(user) => {
            write_back(store, scope, &user);
            info!(scope = scope.as_str(), "session restored");
            return SessionState::Authenticated(user);
        }
        Err(ApiError::Unauthorized) => {
            debug!("stored access token rejected, attempting refresh");
            if let Some(user) = refresh_and_retry(backend, store, scope, &tokens).await {
                info!(scope = scope.as_str(), "session restored after token refresh");
                return SessionState::Authenticated(user);
            }
        }
        Err(e) => {
            // Unreachable backend or server fault: don't burn the refresh
            // token, go straight to the cached snapshot.
            debug!(error = %e, "identity fetch failed during session restore");
        }
    }

    degrade_or_reset(store, scope)
}

/// One refresh attempt followed by one identity re-fetch. `None` means the
/// caller should fall back to the cached snapshot.
async fn refresh_and_retry<B>(
    backend: &B,
    store: &CredentialStore,
    scope: StorageScope,
    tokens: &TokenPair,
) -> Option<UserSnapshot>
where
    B: AuthApi + ?Sized,
{
    let fresh_access = match backend.refresh_access(&tokens.refresh_token).await {
        Ok(token) => token,
        Err(e) => {
            debug!(error = %e, "token refresh failed during session restore");
            return None;
        }
    };

    if let Err(e) = store.replace_access_token(scope, &fresh_access) {
        warn!(scope = scope.as_str(), error = %e, "failed to persist refreshed access token");
    }

    match backend.fetch_identity(&fresh_access).await {
        Ok(user) => {
            write_back(store, scope, &user);
            Some(user)
        }
        Err(e) => {
            debug!(error = %e, "identity fetch failed after refresh");
            None
        }
    }
}

/// Terminal fallback: serve the cached snapshot unverified if one exists,
/// otherwise wipe everything.
fn degrade_or_reset(store: &CredentialStore, scope: StorageScope) -> SessionState {
    let cached = store.read(scope).ok().and_then(|record| record.user);
    match cached {
        Some(user) => {
            info!(scope = scope.as_str(), "serving cached identity without server confirmation");
            SessionState::Degraded(user)
        }
        None => {
            if let Err(e) = store.clear_all() {
                warn!(error = %e, "failed to clear credential store");
            }
            SessionState::Unauthenticated
        }
    }
}

fn write_back(store: &CredentialStore, scope: StorageScope, user: &UserSnapshot) {
    if let Err(e) = store.write_user(scope, user) {
        warn!(scope = scope.as_str(), error = %e, "failed to cache user snapshot");
    }
}

// ============================================================================
// Tests
// ============================================================================
