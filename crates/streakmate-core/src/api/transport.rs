//! Refresh-and-retry policy wrapped around every authenticated request.
//!
//! The interceptor attaches the current access token (durable scope probed
//! before ephemeral), and on an authorization failure for a request that has
//! not yet been retried it performs exactly one token refresh and resends the
//! request once. The retried response is returned as-is, so no request ever
//! triggers more than one refresh.
//!
//! Refreshes triggered by concurrent requests are coalesced: a shared gate
//! serializes them, and a task that acquires the gate after someone else
//! already swapped the access token skips its own refresh call.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::backend::AuthApi;
use crate::api::ApiError;
use crate::auth::store::{CredentialStore, StorageScope, TokenPair};

/// Out-of-band notification from the transport layer. The interceptor has no
/// handle to the session state, so an unrecoverable authorization failure is
/// reported through this channel instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// Credentials could not be refreshed; all scopes have been cleared.
    Expired,
}

/// What one attempt at sending a request produced, as far as the retry
/// policy cares: a decoded success or an authorization failure. Any other
/// error short-circuits the policy entirely.
pub(crate) enum SendOutcome<T> {
    Ok(T),
    Unauthorized,
}

pub struct Interceptor {
    store: Arc<CredentialStore>,
    refresh_gate: tokio::sync::Mutex<()>,
    signal_tx: mpsc::UnboundedSender<SessionSignal>,
}

impl Interceptor {
    pub fn new(store: Arc<CredentialStore>, signal_tx: mpsc::UnboundedSender<SessionSignal>) -> Self {
        Self {
            store,
            refresh_gate: tokio::sync::Mutex::new(()),
            signal_tx,
        }
    }

    /// Run one request under the refresh-and-retry policy.
    ///
    /// `send` performs the actual request with the given access token (`None`
    /// sends unauthenticated - absence of a token is not an error here, the
    /// server decides). It is invoked at most twice.
    pub(crate) async fn execute<T, B, F, Fut>(&self, backend: &B, send: F) -> Result<T, ApiError>
    where
        B: AuthApi + ?Sized,
        F: Fn(Option<String>) -> Fut,
        Fut: Future<Output = Result<SendOutcome<T>, ApiError>>,
    {
        let located = self.store.locate();
        let access = located.as_ref().map(|(_, t)| t.access_token.clone());

        match send(access).await? {
            SendOutcome::Ok(value) => Ok(value),
            SendOutcome::Unauthorized => {
                let Some((scope, stale)) = located else {
                    // Nothing to refresh with.
                    self.expire_session();
                    return Err(ApiError::Unauthorized);
                };

                let fresh_access = match self.refresh_in_scope(backend, scope, &stale).await {
                    Ok(token) => token,
                    Err(e) => {
                        debug!(error = %e, "token refresh failed");
                        self.expire_session();
                        // Surface the original authorization failure, not the
                        // refresh error.
                        return Err(ApiError::Unauthorized);
                    }
                };

                // Exactly one resend; if it fails authorization again the
                // failure is returned without another refresh.
                match send(Some(fresh_access)).await? {
                    SendOutcome::Ok(value) => Ok(value),
                    SendOutcome::Unauthorized => Err(ApiError::Unauthorized),
                }
            }
        }
    }

    /// Obtain a fresh access token for `scope`, deduplicating concurrent
    /// refreshes. The new token is written back into the same scope; the
    /// active scope never changes here.
    async fn refresh_in_scope<B>(
        &self,
        backend: &B,
        scope: StorageScope,
        stale: &TokenPair,
    ) -> Result<String, ApiError>
    where
        B: AuthApi + ?Sized,
    {
        let _gate = self.refresh_gate.lock().await;

        // A concurrent request may have refreshed while we waited on the gate.
        if let Ok(record) = self.store.read(scope) {
            if let Some(current) = record.tokens {
                if current.access_token != stale.access_token {
                    debug!(scope = scope.as_str(), "access token already refreshed by concurrent request");
                    return Ok(current.access_token);
                }
            }
        }

        let fresh = backend.refresh_access(&stale.refresh_token).await?;
        if let Err(e) = self.store.replace_access_token(scope, &fresh) {
            warn!(scope = scope.as_str(), error = %e, "failed to persist refreshed access token");
        }
        Ok(fresh)
    }

    /// Unrecoverable authorization failure: wipe every credential scope and
    /// tell whoever owns the session state to go unauthenticated.
    fn expire_session(&self) {
        if let Err(e) = self.store.clear_all() {
            warn!(error = %e, "failed to clear credential store");
        }
        // The receiver may be gone during shutdown; that is fine.
        let _ = self.signal_tx.send(SessionSignal::Expired);
    }
}

// ============================================================================
// Tests
// ============================================================================
