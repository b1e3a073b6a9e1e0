//! The auth facade: the one place session state is mutated.
//!
//! `AuthManager` owns the [`SessionState`] value behind a `watch` channel;
//! everything else observes it through [`AuthManager::subscribe`]. The
//! transport layer cannot touch the state directly - when it invalidates a
//! session it sends a [`SessionSignal`] that the expiry listener maps to
//! `Unauthenticated`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::api::backend::AuthApi;
use crate::api::transport::{Interceptor, SendOutcome, SessionSignal};
use crate::api::types::{RegisterRequest, RegisterResponse};
use crate::api::{ApiClient, ApiError};
use crate::auth::session::{restore_session, SessionState};
use crate::auth::store::{CredentialStore, StorageScope};
use crate::config::Config;
use crate::models::UserSnapshot;

pub struct AuthManager<B: AuthApi = ApiClient> {
    backend: Arc<B>,
    store: Arc<CredentialStore>,
    interceptor: Arc<Interceptor>,
    state_tx: watch::Sender<SessionState>,
    signal_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<SessionSignal>>,
}

impl AuthManager<ApiClient> {
    /// Wire up the store, interceptor, and HTTP client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let store = Arc::new(CredentialStore::new(config.data_dir()?)?);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let interceptor = Arc::new(Interceptor::new(store.clone(), signal_tx));
        let backend = Arc::new(
            ApiClient::new(config, interceptor.clone()).context("Failed to create API client")?,
        );
        Ok(Self::with_backend(backend, store, interceptor, signal_rx))
    }
}

impl<B: AuthApi> AuthManager<B> {
    /// Assemble a manager from pre-built parts. The state starts as
    /// [`SessionState::Loading`] until [`Self::initialize`] resolves it.
    pub fn with_backend(
        backend: Arc<B>,
        store: Arc<CredentialStore>,
        interceptor: Arc<Interceptor>,
        signal_rx: mpsc::UnboundedReceiver<SessionSignal>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Loading);
        Self {
            backend,
            store,
            interceptor,
            state_tx,
            signal_rx: tokio::sync::Mutex::new(signal_rx),
        }
    }

    /// Watch the session state. The receiver sees every transition, starting
    /// from the current value.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }

    /// Run the startup restore sequence once and resolve `Loading` into a
    /// terminal state. UI paths that depend on authentication must wait for
    /// this to finish.
    pub async fn initialize(&self) {
        let state = restore_session(self.backend.as_ref(), &self.store).await;
        self.set_state(state);
    }

    /// Authenticate and persist the session in the durable scope when
    /// `persistent`, the ephemeral scope otherwise. The other scope is
    /// cleared so exactly one scope holds the live session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        persistent: bool,
    ) -> Result<UserSnapshot> {
        let response = self.backend.login(username, password).await?;

        let scope = if persistent {
            StorageScope::Durable
        } else {
            StorageScope::Ephemeral
        };
        self.store
            .write(scope, &response.tokens, &response.user)
            .context("Failed to persist session")?;
        self.store
            .clear(scope.other())
            .context("Failed to clear previous session scope")?;
        if let Err(e) = self.store.set_preferred_scope(scope) {
            warn!(error = %e, "failed to record scope preference");
        }

        info!(username, scope = scope.as_str(), "login succeeded");
        self.set_state(SessionState::Authenticated(response.user.clone()));
        Ok(response.user)
    }

    /// Create an account and hand back the raw result, including the one-time
    /// recovery keys. Session state is untouched: the caller decides whether
    /// to persist the returned tokens by logging in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let response = self.backend.register(request).await?;
        info!(username = %request.username, "registration succeeded");
        Ok(response)
    }

    /// Log out. The backend call is best-effort; the local session is cleared
    /// and the state goes `Unauthenticated` no matter what the network does.
    pub async fn logout(&self) {
        if let Some((_, tokens)) = self.store.locate() {
            if let Err(e) = self.backend.logout(&tokens.access_token).await {
                warn!(error = %e, "logout request failed, clearing local session anyway");
            }
        }
        if let Err(e) = self.store.clear_all() {
            warn!(error = %e, "failed to clear credential store");
        }
        info!("logged out");
        self.set_state(SessionState::Unauthenticated);
    }

    /// Re-fetch the identity snapshot, e.g. after a completion event bumped
    /// the streak counters. A failure is returned without changing the
    /// session state - this never logs the user out.
    pub async fn refresh_identity(&self) -> Result<UserSnapshot> {
        let backend = Arc::clone(&self.backend);
        let user: UserSnapshot = self
            .interceptor
            .execute(self.backend.as_ref(), move |access| {
                let backend = Arc::clone(&backend);
                async move {
                    match backend.fetch_identity(access.as_deref().unwrap_or_default()).await {
                        Ok(user) => Ok(SendOutcome::Ok(user)),
                        Err(ApiError::Unauthorized) => Ok(SendOutcome::Unauthorized),
                        Err(e) => Err(e),
                    }
                }
            })
            .await?;

        if let Some((scope, _)) = self.store.locate() {
            if let Err(e) = self.store.write_user(scope, &user) {
                warn!(scope = scope.as_str(), error = %e, "failed to cache user snapshot");
            }
        }

        // The server just confirmed the identity, so a degraded session is
        // verified again.
        if self.state().is_authenticated() {
            self.set_state(SessionState::Authenticated(user.clone()));
        }
        Ok(user)
    }

    /// Forward expiry signals from the transport layer into the session
    /// state. Runs until the signal channel closes; spawn it alongside the
    /// application loop.
    pub async fn run_expiry_listener(&self) {
        let mut rx = self.signal_rx.lock().await;
        while let Some(signal) = rx.recv().await {
            match signal {
                SessionSignal::Expired => {
                    info!("session expired, transitioning to unauthenticated");
                    self.set_state(SessionState::Unauthenticated);
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::LoginResponse;
    use crate::auth::store::SCOPE_PROBE_ORDER;
    use crate::testutil::{sample_tokens, sample_user, FakeApi};

    struct Fixture {
        _dir: tempfile::TempDir,
        manager: AuthManager<FakeApi>,
        backend: Arc<FakeApi>,
        store: Arc<CredentialStore>,
        signal_tx: mpsc::UnboundedSender<SessionSignal>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CredentialStore::new(dir.path().to_path_buf()).unwrap());
        let backend = Arc::new(FakeApi::new());
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let interceptor = Arc::new(Interceptor::new(store.clone(), signal_tx.clone()));
        let manager =
            AuthManager::with_backend(backend.clone(), store.clone(), interceptor, signal_rx);
        Fixture {
            _dir: dir,
            manager,
            backend,
            store,
            signal_tx,
        }
    }

    fn login_response(access: &str) -> LoginResponse {
        LoginResponse {
            tokens: sample_tokens(access, "refresh"),
            user: sample_user("dana"),
        }
    }

    #[tokio::test]
    async fn test_state_starts_loading() {
        let f = fixture();
        assert_eq!(f.manager.state(), SessionState::Loading);
    }

    #[tokio::test]
    async fn test_persistent_login_lands_in_durable_scope() {
        let f = fixture();
        f.backend.queue_login(Ok(login_response("acc")));

        let user = f.manager.login("dana", "hunter2", true).await.unwrap();

        assert_eq!(f.manager.state(), SessionState::Authenticated(user));
        let durable = f.store.read(StorageScope::Durable).unwrap();
        assert_eq!(durable.tokens, Some(sample_tokens("acc", "refresh")));
        assert!(f.store.read(StorageScope::Ephemeral).unwrap().is_empty());
        assert_eq!(f.store.preferred_scope(), Some(StorageScope::Durable));
    }

    #[tokio::test]
    async fn test_session_login_lands_in_ephemeral_scope() {
        let f = fixture();
        f.backend.queue_login(Ok(login_response("acc")));

        f.manager.login("dana", "hunter2", false).await.unwrap();

        let ephemeral = f.store.read(StorageScope::Ephemeral).unwrap();
        assert_eq!(ephemeral.tokens, Some(sample_tokens("acc", "refresh")));
        assert!(f.store.read(StorageScope::Durable).unwrap().is_empty());
        assert_eq!(f.store.preferred_scope(), Some(StorageScope::Ephemeral));
    }

    #[tokio::test]
    async fn test_relogin_clears_the_other_scope() {
        let f = fixture();
        f.backend.queue_login(Ok(login_response("first")));
        f.backend.queue_login(Ok(login_response("second")));

        f.manager.login("dana", "hunter2", true).await.unwrap();
        f.manager.login("dana", "hunter2", false).await.unwrap();

        assert!(f.store.read(StorageScope::Durable).unwrap().is_empty());
        let tokens = f.store.read(StorageScope::Ephemeral).unwrap().tokens.unwrap();
        assert_eq!(tokens.access_token, "second");
    }

    #[tokio::test]
    async fn test_failed_login_leaves_state_unchanged() {
        let f = fixture();
        f.manager.set_state(SessionState::Unauthenticated);
        f.backend.queue_login(Err(ApiError::Unauthorized));

        let result = f.manager.login("dana", "wrong", true).await;

        assert!(result.is_err());
        assert_eq!(f.manager.state(), SessionState::Unauthenticated);
        assert!(f.store.locate().is_none());
    }

    #[tokio::test]
    async fn test_register_does_not_mutate_session() {
        let f = fixture();
        f.manager.set_state(SessionState::Unauthenticated);
        f.backend.queue_register(Ok(crate::api::types::RegisterResponse {
            tokens: sample_tokens("acc", "ref"),
            user: sample_user("newbie"),
            recovery_keys: vec!["AAAA-BBBB".to_string()],
        }));

        let response = f
            .manager
            .register(&RegisterRequest {
                username: "newbie".to_string(),
                email: "n@example.com".to_string(),
                password: "hunter2".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.recovery_keys, vec!["AAAA-BBBB"]);
        assert_eq!(f.manager.state(), SessionState::Unauthenticated);
        assert!(f.store.locate().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_everything_even_on_network_error() {
        let f = fixture();
        f.backend.queue_login(Ok(login_response("acc")));
        f.manager.login("dana", "hunter2", true).await.unwrap();
        f.backend
            .queue_logout(Err(ApiError::Network("unreachable".to_string())));

        f.manager.logout().await;

        assert_eq!(f.manager.state(), SessionState::Unauthenticated);
        for scope in SCOPE_PROBE_ORDER {
            assert!(f.store.read(scope).unwrap().is_empty());
        }
        assert_eq!(f.backend.logout_calls(), 1);
    }

    #[tokio::test]
    async fn test_logout_without_session_skips_backend_call() {
        let f = fixture();
        f.manager.logout().await;

        assert_eq!(f.manager.state(), SessionState::Unauthenticated);
        assert_eq!(f.backend.logout_calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_identity_updates_snapshot_and_store() {
        let f = fixture();
        f.backend.queue_login(Ok(login_response("acc")));
        f.manager.login("dana", "hunter2", true).await.unwrap();

        let mut bumped = sample_user("dana");
        bumped.current_streak = 12;
        f.backend.queue_identity(Ok(bumped.clone()));

        let user = f.manager.refresh_identity().await.unwrap();

        assert_eq!(user, bumped);
        assert_eq!(f.manager.state(), SessionState::Authenticated(bumped.clone()));
        let stored = f.store.read(StorageScope::Durable).unwrap().user;
        assert_eq!(stored, Some(bumped));
    }

    #[tokio::test]
    async fn test_refresh_identity_verifies_degraded_session() {
        let f = fixture();
        f.store
            .write(StorageScope::Durable, &sample_tokens("a", "r"), &sample_user("dana"))
            .unwrap();
        f.manager.set_state(SessionState::Degraded(sample_user("dana")));

        let confirmed = sample_user("dana");
        f.backend.queue_identity(Ok(confirmed.clone()));

        f.manager.refresh_identity().await.unwrap();

        assert_eq!(f.manager.state(), SessionState::Authenticated(confirmed));
    }

    #[tokio::test]
    async fn test_refresh_identity_failure_keeps_state() {
        let f = fixture();
        f.backend.queue_login(Ok(login_response("acc")));
        let user = f.manager.login("dana", "hunter2", true).await.unwrap();
        f.backend
            .queue_identity(Err(ApiError::Network("unreachable".to_string())));

        let result = f.manager.refresh_identity().await;

        assert!(result.is_err());
        // Still logged in with the old snapshot; never logged out by this.
        assert_eq!(f.manager.state(), SessionState::Authenticated(user));
    }

    #[tokio::test]
    async fn test_expiry_signal_transitions_to_unauthenticated() {
        let Fixture {
            _dir,
            manager,
            signal_tx,
            ..
        } = fixture();
        let manager = Arc::new(manager);
        manager.set_state(SessionState::Authenticated(sample_user("dana")));
        let mut rx = manager.subscribe();
        rx.borrow_and_update();

        let listener = tokio::spawn({
            let manager = Arc::clone(&manager);
            async move { manager.run_expiry_listener().await }
        });
        signal_tx.send(SessionSignal::Expired).unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::Unauthenticated);
        listener.abort();
    }

    #[tokio::test]
    async fn test_initialize_resolves_loading() {
        let f = fixture();
        f.manager.initialize().await;
        assert_eq!(f.manager.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_subscribe_observes_transitions() {
        let f = fixture();
        let mut rx = f.manager.subscribe();
        assert_eq!(*rx.borrow_and_update(), SessionState::Loading);

        f.backend.queue_login(Ok(login_response("acc")));
        let user = f.manager.login("dana", "hunter2", true).await.unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::Authenticated(user));
    }
}
