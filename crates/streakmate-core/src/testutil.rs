//! Test doubles shared across unit tests: a scripted [`AuthApi`] fake and
//! sample-data constructors.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::backend::AuthApi;
use crate::api::types::{
    LoginResponse, RecoverPasswordRequest, RecoverPasswordResponse, RegisterRequest,
    RegisterResponse,
};
use crate::api::ApiError;
use crate::auth::store::TokenPair;
use crate::models::UserSnapshot;

pub(crate) fn sample_user(username: &str) -> UserSnapshot {
    UserSnapshot {
        id: 1,
        username: username.to_string(),
        email: format!("{}@example.com", username),
        current_streak: 4,
        best_streak: 11,
        total_days: 37,
        total_points: 210,
        created_at: None,
    }
}

pub(crate) fn sample_tokens(access: &str, refresh: &str) -> TokenPair {
    TokenPair {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    }
}

/// Scripted backend: each operation pops the next queued result and counts
/// its calls. An empty queue is a test bug and fails loudly.
#[derive(Default)]
pub(crate) struct FakeApi {
    login_queue: Mutex<VecDeque<Result<LoginResponse, ApiError>>>,
    register_queue: Mutex<VecDeque<Result<RegisterResponse, ApiError>>>,
    identity_queue: Mutex<VecDeque<Result<UserSnapshot, ApiError>>>,
    refresh_queue: Mutex<VecDeque<Result<String, ApiError>>>,
    logout_queue: Mutex<VecDeque<Result<(), ApiError>>>,
    recover_queue: Mutex<VecDeque<Result<RecoverPasswordResponse, ApiError>>>,
    identity_count: AtomicUsize,
    refresh_count: AtomicUsize,
    logout_count: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_login(&self, result: Result<LoginResponse, ApiError>) {
        self.login_queue.lock().unwrap().push_back(result);
    }

    pub fn queue_register(&self, result: Result<RegisterResponse, ApiError>) {
        self.register_queue.lock().unwrap().push_back(result);
    }

    pub fn queue_identity(&self, result: Result<UserSnapshot, ApiError>) {
        self.identity_queue.lock().unwrap().push_back(result);
    }

    pub fn queue_refresh(&self, result: Result<String, ApiError>) {
        self.refresh_queue.lock().unwrap().push_back(result);
    }

    pub fn queue_logout(&self, result: Result<(), ApiError>) {
        self.logout_queue.lock().unwrap().push_back(result);
    }

    #[allow(dead_code)]
    pub fn queue_recover(&self, result: Result<RecoverPasswordResponse, ApiError>) {
        self.recover_queue.lock().unwrap().push_back(result);
    }

    pub fn identity_calls(&self) -> usize {
        self.identity_count.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_count.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_count.load(Ordering::SeqCst)
    }

    fn pop<T>(queue: &Mutex<VecDeque<Result<T, ApiError>>>, operation: &str) -> Result<T, ApiError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted {} response left", operation))
    }
}

#[async_trait]
impl AuthApi for FakeApi {
    async fn login(&self, _username: &str, _password: &str) -> Result<LoginResponse, ApiError> {
        Self::pop(&self.login_queue, "login")
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        Self::pop(&self.register_queue, "register")
    }

    async fn fetch_identity(&self, _access_token: &str) -> Result<UserSnapshot, ApiError> {
        self.identity_count.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.identity_queue, "identity")
    }

    async fn refresh_access(&self, _refresh_token: &str) -> Result<String, ApiError> {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.refresh_queue, "refresh")
    }

    async fn logout(&self, _access_token: &str) -> Result<(), ApiError> {
        self.logout_count.fetch_add(1, Ordering::SeqCst);
        Self::pop(&self.logout_queue, "logout")
    }

    async fn recover_password(
        &self,
        _request: &RecoverPasswordRequest,
    ) -> Result<RecoverPasswordResponse, ApiError> {
        Self::pop(&self.recover_queue, "recover_password")
    }
}
