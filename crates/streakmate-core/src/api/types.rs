//! Wire request/response types for the backend API.
//!
//! Field names mirror the backend's JSON exactly; domain code should prefer
//! the types in `crate::models` where one exists.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth::store::TokenPair;
use crate::models::UserSnapshot;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful login payload: a token pair plus the user it belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub tokens: TokenPair,
    pub user: UserSnapshot,
}

/// Successful registration payload. The recovery keys are one-time material:
/// the server never returns them again, so the caller must show them now.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub tokens: TokenPair,
    pub user: UserSnapshot,
    pub recovery_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoverPasswordRequest {
    pub email: String,
    pub recovery_key: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoverPasswordResponse {
    pub total_recovery_keys: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkProgressRequest {
    pub date: NaiveDate,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
