//! Trait seam over the raw backend auth operations.
//!
//! Tokens are passed explicitly here: nothing at this level consults the
//! credential store or retries anything. The transport interceptor and the
//! startup restore path layer their policies on top of these calls, which is
//! also what makes both testable against a scripted fake.

use async_trait::async_trait;

use crate::api::types::{
    LoginResponse, RecoverPasswordRequest, RecoverPasswordResponse, RegisterRequest,
    RegisterResponse,
};
use crate::api::ApiError;
use crate::models::UserSnapshot;

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token pair and user snapshot.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError>;

    /// Create an account. Returns tokens, the new user's snapshot, and the
    /// one-time recovery keys.
    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError>;

    /// Fetch the identity the given access token belongs to.
    async fn fetch_identity(&self, access_token: &str) -> Result<UserSnapshot, ApiError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh_access(&self, refresh_token: &str) -> Result<String, ApiError>;

    /// Invalidate the session server-side.
    async fn logout(&self, access_token: &str) -> Result<(), ApiError>;

    /// Reset a forgotten password using a recovery key. Returns how many
    /// valid recovery keys remain.
    async fn recover_password(
        &self,
        request: &RecoverPasswordRequest,
    ) -> Result<RecoverPasswordResponse, ApiError>;
}
