//! HTTP client for the streakmate backend.
//!
//! Raw auth operations (login, refresh, logout, ...) take their tokens
//! explicitly and perform no retries; they implement [`AuthApi`]. Everything
//! else goes through the transport interceptor, which attaches the stored
//! access token and transparently refreshes it once on an authorization
//! failure.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::backend::AuthApi;
use crate::api::transport::{Interceptor, SendOutcome};
use crate::api::types::{
    LoginRequest, LoginResponse, MarkProgressRequest, RecoverPasswordRequest,
    RecoverPasswordResponse, RefreshRequest, RefreshResponse, RegisterRequest, RegisterResponse,
};
use crate::api::ApiError;
use crate::config::Config;
use crate::models::{
    Achievement, EarnedAchievement, LeaderboardEntry, LeaderboardKind, MonthlyProgress,
    ProgressRecord, UserRank, UserSnapshot, UserStats,
};

// ============================================================================
// Constants
// ============================================================================

/// Version prefix shared by every backend route
const API_PREFIX: &str = "/api/v1";

/// HTTP request timeout in seconds.
/// A fixed ceiling per request; anything slower fails as a network error.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// API client for the streakmate backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    interceptor: Arc<Interceptor>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: &Config, interceptor: Arc<Interceptor>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            interceptor,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn url_with_query(&self, path: &str, pairs: &[(&str, String)]) -> String {
        let mut url = self.url(path);
        for (i, (key, value)) in pairs.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            url.push(sep);
            url.push_str(key);
            url.push('=');
            url.push_str(value);
        }
        url
    }

    /// Decode a response into `T`, mapping failure statuses onto [`ApiError`].
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("{} (body: {:.120})", e, body)))
    }

    /// Like [`Self::decode`], but reports a 401 as a retryable outcome for
    /// the interceptor instead of an error.
    async fn decode_outcome<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<SendOutcome<T>, ApiError> {
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(SendOutcome::Unauthorized);
        }
        Ok(SendOutcome::Ok(Self::decode(response).await?))
    }

    /// Issue an intercepted request: bearer token attached from the active
    /// scope, one refresh-and-retry on authorization failure.
    async fn request_with_auth<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        debug!(method = %method, url = %url, "sending request");
        self.interceptor
            .execute(self, move |access| {
                let client = self.client.clone();
                let method = method.clone();
                let url = url.clone();
                let body = body.clone();
                async move {
                    let mut request = client.request(method, &url);
                    if let Some(token) = access.as_deref() {
                        request = request.bearer_auth(token);
                    }
                    if let Some(body) = &body {
                        request = request.json(body);
                    }
                    let response = request.send().await?;
                    Self::decode_outcome(response).await
                }
            })
            .await
    }

    async fn get_with_auth<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        self.request_with_auth(Method::GET, url, None).await
    }

    async fn post_with_auth<T: DeserializeOwned>(
        &self,
        url: String,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        self.request_with_auth(Method::POST, url, Some(body)).await
    }

    // ===== Identity =====

    /// Fetch the current user's snapshot using the stored session.
    pub async fn current_user(&self) -> Result<UserSnapshot, ApiError> {
        self.get_with_auth(self.url("/auth/me")).await
    }

    // ===== Progress =====

    /// Mark (or unmark) completion for a day.
    pub async fn mark_progress(
        &self,
        request: &MarkProgressRequest,
    ) -> Result<ProgressRecord, ApiError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        self.post_with_auth(self.url("/wellness/progress"), body).await
    }

    /// Fetch progress records, optionally limited to a date range.
    pub async fn user_progress(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<ProgressRecord>, ApiError> {
        let mut pairs = Vec::new();
        if let Some(start) = start_date {
            pairs.push(("start_date", start.to_string()));
        }
        if let Some(end) = end_date {
            pairs.push(("end_date", end.to_string()));
        }
        self.get_with_auth(self.url_with_query("/wellness/progress", &pairs))
            .await
    }

    /// Fetch one calendar month of progress.
    pub async fn monthly_progress(&self, year: i32, month: u32) -> Result<MonthlyProgress, ApiError> {
        let pairs = [("year", year.to_string()), ("month", month.to_string())];
        self.get_with_auth(self.url_with_query("/wellness/progress/monthly", &pairs))
            .await
    }

    // ===== Leaderboard =====

    /// Fetch the top of a leaderboard.
    pub async fn leaderboard(
        &self,
        kind: LeaderboardKind,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let pairs = [
            ("leaderboard_type", kind.as_str().to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_with_auth(self.url_with_query("/wellness/leaderboard", &pairs))
            .await
    }

    /// Fetch the calling user's own rank.
    pub async fn user_rank(&self, kind: LeaderboardKind) -> Result<UserRank, ApiError> {
        let pairs = [("leaderboard_type", kind.as_str().to_string())];
        self.get_with_auth(self.url_with_query("/wellness/leaderboard/rank", &pairs))
            .await
    }

    // ===== Achievements & stats =====

    /// Fetch the full achievement catalog.
    pub async fn achievements(&self) -> Result<Vec<Achievement>, ApiError> {
        self.get_with_auth(self.url("/wellness/achievements")).await
    }

    /// Fetch the achievements the user has earned.
    pub async fn user_achievements(&self) -> Result<Vec<EarnedAchievement>, ApiError> {
        self.get_with_auth(self.url("/wellness/achievements/user"))
            .await
    }

    /// Ask the server to re-evaluate achievements after a completion event.
    /// Returns any newly earned ones.
    pub async fn check_achievements(&self) -> Result<Vec<EarnedAchievement>, ApiError> {
        self.post_with_auth(self.url("/wellness/achievements/check"), serde_json::json!({}))
            .await
    }

    /// Fetch aggregate statistics for the user.
    pub async fn user_stats(&self) -> Result<UserStats, ApiError> {
        self.get_with_auth(self.url("/wellness/stats/user")).await
    }
}

// Raw, token-explicit operations. No interception, no retries: login and
// register surface their failures directly, and the restore path drives its
// own refresh sequence.
#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<UserSnapshot, ApiError> {
        let response = self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn refresh_access(&self, refresh_token: &str) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await?;
        let parsed: RefreshResponse = Self::decode(response).await?;
        Ok(parsed.access_token)
    }

    async fn logout(&self, access_token: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn recover_password(
        &self,
        request: &RecoverPasswordRequest,
    ) -> Result<RecoverPasswordResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/recover-password"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }
}
