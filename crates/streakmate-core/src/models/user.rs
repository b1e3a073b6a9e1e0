//! Domain model for the server-reported user identity.
//!
//! The snapshot is eventually consistent: the authoritative copy lives on the
//! server, and the cached copy held by the credential store may lag behind
//! after a completion event until the identity is explicitly re-fetched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached copy of the server-side user profile, including the gamification
/// counters shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub current_streak: u32,
    pub best_streak: u32,
    pub total_days: u32,
    pub total_points: u32,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserSnapshot {
    /// Whether the user has an active streak going.
    pub fn on_streak(&self) -> bool {
        self.current_streak > 0
    }
}
