//! Domain models for the streak leaderboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which score the leaderboard is ranked by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardKind {
    #[default]
    CurrentStreak,
    BestStreak,
    TotalDays,
}

impl LeaderboardKind {
    /// Query-parameter value expected by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardKind::CurrentStreak => "current_streak",
            LeaderboardKind::BestStreak => "best_streak",
            LeaderboardKind::TotalDays => "total_days",
        }
    }
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub username: String,
    pub current_streak: u32,
    pub best_streak: u32,
    pub total_days: u32,
    pub join_date: Option<DateTime<Utc>>,
}

/// The calling user's own position in a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRank {
    pub rank: u32,
    pub leaderboard_type: LeaderboardKind,
}
