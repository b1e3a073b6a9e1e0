//! Domain models for achievements and aggregate user statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An achievement from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub points: u32,
}

/// An achievement the user has earned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarnedAchievement {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub earned_at: Option<DateTime<Utc>>,
}

/// Aggregate statistics for the current user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_days: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    pub total_points: u32,
    pub achievements_earned: u32,
}
