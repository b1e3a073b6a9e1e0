//! Domain models shared across the client.
//!
//! These types represent server data in a clean domain format,
//! decoupled from any view code. The authoritative copies live
//! server-side; everything here is a client-side projection.

pub mod achievement;
pub mod leaderboard;
pub mod progress;
pub mod user;

pub use achievement::{Achievement, EarnedAchievement, UserStats};
pub use leaderboard::{LeaderboardEntry, LeaderboardKind, UserRank};
pub use progress::{MonthlyProgress, ProgressRecord};
pub use user::UserSnapshot;
