//! Domain models for daily completion records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single stored day of progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub date: NaiveDate,
    pub completed: bool,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// One calendar month of progress, as returned by the monthly endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonthlyProgress {
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub records: Vec<ProgressRecord>,
}

impl MonthlyProgress {
    /// Number of days marked completed this month.
    pub fn completed_days(&self) -> usize {
        self.records.iter().filter(|r| r.completed).count()
    }
}
