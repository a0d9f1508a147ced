use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dates are kept at day granularity as `YYYY-MM-DD` strings in storage.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakDay {
    pub date: NaiveDate,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    pub user_id: String,
    pub current_streak: i64,
    pub longest_streak: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_date: Option<NaiveDate>,
    pub streak_history: Vec<StreakDay>,
}

impl StreakState {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            streak_history: Vec::new(),
        }
    }
}

/// The slice of streak state returned inside a `track_activity` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakInfo {
    pub current_streak: i64,
    pub longest_streak: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity_date: Option<NaiveDate>,
}

impl StreakInfo {
    pub fn zeroed() -> Self {
        Self {
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
        }
    }
}
