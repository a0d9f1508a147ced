use serde::{Deserialize, Serialize};
use std::fmt;

/// A one-time achievement grant. At most one row per (user, badge name).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub date_earned: String,
}

/// Fulfillment condition of a badge. `Points` criteria are evaluated on
/// every activity regardless of which action triggered it; `ActionCount`
/// criteria only when the triggering action matches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BadgeCriterion {
    Points { threshold: i64 },
    ActionCount { action: String, threshold: i64 },
}

impl BadgeCriterion {
    pub fn type_str(&self) -> &'static str {
        match self {
            BadgeCriterion::Points { .. } => "points",
            BadgeCriterion::ActionCount { .. } => "action_count",
        }
    }

    pub fn threshold(&self) -> i64 {
        match self {
            BadgeCriterion::Points { threshold } => *threshold,
            BadgeCriterion::ActionCount { threshold, .. } => *threshold,
        }
    }
}

impl fmt::Display for BadgeCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeCriteria {
    pub name: String,
    pub description: String,
    pub criterion: BadgeCriterion,
}
