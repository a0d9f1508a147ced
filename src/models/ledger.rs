use serde::{Deserialize, Serialize};

/// One point-earning event. Entries are append-only; the ledger total is
/// always the sum of its entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub action: String,
    pub points: i64,
    pub recorded_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    pub user_id: String,
    pub total_points: i64,
    pub last_updated: String,
}

/// `get_user_points` response: ledger plus the derived level fields, history
/// most recent first. A user with no ledger resolves to the zero default,
/// not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPoints {
    pub user_id: String,
    pub total_points: i64,
    pub history: Vec<LedgerEntry>,
    pub level: i64,
    pub next_level_points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLevel {
    pub level: i64,
    pub current_points: i64,
    pub next_level_points: i64,
    pub progress: f64,
}
