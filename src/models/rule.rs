use serde::{Deserialize, Serialize};

/// Maps an action name to the points it earns. Negative points are allowed
/// (penalty rules); the action name is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRule {
    pub action: String,
    pub points: i64,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRuleUpsert {
    pub action: String,
    pub points: i64,
}
