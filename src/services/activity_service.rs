use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::AppResult;
use crate::models::badge::Badge;
use crate::models::streak::StreakInfo;
use crate::services::badge_service::BadgeService;
use crate::services::ledger_service::LedgerService;
use crate::services::leaderboard_service::LeaderboardService;
use crate::services::level;
use crate::services::rule_service::RuleService;
use crate::services::streak_service::StreakService;

/// Result of one tracked activity. Streak, badge and leaderboard problems
/// surface as embedded error fields instead of failing the award; only the
/// registry lookup and the ledger write can fail the whole call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResult {
    pub user_id: String,
    pub action: String,
    pub points_awarded: i64,
    pub total_points: i64,
    pub level: i64,
    pub next_level_points: i64,
    pub new_badges: Vec<Badge>,
    pub streak: StreakInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaderboard_error: Option<String>,
}

/// Orchestrates one activity report across the registry, ledger, streak
/// tracker, badge awarder and leaderboard.
pub struct ActivityService {
    rules: Arc<RuleService>,
    ledger: Arc<LedgerService>,
    streaks: Arc<StreakService>,
    badges: Arc<BadgeService>,
    leaderboard: Arc<LeaderboardService>,
}

impl ActivityService {
    pub fn new(
        rules: Arc<RuleService>,
        ledger: Arc<LedgerService>,
        streaks: Arc<StreakService>,
        badges: Arc<BadgeService>,
        leaderboard: Arc<LeaderboardService>,
    ) -> Self {
        Self {
            rules,
            ledger,
            streaks,
            badges,
            leaderboard,
        }
    }

    pub fn track_activity(&self, user_id: &str, action: &str) -> AppResult<ActivityResult> {
        // Registry miss and ledger failures propagate: points must never be
        // silently dropped or invented.
        let rule = self.rules.resolve(action)?;
        let recorded = self.ledger.record_points(user_id, action, rule.points)?;

        let new_level = level::level_for_points(recorded.new_total);
        let next_level_points = level::points_for_next_level(new_level);

        // Streak tracking is best-effort: a failure here must not block the
        // award, so it degrades to zeros with the reason kept in the payload.
        let (streak, streak_error) = match self
            .streaks
            .record_activity(user_id, Utc::now().date_naive())
        {
            Ok(info) => (info, None),
            Err(err) => {
                warn!(target: "app::streak", %user_id, error = %err, "streak update failed, degrading");
                (StreakInfo::zeroed(), Some(err.to_string()))
            }
        };

        let (new_badges, badge_error) =
            match self.badges.evaluate(user_id, action, recorded.new_total) {
                Ok(badges) => (badges, None),
                Err(err) => {
                    warn!(target: "app::badges", %user_id, error = %err, "badge evaluation failed, skipping");
                    (Vec::new(), Some(err.to_string()))
                }
            };

        let leaderboard_error = match self
            .leaderboard
            .upsert_score(user_id, None, recorded.new_total)
        {
            Ok(()) => None,
            Err(err) => {
                error!(target: "app::leaderboard", %user_id, error = %err, "leaderboard update failed");
                Some(err.to_string())
            }
        };

        info!(
            target: "app::activity",
            %user_id,
            %action,
            points = rule.points,
            total = recorded.new_total,
            level = new_level,
            badges = new_badges.len(),
            "activity tracked"
        );

        Ok(ActivityResult {
            user_id: user_id.to_string(),
            action: action.to_string(),
            points_awarded: rule.points,
            total_points: recorded.new_total,
            level: new_level,
            next_level_points,
            new_badges,
            streak,
            streak_error,
            badge_error,
            leaderboard_error,
        })
    }
}
