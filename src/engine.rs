use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::db::repositories::user_directory_repository::UserDirectoryRepository;
use crate::error::AppResult;
use crate::models::badge::{Badge, BadgeCriteria};
use crate::models::leaderboard::{LeaderboardRow, Timeframe};
use crate::models::ledger::{UserLevel, UserPoints};
use crate::models::rule::{PointRule, PointRuleUpsert};
use crate::models::streak::StreakState;
use crate::services::activity_service::{ActivityResult, ActivityService};
use crate::services::badge_service::BadgeService;
use crate::services::ledger_service::LedgerService;
use crate::services::leaderboard_service::LeaderboardService;
use crate::services::rule_service::RuleService;
use crate::services::streak_service::{self, StreakService};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Default top-K returned by `get_leaderboard`.
    pub leaderboard_limit: usize,
    /// Distinct dates of streak history retained per user.
    pub streak_history_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            leaderboard_limit: crate::services::leaderboard_service::DEFAULT_TOP_K,
            streak_history_cap: streak_service::HISTORY_CAP,
        }
    }
}

/// Facade over the gamification services. The transport layer holds one of
/// these and calls the operations below; everything is backed by the shared
/// `DbPool`.
#[derive(Clone)]
pub struct Engine {
    db_pool: DbPool,
    config: EngineConfig,
    rule_service: Arc<RuleService>,
    ledger_service: Arc<LedgerService>,
    streak_service: Arc<StreakService>,
    badge_service: Arc<BadgeService>,
    leaderboard_service: Arc<LeaderboardService>,
    activity_service: Arc<ActivityService>,
}

impl Engine {
    pub fn new(db_pool: DbPool) -> Self {
        Self::with_config(db_pool, EngineConfig::default())
    }

    pub fn with_config(db_pool: DbPool, config: EngineConfig) -> Self {
        let rule_service = Arc::new(RuleService::new(db_pool.clone()));
        let ledger_service = Arc::new(LedgerService::new(db_pool.clone()));
        let streak_service = Arc::new(StreakService::with_history_cap(
            db_pool.clone(),
            config.streak_history_cap,
        ));
        let badge_service = Arc::new(BadgeService::new(db_pool.clone()));
        let leaderboard_service = Arc::new(LeaderboardService::new(db_pool.clone()));
        let activity_service = Arc::new(ActivityService::new(
            Arc::clone(&rule_service),
            Arc::clone(&ledger_service),
            Arc::clone(&streak_service),
            Arc::clone(&badge_service),
            Arc::clone(&leaderboard_service),
        ));

        Self {
            db_pool,
            config,
            rule_service,
            ledger_service,
            streak_service,
            badge_service,
            leaderboard_service,
            activity_service,
        }
    }

    pub fn db_pool(&self) -> &DbPool {
        &self.db_pool
    }

    // --- activity path ---

    pub fn track_activity(&self, user_id: &str, action: &str) -> AppResult<ActivityResult> {
        self.activity_service.track_activity(user_id, action)
    }

    // --- read operations ---

    pub fn get_user_points(
        &self,
        user_id: &str,
        history_limit: Option<usize>,
    ) -> AppResult<UserPoints> {
        self.ledger_service.get_user_points(user_id, history_limit)
    }

    pub fn get_user_level(&self, user_id: &str) -> AppResult<UserLevel> {
        self.ledger_service.get_user_level(user_id)
    }

    pub fn get_user_streak(&self, user_id: &str) -> AppResult<StreakState> {
        self.streak_service.get_user_streak(user_id)
    }

    pub fn get_user_achievements(&self, user_id: &str) -> AppResult<Vec<Badge>> {
        self.badge_service.get_user_achievements(user_id)
    }

    pub fn get_leaderboard(
        &self,
        category: Option<&str>,
        timeframe: Option<Timeframe>,
        limit: Option<usize>,
    ) -> AppResult<Vec<LeaderboardRow>> {
        self.leaderboard_service.get_leaderboard(
            category,
            timeframe,
            limit.or(Some(self.config.leaderboard_limit)),
        )
    }

    // --- admin configuration ---

    pub fn upsert_rule(&self, input: PointRuleUpsert) -> AppResult<PointRule> {
        self.rule_service.upsert(input)
    }

    pub fn list_rules(&self) -> AppResult<Vec<PointRule>> {
        self.rule_service.list()
    }

    pub fn delete_rule(&self, action: &str) -> AppResult<()> {
        self.rule_service.delete(action)
    }

    pub fn upsert_badge_criteria(&self, criteria: BadgeCriteria) -> AppResult<()> {
        self.badge_service.upsert_criteria(criteria)
    }

    pub fn list_badge_criteria(&self) -> AppResult<Vec<BadgeCriteria>> {
        self.badge_service.list_criteria()
    }

    pub fn upsert_score(
        &self,
        user_id: &str,
        category: Option<&str>,
        score: i64,
    ) -> AppResult<()> {
        self.leaderboard_service.upsert_score(user_id, category, score)
    }

    pub fn recompute_ranks(&self, category: Option<&str>) -> AppResult<()> {
        self.leaderboard_service.recompute_ranks(category)
    }

    /// Syncs a display name from the external users service so leaderboard
    /// rows can carry it.
    pub fn upsert_user_profile(
        &self,
        user_id: &str,
        display_name: Option<&str>,
    ) -> AppResult<()> {
        let conn = self.db_pool.get_connection()?;
        UserDirectoryRepository::upsert(&conn, user_id, display_name)
    }
}
