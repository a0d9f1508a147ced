use chrono::Utc;
use tracing::info;

use crate::db::repositories::rule_repository::RuleRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::rule::{PointRule, PointRuleUpsert};

/// Point rule registry. Rules are admin-configured and read-only on the
/// activity path; `resolve` is the per-event lookup.
pub struct RuleService {
    db: DbPool,
}

impl RuleService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Looks up the rule for an action. A miss is a client error: it almost
    /// always means a typo or an action nobody configured.
    pub fn resolve(&self, action: &str) -> AppResult<PointRule> {
        let conn = self.db.get_connection()?;

        RuleRepository::find_by_action(&conn, action)?
            .ok_or_else(|| AppError::unknown_action(action))
    }

    pub fn upsert(&self, input: PointRuleUpsert) -> AppResult<PointRule> {
        if input.action.trim().is_empty() {
            return Err(AppError::validation("action name must not be empty"));
        }

        let conn = self.db.get_connection()?;
        let now = Utc::now().to_rfc3339();
        RuleRepository::upsert(&conn, &input.action, input.points, &now)?;

        info!(target: "app::rules", action = %input.action, points = input.points, "point rule upserted");

        self.resolve(&input.action)
    }

    pub fn list(&self) -> AppResult<Vec<PointRule>> {
        let conn = self.db.get_connection()?;
        RuleRepository::list_all(&conn)
    }

    pub fn delete(&self, action: &str) -> AppResult<()> {
        let conn = self.db.get_connection()?;
        if !RuleRepository::delete(&conn, action)? {
            return Err(AppError::not_found());
        }

        info!(target: "app::rules", %action, "point rule deleted");
        Ok(())
    }
}
