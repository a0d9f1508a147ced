use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::db::repositories::badge_repository::{BadgeCriteriaRow, BadgeRepository, BadgeRow};
use crate::db::repositories::ledger_repository::LedgerRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::badge::{Badge, BadgeCriteria, BadgeCriterion};

/// Evaluates badge criteria against ledger state and grants badges
/// idempotently: a badge already held is never re-granted.
pub struct BadgeService {
    db: DbPool,
}

impl BadgeService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Runs every configured criterion for the user after an activity.
    /// `Points` criteria apply on any action; `ActionCount` criteria only
    /// when the triggering action matches. Returns the newly granted badges.
    pub fn evaluate(&self, user_id: &str, action: &str, total_points: i64) -> AppResult<Vec<Badge>> {
        let conn = self.db.get_connection()?;
        let criteria = BadgeRepository::list_criteria(&conn)?;
        let mut granted = Vec::new();

        for candidate in criteria {
            if BadgeRepository::has_badge(&conn, user_id, &candidate.name)? {
                continue;
            }

            let fulfilled = match &candidate.criterion {
                BadgeCriterion::Points { threshold } => total_points >= *threshold,
                BadgeCriterion::ActionCount {
                    action: wanted,
                    threshold,
                } => {
                    wanted.as_str() == action
                        && LedgerRepository::count_action(&conn, user_id, wanted)? >= *threshold
                }
            };

            if !fulfilled {
                continue;
            }

            let row = BadgeRow {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                name: candidate.name.clone(),
                description: candidate.description.clone(),
                date_earned: Utc::now().to_rfc3339(),
            };

            // The unique (user, name) index backstops a concurrent grant of
            // the same badge; losing the race is not an error.
            if BadgeRepository::insert_if_absent(&conn, &row)? {
                info!(
                    target: "app::badges",
                    %user_id,
                    badge = %row.name,
                    "badge awarded"
                );
                granted.push(row.into_record());
            }
        }

        Ok(granted)
    }

    pub fn get_user_achievements(&self, user_id: &str) -> AppResult<Vec<Badge>> {
        let conn = self.db.get_connection()?;
        BadgeRepository::list_for_user(&conn, user_id)
    }

    pub fn upsert_criteria(&self, criteria: BadgeCriteria) -> AppResult<()> {
        if criteria.name.trim().is_empty() {
            return Err(AppError::validation("badge name must not be empty"));
        }
        if criteria.criterion.threshold() < 1 {
            return Err(AppError::validation_with_details(
                "badge threshold must be at least 1",
                serde_json::json!({
                    "badge": criteria.name,
                    "threshold": criteria.criterion.threshold(),
                }),
            ));
        }
        if let BadgeCriterion::ActionCount { action, .. } = &criteria.criterion {
            if action.trim().is_empty() {
                return Err(AppError::validation(
                    "action_count criteria require an action name",
                ));
            }
        }

        let row = BadgeCriteriaRow {
            name: criteria.name.clone(),
            description: criteria.description.clone(),
            criteria_type: criteria.criterion.type_str().to_string(),
            action: match &criteria.criterion {
                BadgeCriterion::ActionCount { action, .. } => Some(action.clone()),
                BadgeCriterion::Points { .. } => None,
            },
            threshold: criteria.criterion.threshold(),
        };

        let conn = self.db.get_connection()?;
        BadgeRepository::upsert_criteria(&conn, &row)?;

        info!(target: "app::badges", badge = %criteria.name, criteria = %criteria.criterion, "badge criteria upserted");
        Ok(())
    }

    pub fn list_criteria(&self) -> AppResult<Vec<BadgeCriteria>> {
        let conn = self.db.get_connection()?;
        BadgeRepository::list_criteria(&conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ledger_service::LedgerService;
    use tempfile::tempdir;

    fn create_test_services() -> (BadgeService, LedgerService, tempfile::TempDir) {
        let dir = tempdir().expect("create temp dir");
        let db_path = dir.path().join("badges.sqlite");
        let pool = DbPool::new(db_path).expect("create db pool");
        (
            BadgeService::new(pool.clone()),
            LedgerService::new(pool),
            dir,
        )
    }

    fn points_badge(name: &str, threshold: i64) -> BadgeCriteria {
        BadgeCriteria {
            name: name.to_string(),
            description: format!("Earn {threshold} points"),
            criterion: BadgeCriterion::Points { threshold },
        }
    }

    fn action_badge(name: &str, action: &str, threshold: i64) -> BadgeCriteria {
        BadgeCriteria {
            name: name.to_string(),
            description: format!("Perform {action} {threshold} times"),
            criterion: BadgeCriterion::ActionCount {
                action: action.to_string(),
                threshold,
            },
        }
    }

    #[test]
    fn test_points_badge_granted_at_threshold() {
        let (badges, ledger, _dir) = create_test_services();
        badges.upsert_criteria(points_badge("Centurion", 100)).unwrap();

        ledger.record_points("u1", "quiz_complete", 50).unwrap();
        assert!(badges.evaluate("u1", "quiz_complete", 50).unwrap().is_empty());

        ledger.record_points("u1", "quiz_complete", 50).unwrap();
        let granted = badges.evaluate("u1", "quiz_complete", 100).unwrap();
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].name, "Centurion");
    }

    #[test]
    fn test_points_badge_ignores_triggering_action() {
        let (badges, ledger, _dir) = create_test_services();
        badges.upsert_criteria(points_badge("Centurion", 100)).unwrap();

        ledger.record_points("u1", "daily_login", 120).unwrap();
        // Points criteria evaluate on any action.
        let granted = badges.evaluate("u1", "daily_login", 120).unwrap();
        assert_eq!(granted.len(), 1);
    }

    #[test]
    fn test_action_count_badge_filters_on_action() {
        let (badges, ledger, _dir) = create_test_services();
        badges
            .upsert_criteria(action_badge("Quiz Master", "quiz_complete", 2))
            .unwrap();

        ledger.record_points("u1", "quiz_complete", 50).unwrap();
        ledger.record_points("u1", "quiz_complete", 50).unwrap();

        // Triggered by a different action: the criterion is skipped even
        // though the count is already there.
        assert!(badges.evaluate("u1", "daily_login", 100).unwrap().is_empty());

        let granted = badges.evaluate("u1", "quiz_complete", 100).unwrap();
        assert_eq!(granted.len(), 1);
        assert_eq!(granted[0].name, "Quiz Master");
    }

    #[test]
    fn test_award_is_idempotent() {
        let (badges, ledger, _dir) = create_test_services();
        badges.upsert_criteria(points_badge("Centurion", 100)).unwrap();

        ledger.record_points("u1", "quiz_complete", 150).unwrap();
        let first = badges.evaluate("u1", "quiz_complete", 150).unwrap();
        assert_eq!(first.len(), 1);

        // Criteria still satisfied on the next event; no duplicate row.
        ledger.record_points("u1", "quiz_complete", 50).unwrap();
        let second = badges.evaluate("u1", "quiz_complete", 200).unwrap();
        assert!(second.is_empty());

        let held = badges.get_user_achievements("u1").unwrap();
        assert_eq!(held.len(), 1);
    }

    #[test]
    fn test_invalid_criteria_rejected() {
        let (badges, _ledger, _dir) = create_test_services();

        // Threshold errors carry the offending values in the details payload.
        match badges.upsert_criteria(points_badge("Zero", 0)) {
            Err(AppError::Validation { details, .. }) => {
                let details = details.expect("details payload");
                assert_eq!(details["badge"], "Zero");
                assert_eq!(details["threshold"], 0);
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        assert!(badges
            .upsert_criteria(action_badge("Blank", "  ", 3))
            .is_err());
    }
}
