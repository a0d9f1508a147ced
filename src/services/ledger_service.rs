use std::ops::Deref;

use chrono::Utc;
use rusqlite::TransactionBehavior;
use tracing::debug;
use uuid::Uuid;

use crate::db::repositories::ledger_repository::{LedgerEntryRow, LedgerRepository};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::ledger::{LedgerEntry, UserLevel, UserPoints};
use crate::services::level;

/// Outcome of one ledger append.
#[derive(Debug, Clone)]
pub struct RecordedPoints {
    pub new_total: i64,
    pub entry: LedgerEntry,
}

/// Append-only per-user points ledger. The running total and the history are
/// written in one transaction, so `total == sum(history)` holds at all times.
pub struct LedgerService {
    db: DbPool,
}

impl LedgerService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Appends an entry and moves the total atomically. The immediate
    /// transaction takes SQLite's write lock up front, so two concurrent
    /// appends for the same user serialize instead of losing an increment.
    pub fn record_points(
        &self,
        user_id: &str,
        action: &str,
        points: i64,
    ) -> AppResult<RecordedPoints> {
        if user_id.trim().is_empty() {
            return Err(AppError::validation("user id must not be empty"));
        }

        let now = Utc::now().to_rfc3339();
        let entry_row = LedgerEntryRow {
            id: Uuid::new_v4().to_string(),
            action: action.to_string(),
            points,
            recorded_at: now.clone(),
        };

        let mut conn = self.db.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let tx_conn = tx.deref();

        LedgerRepository::ensure_exists(tx_conn, user_id, &now)?;
        let new_total = LedgerRepository::append_entry(tx_conn, user_id, &entry_row)?;

        tx.commit()?;

        debug!(
            target: "app::ledger",
            %user_id,
            %action,
            points,
            new_total,
            "points recorded"
        );

        Ok(RecordedPoints {
            new_total,
            entry: entry_row.into_record(),
        })
    }

    /// Ledger plus derived level fields. Users with no ledger yet resolve to
    /// the zero default rather than an error.
    pub fn get_user_points(
        &self,
        user_id: &str,
        history_limit: Option<usize>,
    ) -> AppResult<UserPoints> {
        let conn = self.db.get_connection()?;

        let Some(record) = LedgerRepository::find_by_user(&conn, user_id)? else {
            return Ok(UserPoints {
                user_id: user_id.to_string(),
                total_points: 0,
                history: Vec::new(),
                level: 1,
                next_level_points: level::points_for_next_level(1),
                last_updated: None,
            });
        };

        let history = LedgerRepository::list_history(&conn, user_id, history_limit)?;
        let current_level = level::level_for_points(record.total_points);

        Ok(UserPoints {
            user_id: record.user_id,
            total_points: record.total_points,
            history,
            level: current_level,
            next_level_points: level::points_for_next_level(current_level),
            last_updated: Some(record.last_updated),
        })
    }

    pub fn get_user_level(&self, user_id: &str) -> AppResult<UserLevel> {
        let conn = self.db.get_connection()?;

        let total_points = LedgerRepository::find_by_user(&conn, user_id)?
            .map(|record| record.total_points)
            .unwrap_or(0);

        let current_level = level::level_for_points(total_points);

        Ok(UserLevel {
            level: current_level,
            current_points: total_points,
            next_level_points: level::points_for_next_level(current_level),
            progress: level::progress_within_level(total_points),
        })
    }

    pub fn count_action(&self, user_id: &str, action: &str) -> AppResult<i64> {
        let conn = self.db.get_connection()?;
        LedgerRepository::count_action(&conn, user_id, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_service() -> (LedgerService, tempfile::TempDir) {
        let dir = tempdir().expect("create temp dir");
        let db_path = dir.path().join("ledger.sqlite");
        let pool = DbPool::new(db_path).expect("create db pool");
        (LedgerService::new(pool), dir)
    }

    #[test]
    fn test_total_tracks_sum_of_entries() {
        let (service, _dir) = create_test_service();

        service.record_points("u1", "quiz_complete", 50).unwrap();
        service.record_points("u1", "daily_login", 5).unwrap();
        let recorded = service.record_points("u1", "penalty", -20).unwrap();

        assert_eq!(recorded.new_total, 35);

        let points = service.get_user_points("u1", None).unwrap();
        assert_eq!(points.total_points, 35);
        assert_eq!(points.history.len(), 3);
        let summed: i64 = points.history.iter().map(|entry| entry.points).sum();
        assert_eq!(summed, points.total_points);
    }

    #[test]
    fn test_zero_default_for_unknown_user() {
        let (service, _dir) = create_test_service();

        let points = service.get_user_points("nobody", None).unwrap();
        assert_eq!(points.total_points, 0);
        assert_eq!(points.level, 1);
        assert_eq!(points.next_level_points, 100);
        assert!(points.history.is_empty());
        assert!(points.last_updated.is_none());

        let user_level = service.get_user_level("nobody").unwrap();
        assert_eq!(user_level.level, 1);
        assert_eq!(user_level.progress, 0.0);
    }

    #[test]
    fn test_level_derives_from_total() {
        let (service, _dir) = create_test_service();

        service.record_points("u2", "quiz_complete", 100).unwrap();
        let user_level = service.get_user_level("u2").unwrap();
        assert_eq!(user_level.level, 2);
        assert_eq!(user_level.next_level_points, 400);
    }

    #[test]
    fn test_count_action() {
        let (service, _dir) = create_test_service();

        service.record_points("u3", "quiz_complete", 50).unwrap();
        service.record_points("u3", "quiz_complete", 50).unwrap();
        service.record_points("u3", "daily_login", 5).unwrap();

        assert_eq!(service.count_action("u3", "quiz_complete").unwrap(), 2);
        assert_eq!(service.count_action("u3", "daily_login").unwrap(), 1);
        assert_eq!(service.count_action("u3", "nothing").unwrap(), 0);
    }

    #[test]
    fn test_empty_user_id_rejected() {
        let (service, _dir) = create_test_service();
        let result = service.record_points("  ", "quiz_complete", 50);
        assert!(result.is_err());
    }
}
