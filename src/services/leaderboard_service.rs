use std::ops::Deref;

use chrono::{Duration, Months, Utc};
use rusqlite::TransactionBehavior;
use tracing::debug;

use crate::db::repositories::leaderboard_repository::{LeaderboardRepository, GLOBAL_CATEGORY};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::leaderboard::{LeaderboardRow, Timeframe};

pub const DEFAULT_TOP_K: usize = 10;

/// Maintains per-category score entries with dense 1-based ranks. Ranks are
/// recomputed synchronously after every upsert; the whole re-rank runs as a
/// single batch transaction, so concurrent recomputations serialize instead
/// of interleaving partial rank assignments.
pub struct LeaderboardService {
    db: DbPool,
}

impl LeaderboardService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Creates or overwrites the user's score, then re-ranks the board. A
    /// single score change can shift every other entry's rank, hence the
    /// full recompute.
    pub fn upsert_score(
        &self,
        user_id: &str,
        category: Option<&str>,
        score: i64,
    ) -> AppResult<()> {
        if user_id.trim().is_empty() {
            return Err(AppError::validation("user id must not be empty"));
        }

        let category = category.unwrap_or(GLOBAL_CATEGORY);
        let now = Utc::now().to_rfc3339();

        let mut conn = self.db.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let tx_conn = tx.deref();

        LeaderboardRepository::upsert_score(tx_conn, user_id, category, score, &now)?;
        Self::recompute_ranks_in(tx_conn, category)?;

        tx.commit()?;

        debug!(
            target: "app::leaderboard",
            %user_id,
            category = %category,
            score,
            "leaderboard score upserted"
        );

        Ok(())
    }

    /// Re-ranks one board without touching scores.
    pub fn recompute_ranks(&self, category: Option<&str>) -> AppResult<()> {
        let category = category.unwrap_or(GLOBAL_CATEGORY);

        let mut conn = self.db.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        Self::recompute_ranks_in(tx.deref(), category)?;
        tx.commit()?;

        Ok(())
    }

    fn recompute_ranks_in(conn: &rusqlite::Connection, category: &str) -> AppResult<()> {
        let entries = LeaderboardRepository::list_for_ranking(conn, category)?;

        for (position, entry) in entries.iter().enumerate() {
            let rank = position as i64 + 1;
            if entry.rank != Some(rank) {
                LeaderboardRepository::set_rank(conn, &entry.user_id, category, rank)?;
            }
        }

        Ok(())
    }

    /// Top-K view of a board. A timeframe filters entries by their last
    /// update; rows are re-numbered by position within the filtered view so
    /// ranks stay dense.
    pub fn get_leaderboard(
        &self,
        category: Option<&str>,
        timeframe: Option<Timeframe>,
        limit: Option<usize>,
    ) -> AppResult<Vec<LeaderboardRow>> {
        let category = category.unwrap_or(GLOBAL_CATEGORY);
        let limit = limit.unwrap_or(DEFAULT_TOP_K);
        let cutoff = timeframe.map(|frame| {
            let now = Utc::now();
            let start = match frame {
                Timeframe::Daily => now - Duration::days(1),
                Timeframe::Weekly => now - Duration::days(7),
                Timeframe::Monthly => now - Months::new(1),
            };
            start.to_rfc3339()
        });

        let conn = self.db.get_connection()?;
        let mut rows =
            LeaderboardRepository::query_top(&conn, category, cutoff.as_deref(), limit)?;

        if cutoff.is_some() {
            for (position, row) in rows.iter_mut().enumerate() {
                row.rank = position as i64 + 1;
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_service() -> (LeaderboardService, DbPool, tempfile::TempDir) {
        let dir = tempdir().expect("create temp dir");
        let db_path = dir.path().join("leaderboard.sqlite");
        let pool = DbPool::new(db_path).expect("create db pool");
        (LeaderboardService::new(pool.clone()), pool, dir)
    }

    #[test]
    fn test_dense_rank_ordering() {
        let (service, _pool, _dir) = create_test_service();

        service.upsert_score("alice", None, 300).unwrap();
        service.upsert_score("bob", None, 500).unwrap();
        service.upsert_score("bob", None, 500).unwrap(); // overwrite, same score
        service.upsert_score("carol", None, 100).unwrap();

        let rows = service.get_leaderboard(None, None, None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].user_id, "bob");
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].user_id, "alice");
        assert_eq!(rows[1].rank, 2);
        assert_eq!(rows[2].user_id, "carol");
        assert_eq!(rows[2].rank, 3);
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let (service, _pool, _dir) = create_test_service();

        service.upsert_score("zed", None, 500).unwrap();
        service.upsert_score("amy", None, 500).unwrap();

        let first = service.get_leaderboard(None, None, None).unwrap();
        // Re-rank with unchanged inputs must be a fixed point.
        service.recompute_ranks(None).unwrap();
        let second = service.get_leaderboard(None, None, None).unwrap();

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.user_id, b.user_id);
            assert_eq!(a.rank, b.rank);
        }
        assert_eq!(first[0].user_id, "amy");
        assert_eq!(first[1].user_id, "zed");
    }

    #[test]
    fn test_categories_are_independent() {
        let (service, _pool, _dir) = create_test_service();

        service.upsert_score("alice", Some("quizzes"), 50).unwrap();
        service.upsert_score("bob", None, 500).unwrap();

        let quizzes = service
            .get_leaderboard(Some("quizzes"), None, None)
            .unwrap();
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].user_id, "alice");
        assert_eq!(quizzes[0].rank, 1);

        let global = service.get_leaderboard(None, None, None).unwrap();
        assert_eq!(global.len(), 1);
        assert_eq!(global[0].user_id, "bob");
    }

    #[test]
    fn test_top_k_limit() {
        let (service, _pool, _dir) = create_test_service();

        for index in 0..15i64 {
            service
                .upsert_score(&format!("user{index:02}"), None, index)
                .unwrap();
        }

        let rows = service.get_leaderboard(None, None, None).unwrap();
        assert_eq!(rows.len(), DEFAULT_TOP_K);
        assert_eq!(rows[0].score, 14);

        let top3 = service.get_leaderboard(None, None, Some(3)).unwrap();
        assert_eq!(top3.len(), 3);
    }

    #[test]
    fn test_timeframe_includes_fresh_entries() {
        let (service, _pool, _dir) = create_test_service();

        service.upsert_score("alice", None, 300).unwrap();
        let rows = service
            .get_leaderboard(None, Some(Timeframe::Daily), None)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rank, 1);
    }
}
