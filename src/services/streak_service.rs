use std::ops::Deref;

use chrono::{NaiveDate, Utc};
use rusqlite::TransactionBehavior;
use tracing::debug;

use crate::db::repositories::streak_repository::StreakRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::streak::{StreakInfo, StreakState};

/// How many distinct dates of history are retained per user.
pub const HISTORY_CAP: usize = 30;

/// Day-granularity activity streaks. An activity on the day after the last
/// one extends the streak, a gap resets it to 1, and repeated activity on
/// the same day is a no-op.
pub struct StreakService {
    db: DbPool,
    history_cap: usize,
}

impl StreakService {
    pub fn new(db: DbPool) -> Self {
        Self {
            db,
            history_cap: HISTORY_CAP,
        }
    }

    pub fn with_history_cap(db: DbPool, history_cap: usize) -> Self {
        Self { db, history_cap }
    }

    pub fn record_activity_today(&self, user_id: &str) -> AppResult<StreakInfo> {
        self.record_activity(user_id, Utc::now().date_naive())
    }

    /// Records a qualifying activity for `date` (already day-granular).
    pub fn record_activity(&self, user_id: &str, date: NaiveDate) -> AppResult<StreakInfo> {
        if user_id.trim().is_empty() {
            return Err(AppError::validation("user id must not be empty"));
        }

        let mut conn = self.db.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let tx_conn = tx.deref();

        StreakRepository::ensure_exists(tx_conn, user_id)?;
        let state = StreakRepository::find_by_user(tx_conn, user_id)?
            .ok_or_else(AppError::not_found)?;

        // Same-day repeat: nothing to update, the streak already counts today.
        if StreakRepository::has_completed_day(tx_conn, user_id, date)? {
            tx.commit()?;
            return Ok(StreakInfo {
                current_streak: state.current_streak,
                longest_streak: state.longest_streak,
                last_activity_date: state.last_activity_date,
            });
        }

        let current_streak = match state.last_activity_date {
            Some(last) => {
                let gap_days = (date - last).num_days();
                if gap_days == 1 {
                    state.current_streak + 1
                } else if gap_days == 0 {
                    // Covered by the history check above; keep as-is.
                    state.current_streak.max(1)
                } else {
                    1
                }
            }
            None => 1,
        };
        let longest_streak = state.longest_streak.max(current_streak);

        StreakRepository::update_counters(tx_conn, user_id, current_streak, longest_streak, date)?;
        StreakRepository::record_day(tx_conn, user_id, date)?;
        StreakRepository::trim_history(tx_conn, user_id, self.history_cap)?;

        tx.commit()?;

        debug!(
            target: "app::streak",
            %user_id,
            %date,
            current_streak,
            longest_streak,
            "streak activity recorded"
        );

        Ok(StreakInfo {
            current_streak,
            longest_streak,
            last_activity_date: Some(date),
        })
    }

    /// Full streak state including retained history. A user with no recorded
    /// activity resolves to the zero default.
    pub fn get_user_streak(&self, user_id: &str) -> AppResult<StreakState> {
        let conn = self.db.get_connection()?;

        Ok(StreakRepository::find_by_user(&conn, user_id)?
            .unwrap_or_else(|| StreakState::empty(user_id)))
    }
}
