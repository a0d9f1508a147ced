use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::streak::{StreakDay, StreakState, DATE_FORMAT};

#[derive(Debug, Clone)]
pub struct StreakRow {
    pub user_id: String,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub last_activity_date: Option<String>,
}

impl StreakRow {
    pub fn into_state(self, history: Vec<StreakDay>) -> AppResult<StreakState> {
        let last_activity_date = match self.last_activity_date {
            Some(raw) => Some(parse_date(&raw)?),
            None => None,
        };

        Ok(StreakState {
            user_id: self.user_id,
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_activity_date,
            streak_history: history,
        })
    }
}

impl TryFrom<&Row<'_>> for StreakRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            current_streak: row.get("current_streak")?,
            longest_streak: row.get("longest_streak")?,
            last_activity_date: row.get("last_activity_date")?,
        })
    }
}

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|err| AppError::validation(format!("invalid stored streak date {raw}: {err}")))
}

pub struct StreakRepository;

impl StreakRepository {
    pub fn find_by_user(conn: &Connection, user_id: &str) -> AppResult<Option<StreakState>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT user_id, current_streak, longest_streak, last_activity_date
                FROM streaks
                WHERE user_id = :user_id
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":user_id": user_id}, |row| {
                StreakRow::try_from(row)
            })
            .optional()?;

        match row {
            Some(row) => {
                let history = Self::list_history(conn, user_id)?;
                Ok(Some(row.into_state(history)?))
            }
            None => Ok(None),
        }
    }

    pub fn ensure_exists(conn: &Connection, user_id: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT OR IGNORE INTO streaks (user_id, current_streak, longest_streak)
                VALUES (:user_id, 0, 0)
            "#,
            named_params! {":user_id": user_id},
        )?;

        Ok(())
    }

    pub fn update_counters(
        conn: &Connection,
        user_id: &str,
        current_streak: i64,
        longest_streak: i64,
        last_activity_date: NaiveDate,
    ) -> AppResult<()> {
        let affected = conn.execute(
            r#"
                UPDATE streaks SET
                    current_streak = :current_streak,
                    longest_streak = :longest_streak,
                    last_activity_date = :last_activity_date
                WHERE user_id = :user_id
            "#,
            named_params! {
                ":user_id": user_id,
                ":current_streak": current_streak,
                ":longest_streak": longest_streak,
                ":last_activity_date": last_activity_date.format(DATE_FORMAT).to_string(),
            },
        )?;

        if affected == 0 {
            return Err(AppError::not_found());
        }

        Ok(())
    }

    pub fn has_completed_day(conn: &Connection, user_id: &str, date: NaiveDate) -> AppResult<bool> {
        let found: Option<i64> = conn
            .query_row(
                r#"
                    SELECT 1 FROM streak_history
                    WHERE user_id = :user_id AND date = :date AND completed = 1
                "#,
                named_params! {
                    ":user_id": user_id,
                    ":date": date.format(DATE_FORMAT).to_string(),
                },
                |row| row.get(0),
            )
            .optional()?;

        Ok(found.is_some())
    }

    pub fn record_day(conn: &Connection, user_id: &str, date: NaiveDate) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT OR REPLACE INTO streak_history (user_id, date, completed)
                VALUES (:user_id, :date, 1)
            "#,
            named_params! {
                ":user_id": user_id,
                ":date": date.format(DATE_FORMAT).to_string(),
            },
        )?;

        Ok(())
    }

    /// Keeps only the `cap` most recent dates for the user.
    pub fn trim_history(conn: &Connection, user_id: &str, cap: usize) -> AppResult<()> {
        conn.execute(
            r#"
                DELETE FROM streak_history
                WHERE user_id = :user_id AND date NOT IN (
                    SELECT date FROM streak_history
                    WHERE user_id = :user_id
                    ORDER BY date DESC
                    LIMIT :cap
                )
            "#,
            named_params! {":user_id": user_id, ":cap": cap as i64},
        )?;

        Ok(())
    }

    pub fn list_history(conn: &Connection, user_id: &str) -> AppResult<Vec<StreakDay>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT date, completed
                FROM streak_history
                WHERE user_id = :user_id
                ORDER BY date DESC
            "#,
        )?;

        let days = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                let date: String = row.get("date")?;
                let completed: i64 = row.get("completed")?;
                Ok((date, completed))
            })?
            .map(|row| {
                let (date, completed) = row.map_err(AppError::from)?;
                Ok(StreakDay {
                    date: parse_date(&date)?,
                    completed: completed != 0,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(days)
    }
}
