use std::convert::TryFrom;

use rusqlite::{named_params, Connection, Row};

use crate::error::AppResult;
use crate::models::leaderboard::{LeaderboardEntry, LeaderboardRow};

/// The global (uncategorized) board is stored under the empty-string
/// category so it can share the (user_id, category) primary key.
pub const GLOBAL_CATEGORY: &str = "";

#[derive(Debug, Clone)]
pub struct LeaderboardEntryRow {
    pub user_id: String,
    pub category: String,
    pub score: i64,
    pub rank: Option<i64>,
    pub updated_at: String,
}

impl LeaderboardEntryRow {
    pub fn into_record(self) -> LeaderboardEntry {
        let category = if self.category.is_empty() {
            None
        } else {
            Some(self.category)
        };

        LeaderboardEntry {
            user_id: self.user_id,
            category,
            score: self.score,
            rank: self.rank,
            updated_at: self.updated_at,
        }
    }
}

impl TryFrom<&Row<'_>> for LeaderboardEntryRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            category: row.get("category")?,
            score: row.get("score")?,
            rank: row.get("rank")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct LeaderboardRepository;

impl LeaderboardRepository {
    pub fn upsert_score(
        conn: &Connection,
        user_id: &str,
        category: &str,
        score: i64,
        now: &str,
    ) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO leaderboard_entries (user_id, category, score, updated_at)
                VALUES (:user_id, :category, :score, :now)
                ON CONFLICT (user_id, category) DO UPDATE SET
                    score = excluded.score,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":user_id": user_id,
                ":category": category,
                ":score": score,
                ":now": now,
            },
        )?;

        Ok(())
    }

    /// All entries of one board, in rank order: score descending, then
    /// user_id ascending as the deterministic tie-break.
    pub fn list_for_ranking(conn: &Connection, category: &str) -> AppResult<Vec<LeaderboardEntry>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT user_id, category, score, rank, updated_at
                FROM leaderboard_entries
                WHERE category = :category
                ORDER BY score DESC, user_id ASC
            "#,
        )?;

        let entries = stmt
            .query_map(named_params! {":category": category}, |row| {
                LeaderboardEntryRow::try_from(row)
            })?
            .map(|row| row.map(LeaderboardEntryRow::into_record).map_err(Into::into))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(entries)
    }

    pub fn set_rank(conn: &Connection, user_id: &str, category: &str, rank: i64) -> AppResult<()> {
        conn.execute(
            r#"
                UPDATE leaderboard_entries SET rank = :rank
                WHERE user_id = :user_id AND category = :category
            "#,
            named_params! {":user_id": user_id, ":category": category, ":rank": rank},
        )?;

        Ok(())
    }

    /// Top-K ranked rows, display names joined from the user directory.
    /// `cutoff` excludes entries not updated since it (timeframe boards).
    pub fn query_top(
        conn: &Connection,
        category: &str,
        cutoff: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<LeaderboardRow>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    le.user_id AS user_id,
                    ud.display_name AS display_name,
                    le.score AS score,
                    le.rank AS rank
                FROM leaderboard_entries le
                LEFT JOIN user_directory ud ON ud.user_id = le.user_id
                WHERE le.category = :category
                  AND (:cutoff IS NULL OR le.updated_at >= :cutoff)
                ORDER BY le.score DESC, le.user_id ASC
                LIMIT :limit
            "#,
        )?;

        let rows = stmt
            .query_map(
                named_params! {
                    ":category": category,
                    ":cutoff": cutoff,
                    ":limit": limit as i64,
                },
                |row| {
                    Ok(LeaderboardRow {
                        user_id: row.get("user_id")?,
                        display_name: row.get("display_name")?,
                        score: row.get("score")?,
                        rank: row.get::<_, Option<i64>>("rank")?.unwrap_or(0),
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
