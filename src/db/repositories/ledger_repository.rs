use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;
use crate::models::ledger::{LedgerEntry, LedgerRecord};

#[derive(Debug, Clone)]
pub struct LedgerRow {
    pub user_id: String,
    pub total_points: i64,
    pub last_updated: String,
}

impl LedgerRow {
    pub fn into_record(self) -> LedgerRecord {
        LedgerRecord {
            user_id: self.user_id,
            total_points: self.total_points,
            last_updated: self.last_updated,
        }
    }
}

impl TryFrom<&Row<'_>> for LedgerRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            total_points: row.get("total_points")?,
            last_updated: row.get("last_updated")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct LedgerEntryRow {
    pub id: String,
    pub action: String,
    pub points: i64,
    pub recorded_at: String,
}

impl LedgerEntryRow {
    pub fn into_record(self) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            action: self.action,
            points: self.points,
            recorded_at: self.recorded_at,
        }
    }
}

impl TryFrom<&Row<'_>> for LedgerEntryRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            action: row.get("action")?,
            points: row.get("points")?,
            recorded_at: row.get("recorded_at")?,
        })
    }
}

pub struct LedgerRepository;

impl LedgerRepository {
    pub fn find_by_user(conn: &Connection, user_id: &str) -> AppResult<Option<LedgerRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT user_id, total_points, last_updated
                FROM points_ledgers
                WHERE user_id = :user_id
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":user_id": user_id}, |row| {
                LedgerRow::try_from(row)
            })
            .optional()?;

        Ok(row.map(LedgerRow::into_record))
    }

    /// Creates the ledger row if the user has none yet. Lazy creation on
    /// first tracked activity; ledgers are never deleted.
    pub fn ensure_exists(conn: &Connection, user_id: &str, now: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT OR IGNORE INTO points_ledgers (user_id, total_points, last_updated)
                VALUES (:user_id, 0, :now)
            "#,
            named_params! {":user_id": user_id, ":now": now},
        )?;

        Ok(())
    }

    /// Appends one history entry and moves the running total in the same
    /// statement pair. Callers wrap this in a transaction so the two writes
    /// land atomically.
    pub fn append_entry(
        conn: &Connection,
        user_id: &str,
        entry: &LedgerEntryRow,
    ) -> AppResult<i64> {
        conn.execute(
            r#"
                INSERT INTO points_history (id, user_id, action, points, recorded_at)
                VALUES (:id, :user_id, :action, :points, :recorded_at)
            "#,
            named_params! {
                ":id": &entry.id,
                ":user_id": user_id,
                ":action": &entry.action,
                ":points": entry.points,
                ":recorded_at": &entry.recorded_at,
            },
        )?;

        conn.execute(
            r#"
                UPDATE points_ledgers SET
                    total_points = total_points + :points,
                    last_updated = :now
                WHERE user_id = :user_id
            "#,
            named_params! {
                ":user_id": user_id,
                ":points": entry.points,
                ":now": &entry.recorded_at,
            },
        )?;

        let total = conn.query_row(
            "SELECT total_points FROM points_ledgers WHERE user_id = :user_id",
            named_params! {":user_id": user_id},
            |row| row.get(0),
        )?;

        Ok(total)
    }

    pub fn list_history(
        conn: &Connection,
        user_id: &str,
        limit: Option<usize>,
    ) -> AppResult<Vec<LedgerEntry>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, action, points, recorded_at
                FROM points_history
                WHERE user_id = :user_id
                ORDER BY rowid DESC
                LIMIT :limit
            "#,
        )?;

        let limit = limit.map(|value| value as i64).unwrap_or(-1);
        let entries = stmt
            .query_map(named_params! {":user_id": user_id, ":limit": limit}, |row| {
                LedgerEntryRow::try_from(row)
            })?
            .map(|row| row.map(LedgerEntryRow::into_record).map_err(Into::into))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(entries)
    }

    pub fn count_action(conn: &Connection, user_id: &str, action: &str) -> AppResult<i64> {
        let count = conn.query_row(
            r#"
                SELECT COUNT(*)
                FROM points_history
                WHERE user_id = :user_id AND action = :action
            "#,
            named_params! {":user_id": user_id, ":action": action},
            |row| row.get(0),
        )?;

        Ok(count)
    }
}
