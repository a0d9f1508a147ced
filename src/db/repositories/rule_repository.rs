use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;
use crate::models::rule::PointRule;

#[derive(Debug, Clone)]
pub struct PointRuleRow {
    pub action: String,
    pub points: i64,
    pub updated_at: String,
}

impl PointRuleRow {
    pub fn into_record(self) -> PointRule {
        PointRule {
            action: self.action,
            points: self.points,
            updated_at: self.updated_at,
        }
    }
}

impl TryFrom<&Row<'_>> for PointRuleRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            action: row.get("action")?,
            points: row.get("points")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct RuleRepository;

impl RuleRepository {
    pub fn find_by_action(conn: &Connection, action: &str) -> AppResult<Option<PointRule>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT action, points, updated_at
                FROM point_rules
                WHERE action = :action
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":action": action}, |row| {
                PointRuleRow::try_from(row)
            })
            .optional()?;

        Ok(row.map(PointRuleRow::into_record))
    }

    pub fn upsert(conn: &Connection, action: &str, points: i64, updated_at: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO point_rules (action, points, updated_at)
                VALUES (:action, :points, :updated_at)
                ON CONFLICT (action) DO UPDATE SET
                    points = excluded.points,
                    updated_at = excluded.updated_at
            "#,
            named_params! {
                ":action": action,
                ":points": points,
                ":updated_at": updated_at,
            },
        )?;

        Ok(())
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<PointRule>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT action, points, updated_at
                FROM point_rules
                ORDER BY action ASC
            "#,
        )?;

        let rules = stmt
            .query_map([], |row| PointRuleRow::try_from(row))?
            .map(|row| row.map(PointRuleRow::into_record).map_err(Into::into))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(rules)
    }

    pub fn delete(conn: &Connection, action: &str) -> AppResult<bool> {
        let affected = conn.execute(
            "DELETE FROM point_rules WHERE action = :action",
            named_params! {":action": action},
        )?;

        Ok(affected > 0)
    }
}
