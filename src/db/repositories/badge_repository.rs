use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::badge::{Badge, BadgeCriteria, BadgeCriterion};

#[derive(Debug, Clone)]
pub struct BadgeRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub date_earned: String,
}

impl BadgeRow {
    pub fn into_record(self) -> Badge {
        Badge {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            date_earned: self.date_earned,
        }
    }
}

impl TryFrom<&Row<'_>> for BadgeRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            date_earned: row.get("date_earned")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BadgeCriteriaRow {
    pub name: String,
    pub description: String,
    pub criteria_type: String,
    pub action: Option<String>,
    pub threshold: i64,
}

impl BadgeCriteriaRow {
    pub fn into_record(self) -> AppResult<BadgeCriteria> {
        let criterion = match self.criteria_type.as_str() {
            "points" => BadgeCriterion::Points {
                threshold: self.threshold,
            },
            "action_count" => {
                let action = self.action.ok_or_else(|| {
                    AppError::validation(format!(
                        "badge criteria {} is action_count but has no action",
                        self.name
                    ))
                })?;
                BadgeCriterion::ActionCount {
                    action,
                    threshold: self.threshold,
                }
            }
            other => {
                return Err(AppError::validation(format!(
                    "unsupported badge criteria type: {other}"
                )))
            }
        };

        Ok(BadgeCriteria {
            name: self.name,
            description: self.description,
            criterion,
        })
    }
}

impl TryFrom<&Row<'_>> for BadgeCriteriaRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            name: row.get("name")?,
            description: row.get("description")?,
            criteria_type: row.get("criteria_type")?,
            action: row.get("action")?,
            threshold: row.get("threshold")?,
        })
    }
}

pub struct BadgeRepository;

impl BadgeRepository {
    pub fn has_badge(conn: &Connection, user_id: &str, name: &str) -> AppResult<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM badges WHERE user_id = :user_id AND name = :name",
                named_params! {":user_id": user_id, ":name": name},
                |row| row.get(0),
            )
            .optional()?;

        Ok(found.is_some())
    }

    /// Inserts the badge unless the user already holds it. Returns false when
    /// the (user, name) row was already present, leaving the original grant
    /// date untouched.
    pub fn insert_if_absent(conn: &Connection, badge: &BadgeRow) -> AppResult<bool> {
        let affected = conn.execute(
            r#"
                INSERT OR IGNORE INTO badges (id, user_id, name, description, date_earned)
                VALUES (:id, :user_id, :name, :description, :date_earned)
            "#,
            named_params! {
                ":id": &badge.id,
                ":user_id": &badge.user_id,
                ":name": &badge.name,
                ":description": &badge.description,
                ":date_earned": &badge.date_earned,
            },
        )?;

        Ok(affected > 0)
    }

    pub fn list_for_user(conn: &Connection, user_id: &str) -> AppResult<Vec<Badge>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT id, user_id, name, description, date_earned
                FROM badges
                WHERE user_id = :user_id
                ORDER BY date_earned ASC, name ASC
            "#,
        )?;

        let badges = stmt
            .query_map(named_params! {":user_id": user_id}, |row| {
                BadgeRow::try_from(row)
            })?
            .map(|row| row.map(BadgeRow::into_record).map_err(Into::into))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(badges)
    }

    pub fn upsert_criteria(conn: &Connection, criteria: &BadgeCriteriaRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO badge_criteria (name, description, criteria_type, action, threshold)
                VALUES (:name, :description, :criteria_type, :action, :threshold)
                ON CONFLICT (name) DO UPDATE SET
                    description = excluded.description,
                    criteria_type = excluded.criteria_type,
                    action = excluded.action,
                    threshold = excluded.threshold
            "#,
            named_params! {
                ":name": &criteria.name,
                ":description": &criteria.description,
                ":criteria_type": &criteria.criteria_type,
                ":action": &criteria.action,
                ":threshold": criteria.threshold,
            },
        )?;

        Ok(())
    }

    pub fn list_criteria(conn: &Connection) -> AppResult<Vec<BadgeCriteria>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT name, description, criteria_type, action, threshold
                FROM badge_criteria
                ORDER BY name ASC
            "#,
        )?;

        let criteria = stmt
            .query_map([], |row| BadgeCriteriaRow::try_from(row))?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(BadgeCriteriaRow::into_record)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(criteria)
    }
}
