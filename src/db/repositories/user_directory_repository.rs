use rusqlite::{named_params, Connection};

use crate::error::AppResult;

/// Minimal read-through copy of user display names. Users live in an
/// external service; the host app syncs the fields the leaderboard joins.
pub struct UserDirectoryRepository;

impl UserDirectoryRepository {
    pub fn upsert(conn: &Connection, user_id: &str, display_name: Option<&str>) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO user_directory (user_id, display_name)
                VALUES (:user_id, :display_name)
                ON CONFLICT (user_id) DO UPDATE SET
                    display_name = excluded.display_name
            "#,
            named_params! {":user_id": user_id, ":display_name": display_name},
        )?;

        Ok(())
    }
}
