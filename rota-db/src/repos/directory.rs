//! Users and teams

use sqlx::sqlite::SqliteConnection;

use crate::models::{Team, TeamMember, User};
use crate::{Error, Result};

/// Repository for team membership and user activity
pub struct Directory<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> Directory<'c> {
    /// Create a new repository on the given connection
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Create the team if missing and insert or update every listed member
    ///
    /// A member that already belongs to another team is moved to this one.
    pub async fn upsert_team(&mut self, team: &Team) -> Result<()> {
        sqlx::query("INSERT INTO teams (team_name) VALUES (?) ON CONFLICT (team_name) DO NOTHING")
            .bind(&team.team_name)
            .execute(&mut *self.conn)
            .await?;

        for member in &team.members {
            sqlx::query(
                r#"
                INSERT INTO users (user_id, username, team_name, is_active)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (user_id) DO UPDATE SET
                    username = excluded.username,
                    team_name = excluded.team_name,
                    is_active = excluded.is_active
                "#,
            )
            .bind(&member.user_id)
            .bind(&member.username)
            .bind(&team.team_name)
            .bind(member.is_active)
            .execute(&mut *self.conn)
            .await?;
        }

        Ok(())
    }

    /// Whether a team with this name was ever registered
    pub async fn team_exists(&mut self, team_name: &str) -> Result<bool> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM teams WHERE team_name = ?)")
                .bind(team_name)
                .fetch_one(&mut *self.conn)
                .await?;
        Ok(exists.0)
    }

    /// Get a team with all of its members
    ///
    /// A registered team without members is returned with an empty member
    /// list; only an unknown team name is an error.
    pub async fn get_team(&mut self, team_name: &str) -> Result<Team> {
        let members = sqlx::query_as::<_, TeamMember>(
            "SELECT user_id, username, is_active FROM users WHERE team_name = ? ORDER BY user_id",
        )
        .bind(team_name)
        .fetch_all(&mut *self.conn)
        .await?;

        if members.is_empty() && !self.team_exists(team_name).await? {
            return Err(Error::TeamNotFound(team_name.to_string()));
        }

        Ok(Team {
            team_name: team_name.to_string(),
            members,
        })
    }

    /// Find a user by ID
    pub async fn find_user(&mut self, user_id: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            "SELECT user_id, username, team_name, is_active FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }

    /// Toggle a single user's active flag
    pub async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<User> {
        let affected = sqlx::query("UPDATE users SET is_active = ? WHERE user_id = ?")
            .bind(is_active)
            .bind(user_id)
            .execute(&mut *self.conn)
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(Error::UserNotFound(user_id.to_string()));
        }

        self.find_user(user_id).await
    }

    /// Active members of a team, optionally leaving one user out
    ///
    /// Sorted by user ID so that callers picking at random from the result
    /// get reproducible draws for a given random source.
    pub async fn active_team_members(
        &mut self,
        team_name: &str,
        excluding: Option<&str>,
    ) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT user_id FROM users
            WHERE team_name = ? AND is_active = 1 AND (? IS NULL OR user_id <> ?)
            ORDER BY user_id
            "#,
        )
        .bind(team_name)
        .bind(excluding)
        .bind(excluding)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Mark the listed users inactive, ignoring IDs outside the team
    ///
    /// Returns the number of users whose row was updated. The IDs travel as
    /// one JSON array parameter, so the list length is not bounded by
    /// SQLite's host parameter limit.
    pub async fn deactivate_in_team(&mut self, team_name: &str, user_ids: &[String]) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let ids = serde_json::to_string(user_ids)?;
        let result = sqlx::query(
            r#"
            UPDATE users SET is_active = 0
            WHERE team_name = ? AND user_id IN (SELECT value FROM json_each(?))
            "#,
        )
        .bind(team_name)
        .bind(ids)
        .execute(&mut *self.conn)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_team, setup_db};

    #[tokio::test]
    async fn test_upsert_and_get_team() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u2", true), ("u1", false)]).await;

        let mut conn = db.acquire().await.unwrap();
        let team = Directory::new(&mut conn).get_team("backend").await.unwrap();

        assert_eq!(team.team_name, "backend");
        assert_eq!(team.members.len(), 2);
        assert_eq!(team.members[0].user_id, "u1");
        assert!(!team.members[0].is_active);
        assert!(team.members[1].is_active);
    }

    #[tokio::test]
    async fn test_get_team_distinguishes_empty_from_unknown() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "empty", &[]).await;

        let mut conn = db.acquire().await.unwrap();
        let mut directory = Directory::new(&mut conn);

        let team = directory.get_team("empty").await.unwrap();
        assert!(team.members.is_empty());

        let err = directory.get_team("nobody").await.unwrap_err();
        assert!(matches!(err, Error::TeamNotFound(name) if name == "nobody"));
    }

    #[tokio::test]
    async fn test_reupsert_moves_user_between_teams() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true)]).await;
        seed_team(&db, "frontend", &[("u1", false)]).await;

        let mut conn = db.acquire().await.unwrap();
        let user = Directory::new(&mut conn).find_user("u1").await.unwrap();
        assert_eq!(user.team_name, "frontend");
        assert!(!user.is_active);
    }

    #[tokio::test]
    async fn test_find_user_not_found() {
        let (_dir, db) = setup_db().await;
        let mut conn = db.acquire().await.unwrap();

        let err = Directory::new(&mut conn).find_user("ghost").await.unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_set_user_active() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true)]).await;

        let mut conn = db.acquire().await.unwrap();
        let mut directory = Directory::new(&mut conn);

        let user = directory.set_user_active("u1", false).await.unwrap();
        assert!(!user.is_active);
        assert_eq!(user.team_name, "backend");

        let err = directory.set_user_active("ghost", true).await.unwrap_err();
        assert!(matches!(err, Error::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_active_team_members() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u3", true), ("u1", true), ("u2", false)]).await;
        seed_team(&db, "frontend", &[("u9", true)]).await;

        let mut conn = db.acquire().await.unwrap();
        let mut directory = Directory::new(&mut conn);

        let all = directory.active_team_members("backend", None).await.unwrap();
        assert_eq!(all, vec!["u1", "u3"]);

        let others = directory
            .active_team_members("backend", Some("u1"))
            .await
            .unwrap();
        assert_eq!(others, vec!["u3"]);
    }

    #[tokio::test]
    async fn test_deactivate_in_team_ignores_outsiders() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true), ("u2", true)]).await;
        seed_team(&db, "frontend", &[("u9", true)]).await;

        let mut conn = db.acquire().await.unwrap();
        let mut directory = Directory::new(&mut conn);

        let updated = directory
            .deactivate_in_team("backend", &["u1".into(), "u9".into(), "ghost".into()])
            .await
            .unwrap();
        assert_eq!(updated, 1);

        assert!(!directory.find_user("u1").await.unwrap().is_active);
        assert!(directory.find_user("u2").await.unwrap().is_active);
        assert!(directory.find_user("u9").await.unwrap().is_active);

        assert_eq!(directory.deactivate_in_team("backend", &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deactivate_in_team_with_huge_id_list() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true), ("u2", true)]).await;

        let mut user_ids: Vec<String> = (0..40_000).map(|i| format!("ghost-{}", i)).collect();
        user_ids.push("u2".into());

        let mut conn = db.acquire().await.unwrap();
        let mut directory = Directory::new(&mut conn);

        let updated = directory.deactivate_in_team("backend", &user_ids).await.unwrap();
        assert_eq!(updated, 1);
        assert!(!directory.find_user("u2").await.unwrap().is_active);
        assert!(directory.find_user("u1").await.unwrap().is_active);
    }
}
