//! Team and user maintenance

use std::time::Duration;

use rota_db::{Database, Directory, Team, User};

use crate::engine::bounded;
use crate::{Error, Result};

/// Registers teams and toggles users
///
/// Activity changes made here do not touch existing reviewer sets; use
/// [`crate::AssignmentEngine::deactivate_team_members`] for that.
#[derive(Clone)]
pub struct Roster {
    db: Database,
    timeout: Duration,
}

impl Roster {
    pub fn new(db: Database, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Create or update a team and its members
    ///
    /// Members already registered elsewhere move to this team.
    pub async fn upsert_team(&self, team: &Team) -> Result<Team> {
        if team.team_name.trim().is_empty() {
            return Err(Error::Invalid("team_name must not be empty".to_string()));
        }
        if let Some(member) = team.members.iter().find(|m| m.user_id.trim().is_empty()) {
            return Err(Error::Invalid(format!(
                "member '{}' has an empty user_id",
                member.username
            )));
        }

        bounded(self.timeout, "upsert_team", async move {
            let mut tx = self.db.begin_write().await?;
            let mut directory = Directory::new(tx.conn());
            directory.upsert_team(team).await?;
            let stored = directory.get_team(&team.team_name).await?;
            tx.commit().await?;

            tracing::info!(
                team = %stored.team_name,
                members = stored.members.len(),
                "Team saved"
            );
            Ok(stored)
        })
        .await
    }

    /// Get a team with its members
    pub async fn get_team(&self, team_name: &str) -> Result<Team> {
        bounded(self.timeout, "get_team", async move {
            let mut conn = self.db.acquire().await?;
            Ok(Directory::new(&mut conn).get_team(team_name).await?)
        })
        .await
    }

    /// Set one user's active flag
    pub async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<User> {
        bounded(self.timeout, "set_user_active", async move {
            let mut tx = self.db.begin_write().await?;
            let user = Directory::new(tx.conn())
                .set_user_active(user_id, is_active)
                .await?;
            tx.commit().await?;

            tracing::info!(user_id = %user.user_id, is_active, "User activity changed");
            Ok(user)
        })
        .await
    }
}
