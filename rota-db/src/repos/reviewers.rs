//! Reviewer assignments

use sqlx::sqlite::SqliteConnection;

use crate::repos::LockedPullRequest;
use crate::{Error, Result};

/// Repository for the pull request to reviewer relation
///
/// Every write requires a [`LockedPullRequest`] so assignments only change
/// while the pull request row is held by the writing transaction.
pub struct ReviewerSet<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ReviewerSet<'c> {
    /// Create a new repository on the given connection
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Reviewer IDs currently assigned to a pull request, sorted
    pub async fn assignments(&mut self, pull_request_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT user_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY user_id",
        )
        .bind(pull_request_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Whether the user is currently assigned to review the pull request
    pub async fn is_assigned(&mut self, pull_request_id: &str, user_id: &str) -> Result<bool> {
        let assigned: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM pr_reviewers WHERE pull_request_id = ? AND user_id = ?)",
        )
        .bind(pull_request_id)
        .bind(user_id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(assigned.0)
    }

    /// Replace the whole reviewer set of a pull request
    pub async fn replace_assignments(
        &mut self,
        locked: &LockedPullRequest,
        reviewers: &[String],
    ) -> Result<()> {
        ensure_open(locked)?;

        sqlx::query("DELETE FROM pr_reviewers WHERE pull_request_id = ?")
            .bind(locked.pull_request_id())
            .execute(&mut *self.conn)
            .await?;

        for reviewer in reviewers {
            self.insert(locked.pull_request_id(), reviewer).await?;
        }

        Ok(())
    }

    /// Swap one assigned reviewer for another
    pub async fn swap(
        &mut self,
        locked: &LockedPullRequest,
        old_reviewer: &str,
        new_reviewer: &str,
    ) -> Result<()> {
        ensure_open(locked)?;

        sqlx::query("DELETE FROM pr_reviewers WHERE pull_request_id = ? AND user_id = ?")
            .bind(locked.pull_request_id())
            .bind(old_reviewer)
            .execute(&mut *self.conn)
            .await?;

        self.insert(locked.pull_request_id(), new_reviewer).await
    }

    async fn insert(&mut self, pull_request_id: &str, user_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO pr_reviewers (pull_request_id, user_id) VALUES (?, ?)")
            .bind(pull_request_id)
            .bind(user_id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }
}

fn ensure_open(locked: &LockedPullRequest) -> Result<()> {
    if locked.is_merged() {
        return Err(Error::InvalidData(format!(
            "reviewers of merged pull request '{}' are frozen",
            locked.pull_request_id()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPullRequest;
    use crate::repos::Ledger;
    use crate::testing::{seed_team, setup_db};
    use chrono::Utc;

    fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_replace_and_swap() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true), ("u2", true), ("u3", true), ("u4", true)]).await;

        let mut tx = db.begin_write().await.unwrap();
        let mut ledger = Ledger::new(tx.conn());
        ledger
            .insert(&NewPullRequest::new("pr-1", "Login", "u1"), Utc::now())
            .await
            .unwrap();
        let locked = ledger.lock_for_update("pr-1").await.unwrap();

        let mut reviewers = ReviewerSet::new(tx.conn());
        reviewers
            .replace_assignments(&locked, &ids(&["u3", "u2"]))
            .await
            .unwrap();
        assert_eq!(reviewers.assignments("pr-1").await.unwrap(), ids(&["u2", "u3"]));
        assert!(reviewers.is_assigned("pr-1", "u2").await.unwrap());
        assert!(!reviewers.is_assigned("pr-1", "u4").await.unwrap());

        reviewers.swap(&locked, "u2", "u4").await.unwrap();
        assert_eq!(reviewers.assignments("pr-1").await.unwrap(), ids(&["u3", "u4"]));

        reviewers.replace_assignments(&locked, &[]).await.unwrap();
        assert!(reviewers.assignments("pr-1").await.unwrap().is_empty());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_assignment_rejected() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true), ("u2", true)]).await;

        let mut tx = db.begin_write().await.unwrap();
        let mut ledger = Ledger::new(tx.conn());
        ledger
            .insert(&NewPullRequest::new("pr-1", "Login", "u1"), Utc::now())
            .await
            .unwrap();
        let locked = ledger.lock_for_update("pr-1").await.unwrap();

        let err = ReviewerSet::new(tx.conn())
            .replace_assignments(&locked, &ids(&["u2", "u2"]))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_merged_reviewers_are_frozen() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true), ("u2", true)]).await;

        let mut tx = db.begin_write().await.unwrap();
        let mut ledger = Ledger::new(tx.conn());
        ledger
            .insert(&NewPullRequest::new("pr-1", "Login", "u1"), Utc::now())
            .await
            .unwrap();
        let open = ledger.lock_for_update("pr-1").await.unwrap();
        ledger.set_merged(&open, Utc::now()).await.unwrap();
        let merged = ledger.lock_for_update("pr-1").await.unwrap();

        let err = ReviewerSet::new(tx.conn())
            .replace_assignments(&merged, &ids(&["u2"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }
}
