//! Pull request lifecycle records

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;

use crate::models::{
    NewPullRequest, PrStatus, PullRequest, PullRequestRow, PullRequestShort, PullRequestShortRow,
    ReviewerStats,
};
use crate::repos::ReviewerSet;
use crate::{Error, Result};

/// Proof that a pull request row is locked by the current write transaction
///
/// Only [`Ledger::lock_for_update`] hands these out. Writes that must not
/// race with a concurrent merge or reassignment take one as an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedPullRequest {
    pull_request_id: String,
    author_id: String,
    status: PrStatus,
}

impl LockedPullRequest {
    pub fn pull_request_id(&self) -> &str {
        &self.pull_request_id
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn is_merged(&self) -> bool {
        self.status == PrStatus::Merged
    }
}

/// Repository for pull request records
pub struct Ledger<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> Ledger<'c> {
    /// Create a new repository on the given connection
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Insert a new OPEN pull request
    ///
    /// A duplicate ID is reported as [`Error::PrExists`], including when a
    /// concurrent insert wins the race on the primary key.
    pub async fn insert(&mut self, pr: &NewPullRequest, created_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO pull_requests (pull_request_id, pull_request_name, author_id, status, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(&pr.pull_request_name)
        .bind(&pr.author_id)
        .bind(PrStatus::Open.as_str())
        .bind(created_at)
        .execute(&mut *self.conn)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let e = Error::from(e);
                if e.is_unique_violation() {
                    Err(Error::PrExists(pr.pull_request_id.clone()))
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Whether a pull request with this ID exists
    pub async fn exists(&mut self, pull_request_id: &str) -> Result<bool> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM pull_requests WHERE pull_request_id = ?)",
        )
        .bind(pull_request_id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(exists.0)
    }

    /// Lock a pull request row for the rest of the transaction
    ///
    /// SQLite has no row locks. The no-op update claims the database write
    /// lock, so "row" here means the whole database: every other writer,
    /// including one working on a different pull request, waits until this
    /// transaction commits or rolls back. Readers are not blocked under WAL.
    pub async fn lock_for_update(&mut self, pull_request_id: &str) -> Result<LockedPullRequest> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            r#"
            UPDATE pull_requests SET status = status
            WHERE pull_request_id = ?
            RETURNING pull_request_id, author_id, status
            "#,
        )
        .bind(pull_request_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        let (pull_request_id, author_id, status) =
            row.ok_or_else(|| Error::PrNotFound(pull_request_id.to_string()))?;

        Ok(LockedPullRequest {
            pull_request_id,
            author_id,
            status: status.parse()?,
        })
    }

    /// Mark a locked pull request as merged at the given time
    pub async fn set_merged(
        &mut self,
        locked: &LockedPullRequest,
        merged_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE pull_requests SET status = ?, merged_at = ? WHERE pull_request_id = ?")
            .bind(PrStatus::Merged.as_str())
            .bind(merged_at)
            .bind(locked.pull_request_id())
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    /// Read a full snapshot of a pull request, reviewers included
    pub async fn read(&mut self, pull_request_id: &str) -> Result<PullRequest> {
        let row = sqlx::query_as::<_, PullRequestRow>(
            r#"
            SELECT pull_request_id, pull_request_name, author_id, status, created_at, merged_at
            FROM pull_requests WHERE pull_request_id = ?
            "#,
        )
        .bind(pull_request_id)
        .fetch_optional(&mut *self.conn)
        .await?
        .ok_or_else(|| Error::PrNotFound(pull_request_id.to_string()))?;

        let reviewers = ReviewerSet::new(&mut *self.conn)
            .assignments(pull_request_id)
            .await?;

        row.into_pull_request(reviewers)
    }

    /// Pull requests on which the user is an assigned reviewer
    pub async fn for_reviewer(&mut self, user_id: &str) -> Result<Vec<PullRequestShort>> {
        let rows = sqlx::query_as::<_, PullRequestShortRow>(
            r#"
            SELECT p.pull_request_id, p.pull_request_name, p.author_id, p.status
            FROM pull_requests p
            JOIN pr_reviewers r ON p.pull_request_id = r.pull_request_id
            WHERE r.user_id = ?
            ORDER BY p.pull_request_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        rows.into_iter().map(PullRequestShort::try_from).collect()
    }

    /// IDs of OPEN pull requests tied to a team, in ascending order
    ///
    /// A pull request is tied to the team when its author is a member or any
    /// of its current reviewers is.
    pub async fn open_touching_team(&mut self, team_name: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT p.pull_request_id
            FROM pull_requests p
            WHERE p.status = 'OPEN'
              AND (
                p.author_id IN (SELECT user_id FROM users WHERE team_name = ?)
                OR EXISTS (
                    SELECT 1 FROM pr_reviewers r
                    JOIN users u ON u.user_id = r.user_id
                    WHERE r.pull_request_id = p.pull_request_id AND u.team_name = ?
                )
              )
            ORDER BY p.pull_request_id
            "#,
        )
        .bind(team_name)
        .bind(team_name)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Assignment counts per reviewer and per pull request
    pub async fn stats(&mut self) -> Result<ReviewerStats> {
        let per_user: Vec<(String, i64)> =
            sqlx::query_as("SELECT user_id, COUNT(*) FROM pr_reviewers GROUP BY user_id")
                .fetch_all(&mut *self.conn)
                .await?;

        let per_pr: Vec<(String, i64)> = sqlx::query_as(
            "SELECT pull_request_id, COUNT(*) FROM pr_reviewers GROUP BY pull_request_id",
        )
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(ReviewerStats {
            reviewer_assignments: per_user.into_iter().collect(),
            pr_assignments: per_pr.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_team, setup_db};

    fn new_pr(id: &str, author: &str) -> NewPullRequest {
        NewPullRequest::new(id, format!("PR {}", id), author)
    }

    #[tokio::test]
    async fn test_insert_and_read() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true)]).await;

        let mut conn = db.acquire().await.unwrap();
        let mut ledger = Ledger::new(&mut conn);

        let now = Utc::now();
        ledger.insert(&new_pr("pr-1", "u1"), now).await.unwrap();

        let pr = ledger.read("pr-1").await.unwrap();
        assert_eq!(pr.pull_request_name, "PR pr-1");
        assert_eq!(pr.author_id, "u1");
        assert_eq!(pr.status, PrStatus::Open);
        assert!((pr.created_at - now).num_milliseconds().abs() < 1);
        assert!(pr.merged_at.is_none());
        assert!(pr.assigned_reviewers.is_empty());
    }

    #[tokio::test]
    async fn test_insert_duplicate_is_pr_exists() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true)]).await;

        let mut conn = db.acquire().await.unwrap();
        let mut ledger = Ledger::new(&mut conn);

        ledger.insert(&new_pr("pr-1", "u1"), Utc::now()).await.unwrap();
        let err = ledger
            .insert(&new_pr("pr-1", "u1"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PrExists(id) if id == "pr-1"));
    }

    #[tokio::test]
    async fn test_read_missing() {
        let (_dir, db) = setup_db().await;
        let mut conn = db.acquire().await.unwrap();

        let err = Ledger::new(&mut conn).read("nope").await.unwrap_err();
        assert!(matches!(err, Error::PrNotFound(_)));
    }

    #[tokio::test]
    async fn test_lock_and_merge() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true)]).await;

        let mut tx = db.begin_write().await.unwrap();
        let mut ledger = Ledger::new(tx.conn());
        ledger.insert(&new_pr("pr-1", "u1"), Utc::now()).await.unwrap();

        let locked = ledger.lock_for_update("pr-1").await.unwrap();
        assert_eq!(locked.author_id(), "u1");
        assert!(!locked.is_merged());

        let merged_at = Utc::now();
        ledger.set_merged(&locked, merged_at).await.unwrap();
        tx.commit().await.unwrap();

        let mut conn = db.acquire().await.unwrap();
        let pr = Ledger::new(&mut conn).read("pr-1").await.unwrap();
        assert!(pr.is_merged());
        let stored = pr.merged_at.unwrap();
        assert!((stored - merged_at).num_milliseconds().abs() < 1);
    }

    #[tokio::test]
    async fn test_lock_missing() {
        let (_dir, db) = setup_db().await;
        let mut tx = db.begin_write().await.unwrap();

        let err = Ledger::new(tx.conn()).lock_for_update("nope").await.unwrap_err();
        assert!(matches!(err, Error::PrNotFound(_)));
    }

    #[tokio::test]
    async fn test_open_touching_team() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("a1", true), ("a2", true)]).await;
        seed_team(&db, "frontend", &[("f1", true), ("f2", true)]).await;

        let mut tx = db.begin_write().await.unwrap();
        {
            let mut ledger = Ledger::new(tx.conn());
            ledger.insert(&new_pr("pr-b", "a1"), Utc::now()).await.unwrap();
            ledger.insert(&new_pr("pr-a", "f1"), Utc::now()).await.unwrap();
            ledger.insert(&new_pr("pr-c", "f1"), Utc::now()).await.unwrap();
            ledger.insert(&new_pr("pr-m", "a2"), Utc::now()).await.unwrap();
            let merged = ledger.lock_for_update("pr-m").await.unwrap();
            ledger.set_merged(&merged, Utc::now()).await.unwrap();
        }
        // pr-a is authored in frontend but reviewed by backend
        let locked = Ledger::new(tx.conn()).lock_for_update("pr-a").await.unwrap();
        ReviewerSet::new(tx.conn())
            .replace_assignments(&locked, &["a2".to_string()])
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut conn = db.acquire().await.unwrap();
        let ids = Ledger::new(&mut conn)
            .open_touching_team("backend")
            .await
            .unwrap();
        assert_eq!(ids, vec!["pr-a", "pr-b"]);
    }

    #[tokio::test]
    async fn test_for_reviewer_and_stats() {
        let (_dir, db) = setup_db().await;
        seed_team(&db, "backend", &[("u1", true), ("u2", true), ("u3", true)]).await;

        let mut tx = db.begin_write().await.unwrap();
        for (id, reviewers) in [("pr-1", vec!["u2", "u3"]), ("pr-2", vec!["u2"])] {
            let mut ledger = Ledger::new(tx.conn());
            ledger.insert(&new_pr(id, "u1"), Utc::now()).await.unwrap();
            let locked = ledger.lock_for_update(id).await.unwrap();
            let reviewers: Vec<String> = reviewers.into_iter().map(String::from).collect();
            ReviewerSet::new(tx.conn())
                .replace_assignments(&locked, &reviewers)
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let mut conn = db.acquire().await.unwrap();
        let mut ledger = Ledger::new(&mut conn);

        let prs = ledger.for_reviewer("u2").await.unwrap();
        let ids: Vec<_> = prs.iter().map(|p| p.pull_request_id.as_str()).collect();
        assert_eq!(ids, vec!["pr-1", "pr-2"]);
        assert!(ledger.for_reviewer("u1").await.unwrap().is_empty());

        let stats = ledger.stats().await.unwrap();
        assert_eq!(stats.reviewer_assignments.get("u2"), Some(&2));
        assert_eq!(stats.reviewer_assignments.get("u3"), Some(&1));
        assert_eq!(stats.pr_assignments.get("pr-1"), Some(&2));
        assert_eq!(stats.pr_assignments.get("pr-2"), Some(&1));
    }
}
