//! Reviewer assignment engine
//!
//! Every operation runs as one write transaction against the storage layer
//! and is bounded by the engine's operation timeout. A failure at any step,
//! including a missed deadline, drops the transaction and rolls it back.
//!
//! Random choices come from the `rng` argument of each operation. Production
//! callers pass a freshly seeded [`rand::rngs::StdRng`]; tests pass a fixed
//! seed.

mod cascade;

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use rota_db::{
    Database, Directory, Ledger, NewPullRequest, PullRequest, PullRequestShort, ReviewerSet,
    ReviewerStats,
};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::selection;
use crate::{Error, Result};

/// Outcome of a successful reviewer replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    /// Pull request after the swap
    pub pull_request: PullRequest,
    /// The reviewer who took over
    pub replaced_by: String,
}

/// Decides and persists who reviews which pull request
#[derive(Clone)]
pub struct AssignmentEngine {
    db: Database,
    config: EngineConfig,
}

impl AssignmentEngine {
    /// Create an engine over the given database
    pub fn new(db: Database, config: EngineConfig) -> Self {
        Self { db, config }
    }

    /// Register a pull request and assign its initial reviewers
    ///
    /// Reviewers are drawn from the active members of the author's team,
    /// author excluded. A team with fewer eligible members than the
    /// configured reviewer count yields a smaller set, possibly empty.
    pub async fn create_pull_request<R>(
        &self,
        new: NewPullRequest,
        rng: &mut R,
    ) -> Result<PullRequest>
    where
        R: Rng + Send + ?Sized,
    {
        self.bounded("create", async move {
            let mut tx = self.db.begin_write().await?;

            if Ledger::new(tx.conn()).exists(&new.pull_request_id).await? {
                return Err(Error::PrExists(new.pull_request_id));
            }

            let mut directory = Directory::new(tx.conn());
            let author = directory.find_user(&new.author_id).await?;
            let candidates = directory
                .active_team_members(&author.team_name, Some(&author.user_id))
                .await?;
            let reviewers =
                selection::pick_reviewers(&candidates, self.config.reviewers_per_pull_request, rng);

            tracing::debug!(
                pr_id = %new.pull_request_id,
                team = %author.team_name,
                candidates = candidates.len(),
                "Selecting initial reviewers"
            );

            let mut ledger = Ledger::new(tx.conn());
            ledger.insert(&new, Utc::now()).await?;
            let locked = ledger.lock_for_update(&new.pull_request_id).await?;
            ReviewerSet::new(tx.conn())
                .replace_assignments(&locked, &reviewers)
                .await?;

            let pr = Ledger::new(tx.conn()).read(&new.pull_request_id).await?;
            tx.commit().await?;

            tracing::info!(
                pr_id = %pr.pull_request_id,
                author = %pr.author_id,
                reviewers = ?pr.assigned_reviewers,
                "Pull request created"
            );
            Ok(pr)
        })
        .await
    }

    /// Mark a pull request merged, freezing its reviewers
    ///
    /// Merging an already merged pull request returns its current snapshot
    /// unchanged.
    pub async fn merge_pull_request(&self, pull_request_id: &str) -> Result<PullRequest> {
        self.bounded("merge", async move {
            let mut tx = self.db.begin_write().await?;
            let mut ledger = Ledger::new(tx.conn());

            let locked = ledger.lock_for_update(pull_request_id).await?;
            if locked.is_merged() {
                tracing::debug!(pr_id = %pull_request_id, "Pull request already merged");
            } else {
                ledger.set_merged(&locked, Utc::now()).await?;
                tracing::info!(pr_id = %pull_request_id, "Pull request merged");
            }

            let pr = ledger.read(pull_request_id).await?;
            tx.commit().await?;
            Ok(pr)
        })
        .await
    }

    /// Replace one reviewer of an open pull request
    ///
    /// The replacement comes from the old reviewer's team: an active member
    /// who is neither the author nor already reviewing.
    pub async fn reassign_reviewer<R>(
        &self,
        pull_request_id: &str,
        old_reviewer: &str,
        rng: &mut R,
    ) -> Result<Reassignment>
    where
        R: Rng + Send + ?Sized,
    {
        self.bounded("reassign", async move {
            let mut tx = self.db.begin_write().await?;

            let locked = Ledger::new(tx.conn()).lock_for_update(pull_request_id).await?;
            if locked.is_merged() {
                return Err(Error::PrMerged(pull_request_id.to_string()));
            }

            let mut reviewers = ReviewerSet::new(tx.conn());
            if !reviewers.is_assigned(pull_request_id, old_reviewer).await? {
                return Err(Error::NotAssigned {
                    pull_request_id: pull_request_id.to_string(),
                    user_id: old_reviewer.to_string(),
                });
            }
            let current = reviewers.assignments(pull_request_id).await?;

            let mut directory = Directory::new(tx.conn());
            let old_user = directory.find_user(old_reviewer).await?;
            let pool = directory
                .active_team_members(&old_user.team_name, Some(locked.author_id()))
                .await?;

            let taken: Vec<&str> = current.iter().map(String::as_str).collect();
            let candidates = selection::eligible(pool, &taken);
            tracing::debug!(
                pr_id = %pull_request_id,
                team = %old_user.team_name,
                candidates = ?candidates,
                "Reassignment candidates"
            );

            let new_reviewer = selection::pick_one(&candidates, rng)
                .ok_or_else(|| Error::NoCandidate(pull_request_id.to_string()))?;

            ReviewerSet::new(tx.conn())
                .swap(&locked, old_reviewer, &new_reviewer)
                .await?;

            let pull_request = Ledger::new(tx.conn()).read(pull_request_id).await?;
            tx.commit().await?;

            tracing::info!(
                pr_id = %pull_request_id,
                old = %old_reviewer,
                new = %new_reviewer,
                "Reviewer reassigned"
            );
            Ok(Reassignment {
                pull_request,
                replaced_by: new_reviewer,
            })
        })
        .await
    }

    /// Current snapshot of a pull request
    pub async fn pull_request(&self, pull_request_id: &str) -> Result<PullRequest> {
        self.bounded("read", async move {
            let mut conn = self.db.acquire().await?;
            Ok(Ledger::new(&mut conn).read(pull_request_id).await?)
        })
        .await
    }

    /// Pull requests the user is assigned to review
    pub async fn reviews_for(&self, user_id: &str) -> Result<Vec<PullRequestShort>> {
        self.bounded("reviews", async move {
            let mut conn = self.db.acquire().await?;
            Ok(Ledger::new(&mut conn).for_reviewer(user_id).await?)
        })
        .await
    }

    /// Assignment counts per reviewer and per pull request
    pub async fn stats(&self) -> Result<ReviewerStats> {
        self.bounded("stats", async move {
            let mut conn = self.db.acquire().await?;
            Ok(Ledger::new(&mut conn).stats().await?)
        })
        .await
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        bounded(self.config.operation_timeout, operation, fut).await
    }
}

/// Run `fut` under a deadline
///
/// On timeout the future is dropped, and with it any open transaction.
pub(crate) async fn bounded<T, F>(timeout: Duration, operation: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?timeout, "Operation timed out, rolled back");
            Err(Error::Timeout { operation, timeout })
        }
    }
}
