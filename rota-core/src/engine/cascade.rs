//! Bulk deactivation and the reviewer cascade it triggers

use rand::Rng;
use rota_db::{Directory, Ledger, ReviewerSet};

use super::AssignmentEngine;
use crate::selection;
use crate::Result;

impl AssignmentEngine {
    /// Deactivate team members and repair every open pull request they touch
    ///
    /// Users outside `team_name` are ignored. Each OPEN pull request authored
    /// in the team, or reviewed by one of its members, loses its inactive
    /// reviewers; one left without any gets a single backfill from the
    /// team's remaining active members, or stays empty if nobody is
    /// eligible. All of it commits as one transaction.
    pub async fn deactivate_team_members<R>(
        &self,
        team_name: &str,
        user_ids: &[String],
        rng: &mut R,
    ) -> Result<()>
    where
        R: Rng + Send + ?Sized,
    {
        self.bounded("deactivate", async move {
            let mut tx = self.db.begin_write().await?;

            let mut directory = Directory::new(tx.conn());
            if !directory.team_exists(team_name).await? {
                tracing::warn!(team = %team_name, "Deactivation requested for unknown team");
                tx.rollback().await?;
                return Ok(());
            }
            let deactivated = directory.deactivate_in_team(team_name, user_ids).await?;
            let team_active = directory.active_team_members(team_name, None).await?;

            // Ascending order keeps concurrent cascades from deadlocking
            let affected = Ledger::new(tx.conn()).open_touching_team(team_name).await?;

            let mut repaired = 0usize;
            for pull_request_id in &affected {
                let locked = Ledger::new(tx.conn()).lock_for_update(pull_request_id).await?;
                let current = ReviewerSet::new(tx.conn())
                    .assignments(pull_request_id)
                    .await?;

                let mut retained = Vec::with_capacity(current.len());
                let mut directory = Directory::new(tx.conn());
                for reviewer in &current {
                    if directory.find_user(reviewer).await?.is_active {
                        retained.push(reviewer.clone());
                    }
                }

                let planned = plan_reviewers(locked.author_id(), retained, &team_active, &mut *rng);
                if planned == current {
                    continue;
                }

                if planned.is_empty() {
                    tracing::warn!(
                        pr_id = %pull_request_id,
                        team = %team_name,
                        "No active reviewer left and no candidate to backfill"
                    );
                }

                ReviewerSet::new(tx.conn())
                    .replace_assignments(&locked, &planned)
                    .await?;
                repaired += 1;

                tracing::debug!(
                    pr_id = %pull_request_id,
                    before = ?current,
                    after = ?planned,
                    "Reviewers repaired"
                );
            }

            tx.commit().await?;

            tracing::info!(
                team = %team_name,
                deactivated,
                open_prs = affected.len(),
                repaired,
                "Team members deactivated"
            );
            Ok(())
        })
        .await
    }
}

/// Reviewer set a pull request should end up with after a deactivation
///
/// `retained` holds the reviewers that are still active. If none are, one
/// replacement is drawn from `team_active`, skipping the author.
fn plan_reviewers<R>(
    author_id: &str,
    retained: Vec<String>,
    team_active: &[String],
    rng: &mut R,
) -> Vec<String>
where
    R: Rng + ?Sized,
{
    if !retained.is_empty() {
        return retained;
    }

    let candidates = selection::eligible(team_active.to_vec(), &[author_id]);
    selection::pick_one(&candidates, rng).into_iter().collect()
}
