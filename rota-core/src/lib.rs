//! Rota Core - Reviewer assignment for pull requests
//!
//! Assigns reviewers from the author's team when a pull request is opened,
//! lets a reviewer hand off to a teammate, freezes assignments on merge and
//! repairs open pull requests when team members are deactivated.

pub mod config;
pub mod engine;
pub mod error;
pub mod roster;
pub mod selection;

pub use config::{Config, DatabaseSettings, EngineConfig, ServerConfig};
pub use engine::{AssignmentEngine, Reassignment};
pub use error::{Error, ErrorKind, Result};
pub use roster::Roster;

#[cfg(test)]
pub(crate) mod testing {
    use rota_db::testing::{seed_team, setup_db};
    use rota_db::NewPullRequest;
    use tempfile::TempDir;

    use crate::{AssignmentEngine, EngineConfig, Roster};

    pub struct Fixture {
        _dir: TempDir,
        pub engine: AssignmentEngine,
        pub roster: Roster,
    }

    /// Engine and roster over a fresh database with team "backend"
    pub async fn setup(members: &[(&str, bool)]) -> Fixture {
        let (dir, db) = setup_db().await;
        if !members.is_empty() {
            seed_team(&db, "backend", members).await;
        }

        let config = EngineConfig::default();
        Fixture {
            _dir: dir,
            roster: Roster::new(db.clone(), config.operation_timeout),
            engine: AssignmentEngine::new(db, config),
        }
    }

    pub fn ids(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    pub fn new_pr(id: &str, author: &str) -> NewPullRequest {
        NewPullRequest::new(id, format!("Change {}", id), author)
    }
}
