//! Pull request commands

use clap::{Args, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rota_core::Config;
use rota_db::NewPullRequest;

/// Work with pull requests
#[derive(Args, Debug)]
pub struct PrArgs {
    #[command(subcommand)]
    command: PrCommand,
}

#[derive(Subcommand, Debug)]
enum PrCommand {
    /// Register a pull request and assign reviewers
    Create {
        /// Pull request ID
        id: String,

        /// Author user ID
        #[arg(short, long)]
        author: String,

        /// Title
        #[arg(short, long)]
        name: String,
    },

    /// Mark a pull request merged
    Merge {
        /// Pull request ID
        id: String,
    },

    /// Hand a review over to another team member
    Reassign {
        /// Pull request ID
        id: String,

        /// Reviewer to replace
        old_user_id: String,
    },

    /// List pull requests a user is reviewing
    Reviews {
        /// User ID
        user_id: String,
    },
}

impl PrArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let (engine, _) = super::services(config).await?;
        let mut rng = StdRng::from_entropy();

        match &self.command {
            PrCommand::Create { id, author, name } => {
                let pr = engine
                    .create_pull_request(NewPullRequest::new(id, name, author), &mut rng)
                    .await?;
                super::print_json(&pr)
            }
            PrCommand::Merge { id } => super::print_json(&engine.merge_pull_request(id).await?),
            PrCommand::Reassign { id, old_user_id } => {
                let outcome = engine.reassign_reviewer(id, old_user_id, &mut rng).await?;
                super::print_json(&outcome)
            }
            PrCommand::Reviews { user_id } => {
                super::print_json(&engine.reviews_for(user_id).await?)
            }
        }
    }
}
