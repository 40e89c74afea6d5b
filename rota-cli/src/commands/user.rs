//! User commands

use clap::{Args, Subcommand};
use rota_core::Config;

/// Manage users
#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Set a single user's active flag
    ///
    /// Existing reviewer assignments are left as they are.
    SetActive {
        /// User ID
        user_id: String,

        /// New active flag
        #[arg(action = clap::ArgAction::Set)]
        active: bool,
    },
}

impl UserArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let (_, roster) = super::services(config).await?;

        match &self.command {
            UserCommand::SetActive { user_id, active } => {
                let user = roster.set_user_active(user_id, *active).await?;
                super::print_json(&user)
            }
        }
    }
}
