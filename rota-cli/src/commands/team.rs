//! Team commands - register, inspect and deactivate

use clap::{Args, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rota_core::Config;
use rota_db::{Team, TeamMember};

/// Manage teams
#[derive(Args, Debug)]
pub struct TeamArgs {
    #[command(subcommand)]
    command: TeamCommand,
}

#[derive(Subcommand, Debug)]
enum TeamCommand {
    /// Create a team or update its members
    Add {
        /// Team name
        name: String,

        /// Member as ID:USERNAME, or ID:USERNAME:inactive
        #[arg(short, long = "member", value_parser = parse_member)]
        members: Vec<TeamMember>,
    },

    /// Show a team and its members
    Get {
        /// Team name
        name: String,
    },

    /// Deactivate members and repair their open pull requests
    Deactivate {
        /// Team name
        name: String,

        /// User IDs to deactivate
        #[arg(required = true)]
        user_ids: Vec<String>,
    },
}

impl TeamArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let (engine, roster) = super::services(config).await?;

        match &self.command {
            TeamCommand::Add { name, members } => {
                let team = roster
                    .upsert_team(&Team {
                        team_name: name.clone(),
                        members: members.clone(),
                    })
                    .await?;
                super::print_json(&team)
            }
            TeamCommand::Get { name } => super::print_json(&roster.get_team(name).await?),
            TeamCommand::Deactivate { name, user_ids } => {
                let mut rng = StdRng::from_entropy();
                engine
                    .deactivate_team_members(name, user_ids, &mut rng)
                    .await?;
                println!("Deactivated {} user(s) in team {}", user_ids.len(), name);
                Ok(())
            }
        }
    }
}

fn parse_member(s: &str) -> Result<TeamMember, String> {
    let mut parts = s.splitn(3, ':');
    let user_id = parts.next().unwrap_or_default();
    let username = parts.next().unwrap_or_default();
    if user_id.is_empty() || username.is_empty() {
        return Err(format!("expected ID:USERNAME, got '{}'", s));
    }

    let is_active = match parts.next() {
        None | Some("active") => true,
        Some("inactive") => false,
        Some(other) => return Err(format!("unknown member state '{}'", other)),
    };

    Ok(TeamMember::new(user_id, username, is_active))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_member() {
        let member = parse_member("u1:Alice").unwrap();
        assert_eq!(member, TeamMember::new("u1", "Alice", true));

        let member = parse_member("u2:Bob:inactive").unwrap();
        assert!(!member.is_active);

        assert!(parse_member("u3").is_err());
        assert!(parse_member("u3:Carol:asleep").is_err());
    }
}
