//! CLI command implementations

pub mod pr;
pub mod serve;
pub mod team;
pub mod user;

pub use pr::PrArgs;
pub use serve::ServeArgs;
pub use team::TeamArgs;
pub use user::UserArgs;

use rota_core::{AssignmentEngine, Config, Roster};
use rota_db::Database;
use serde::Serialize;

/// Open the configured database, applying migrations
pub(crate) async fn open_database(config: &Config) -> anyhow::Result<Database> {
    let db_config = config.database.to_database_config();
    Database::open(&db_config).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to open database {}: {}",
            db_config.path.display(),
            e
        )
    })
}

/// Engine and roster sharing one database
pub(crate) async fn services(config: &Config) -> anyhow::Result<(AssignmentEngine, Roster)> {
    let db = open_database(config).await?;
    let roster = Roster::new(db.clone(), config.engine.operation_timeout);
    let engine = AssignmentEngine::new(db, config.engine.clone());
    Ok((engine, roster))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Apply pending migrations and exit
pub async fn migrate(config: &Config) -> anyhow::Result<()> {
    let db = open_database(config).await?;
    db.close().await;
    println!("Database ready at {}", config.database.path.display());
    Ok(())
}

/// Print reviewer and pull request assignment counts
pub async fn stats(config: &Config) -> anyhow::Result<()> {
    let (engine, _) = services(config).await?;
    print_json(&engine.stats().await?)
}
