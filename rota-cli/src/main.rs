//! Rota CLI - Command line interface for Rota
//!
//! Runs the HTTP service and exposes every engine operation for scripting.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rota_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{PrArgs, ServeArgs, TeamArgs, UserArgs};

/// Rota: reviewer assignment for pull requests
#[derive(Parser, Debug)]
#[command(name = "rota")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the SQLite database (overrides config and env)
    #[arg(long, global = true, env = "ROTA_DATABASE_PATH")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Run the HTTP API
    Serve(ServeArgs),

    /// Create or upgrade the database schema
    Migrate,

    /// Manage teams
    Team(TeamArgs),

    /// Manage users
    User(UserArgs),

    /// Work with pull requests
    Pr(PrArgs),

    /// Show assignment counts
    Stats,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; --verbose only changes the fallback
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.database.clone(), None)?;

    if cli.verbose {
        tracing::debug!(
            database = %config.database.path.display(),
            listen = %config.server.listen,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("rota {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Migrate) => {
            commands::migrate(&config).await?;
        }
        Some(Commands::Team(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::User(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Pr(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Stats) => {
            commands::stats(&config).await?;
        }
        Some(Commands::Config) => {
            println!("Rota Configuration");
            println!("==================");
            println!();
            println!("Database:");
            println!("  path: {}", config.database.path.display());
            println!("  max_connections: {}", config.database.max_connections);
            println!("  busy_timeout: {:?}", config.database.busy_timeout);
            println!();
            println!("Server:");
            println!("  listen: {}", config.server.listen);
            println!();
            println!("Engine:");
            println!("  operation_timeout: {:?}", config.engine.operation_timeout);
            println!(
                "  reviewers_per_pull_request: {}",
                config.engine.reviewers_per_pull_request
            );
            println!();
            if let Some(path) = Config::default_config_path() {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
        }
        None => {
            println!("Rota - Reviewer assignment for pull requests");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
