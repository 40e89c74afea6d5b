//! Database layer for Rota
//!
//! Persists teams, users, pull requests and reviewer assignments in SQLite.
//! The three repositories map onto the storage components the assignment
//! engine works against:
//!
//! - [`Directory`]: users, teams and active flags
//! - [`Ledger`]: pull request lifecycle and read projections
//! - [`ReviewerSet`]: the pull request to reviewer relation
//!
//! Every repository borrows a single connection, so a caller can run several
//! of them inside one [`WriteTx`] and commit the lot atomically.

pub mod error;
pub mod models;
pub mod repos;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{ConnectOptions, Sqlite, Transaction};

pub use error::{Error, Result};
pub use models::{
    NewPullRequest, PrStatus, PullRequest, PullRequestShort, ReviewerStats, Team, TeamMember, User,
};
pub use repos::{Directory, Ledger, LockedPullRequest, ReviewerSet};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// How long a writer waits for the database lock before failing
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl DatabaseConfig {
    /// Create a new database config with the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 10,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Get the default database path (~/.local/share/rota/rota.db on Linux)
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rota")
            .join("rota.db")
    }

    /// Set the maximum number of connections
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set the lock wait timeout
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and bring the schema up to date
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let db = Self::connect(config).await?;
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to the database with the given configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", config.path.display()))?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .foreign_keys(true)
                .busy_timeout(config.busy_timeout)
                .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %config.path.display(), "Database connected");

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check out a connection for reads outside a transaction
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Start a write transaction
    ///
    /// The transaction takes the database write lock up front (`BEGIN
    /// IMMEDIATE`), so the lock covering every row it touches is held from
    /// the first statement until commit. Dropping the returned value without
    /// committing rolls everything back.
    pub async fn begin_write(&self) -> Result<WriteTx> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(WriteTx { tx })
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// An open write transaction
pub struct WriteTx {
    tx: Transaction<'static, Sqlite>,
}

impl WriteTx {
    /// Connection the transaction runs on
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Commit all changes made in this transaction
    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Discard all changes made in this transaction
    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Fixtures shared with the crates built on top of this one
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use tempfile::TempDir;

    /// Fresh migrated database in a temp directory; keep the dir alive
    pub async fn setup_db() -> (TempDir, Database) {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig::new(temp_dir.path().join("test.db"));
        let db = Database::open(&config).await.unwrap();
        (temp_dir, db)
    }

    /// Register a team with `(user_id, is_active)` members
    pub async fn seed_team(db: &Database, team: &str, members: &[(&str, bool)]) {
        let team = Team {
            team_name: team.to_string(),
            members: members
                .iter()
                .map(|(id, active)| TeamMember::new(*id, format!("name-{}", id), *active))
                .collect(),
        };
        let mut tx = db.begin_write().await.unwrap();
        Directory::new(tx.conn()).upsert_team(&team).await.unwrap();
        tx.commit().await.unwrap();
    }
}
