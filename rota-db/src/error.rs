//! Error types for database operations

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Team was never registered
    #[error("Team '{0}' not found")]
    TeamNotFound(String),

    /// User does not exist
    #[error("User '{0}' not found")]
    UserNotFound(String),

    /// Pull request does not exist
    #[error("Pull request '{0}' not found")]
    PrNotFound(String),

    /// Pull request id is already taken
    #[error("Pull request '{0}' already exists")]
    PrExists(String),

    /// JSON encoding of a bound parameter failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored value could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// Whether this error means a uniqueness constraint rejected the write
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Sqlx(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;
