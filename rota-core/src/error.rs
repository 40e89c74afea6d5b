//! Error types for Rota

use std::time::Duration;

use thiserror::Error;

/// Result type alias for Rota operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad class of a failure, for callers that map errors onto a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Team, user or pull request missing
    NotFound,
    /// Request clashes with the current state
    Conflict,
    /// Malformed or missing input
    Invalid,
    /// Transaction, commit, lock or deadline failure; nothing was applied
    StorageFailure,
}

/// Error type for Rota operations
#[derive(Error, Debug)]
pub enum Error {
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

    /// Reviewers of a merged pull request cannot change
    #[error("Pull request '{0}' is already merged")]
    PrMerged(String),

    /// The reviewer to replace is not on the pull request
    #[error("User '{user_id}' is not a reviewer of pull request '{pull_request_id}'")]
    NotAssigned {
        pull_request_id: String,
        user_id: String,
    },

    /// Nobody is eligible to take over the review
    #[error("No active replacement candidate for pull request '{0}'")]
    NoCandidate(String),

    /// Malformed or missing input
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// The operation missed its deadline and was rolled back
    #[error("Operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// Storage layer failure
    #[error("Storage error: {0}")]
    Storage(rota_db::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TeamNotFound(_) | Error::UserNotFound(_) | Error::PrNotFound(_) => {
                ErrorKind::NotFound
            }
            Error::PrExists(_)
            | Error::PrMerged(_)
            | Error::NotAssigned { .. }
            | Error::NoCandidate(_) => ErrorKind::Conflict,
            Error::Invalid(_) | Error::Config(_) => ErrorKind::Invalid,
            Error::Timeout { .. } | Error::Storage(_) | Error::Io(_) => ErrorKind::StorageFailure,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Error::TeamNotFound(_) | Error::UserNotFound(_) | Error::PrNotFound(_) => "NOT_FOUND",
            Error::PrExists(_) => "PR_EXISTS",
            Error::PrMerged(_) => "PR_MERGED",
            Error::NotAssigned { .. } => "NOT_ASSIGNED",
            Error::NoCandidate(_) => "NO_CANDIDATE",
            Error::Invalid(_) | Error::Config(_) => "INVALID",
            Error::Timeout { .. } | Error::Storage(_) | Error::Io(_) => "ERROR",
        }
    }
}

impl From<rota_db::Error> for Error {
    fn from(err: rota_db::Error) -> Self {
        match err {
            rota_db::Error::TeamNotFound(name) => Error::TeamNotFound(name),
            rota_db::Error::UserNotFound(id) => Error::UserNotFound(id),
            rota_db::Error::PrNotFound(id) => Error::PrNotFound(id),
            rota_db::Error::PrExists(id) => Error::PrExists(id),
            other => Error::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_lookup_errors_keep_their_kind() {
        let err = Error::from(rota_db::Error::PrNotFound("pr-1".into()));
        assert!(matches!(err, Error::PrNotFound(ref id) if id == "pr-1"));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = Error::from(rota_db::Error::PrExists("pr-1".into()));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.code(), "PR_EXISTS");
    }

    #[test]
    fn test_other_db_errors_are_storage_failures() {
        let err = Error::from(rota_db::Error::InvalidData("bad status".into()));
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert_eq!(err.code(), "ERROR");
    }

    #[test]
    fn test_conflict_codes() {
        let not_assigned = Error::NotAssigned {
            pull_request_id: "pr-1".into(),
            user_id: "u2".into(),
        };
        assert_eq!(not_assigned.kind(), ErrorKind::Conflict);
        assert_eq!(not_assigned.code(), "NOT_ASSIGNED");
        assert_eq!(
            not_assigned.to_string(),
            "User 'u2' is not a reviewer of pull request 'pr-1'"
        );

        assert_eq!(Error::PrMerged("pr-1".into()).code(), "PR_MERGED");
        assert_eq!(Error::NoCandidate("pr-1".into()).code(), "NO_CANDIDATE");
    }
}
