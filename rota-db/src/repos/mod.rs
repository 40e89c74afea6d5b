//! Repository modules for database operations

pub mod directory;
pub mod ledger;
pub mod reviewers;

pub use directory::Directory;
pub use ledger::{Ledger, LockedPullRequest};
pub use reviewers::ReviewerSet;
