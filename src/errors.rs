//! Recoverable repository errors
//!
//! Core operations return `anyhow::Result` and raise these kinds as the error
//! value, so callers can tell a user mistake from an I/O failure with
//! `err.downcast_ref::<RepositoryError>()`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("No object with id {0} exists.")]
    ObjectNotFound(String),

    #[error("No reason to remove the file: {0}")]
    UntrackedFile(String),

    #[error("No changes added to the commit.")]
    NothingToCommit,

    #[error("Please enter a commit message.")]
    EmptyCommitMessage,

    #[error("A branch with the name {0} already exists.")]
    BranchExists(String),

    #[error("A branch with the name {0} does not exist.")]
    BranchNotFound(String),

    #[error("Cannot remove the current branch {0}.")]
    CannotDeleteCurrentBranch(String),

    #[error("No need to checkout the current branch {0}.")]
    NoSuchBranchToCheckout(String),

    #[error("Found no commit with that message.")]
    NoCommitsFound,

    #[error("Cannot merge a branch with itself.")]
    NothingToMerge,

    #[error("You have uncommitted changes.")]
    UncommittedChanges,

    #[error("The two histories share no common ancestor.")]
    UnrelatedHistory,

    #[error("Not in an initialized gitlet directory: {0}")]
    NotARepository(String),

    #[error("The current branch has no commits yet.")]
    NoCommitsYet,

    #[error("A gitlet version-control system already exists in {0}.")]
    AlreadyInitialized(String),

    #[error(
        "There is an untracked file in the way; delete it, or add and commit it first: {}",
        .0.join(", ")
    )]
    UntrackedFileInTheWay(Vec<String>),

    #[error(
        "There is a file with unstaged changes; delete it, or add and commit it first: {}",
        .0.join(", ")
    )]
    UnstagedChanges(Vec<String>),

    #[error("Invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("No commit with id {0} exists.")]
    NoSuchCommit(String),

    #[error("Commit id {0} is ambiguous.")]
    AmbiguousCommit(String),

    #[error("File does not exist in that commit: {0}")]
    FileNotInCommit(String),

    #[error("File does not exist: {0}")]
    FileNotFound(String),
}

impl RepositoryError {
    /// Process exit code for a user-facing failure.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Look for a repository error anywhere in an error chain.
pub fn find_repository_error(error: &anyhow::Error) -> Option<&RepositoryError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<RepositoryError>())
}
