//! Error taxonomy of the repository engine

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// Git failed or is missing. Carries git's own message unchanged.
    #[error("{0}")]
    GitUnavailable(String),

    #[error("repository is inconsistent: {0}")]
    RepoInconsistent(String),

    #[error("unknown branch '{0}'")]
    BranchNotFound(String),

    #[error("branch '{0}' is protected")]
    ProtectedBranch(String),

    #[error("not a git branch '{0}'")]
    NotGitBranch(String),

    #[error("branch '{0}' is not part of an ambiguous branch point")]
    NotAmbiguous(String),

    #[error("merge resulted in conflict(s)")]
    MergeConflicts,

    #[error("config: {0}")]
    Config(String),
}

impl From<git2::Error> for RepoError {
    fn from(err: git2::Error) -> Self {
        RepoError::GitUnavailable(err.message().to_string())
    }
}

pub type Result<T> = std::result::Result<T, RepoError>;
