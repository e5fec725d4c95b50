//! Raw Git data consumed by the repository engine

pub mod diff;
pub mod operations;
pub mod repository;

use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::Result;

pub use diff::{CommitDiff, DiffMode, FileDiff, LineDiff, LineMode, SectionDiff};
pub use repository::Git2Source;

/// Id of the virtual commit that represents working tree changes
pub const UNCOMMITTED_ID: &str = "0000000000000000000000000000000000000000";
pub const UNCOMMITTED_SID: &str = "000000";

/// Id of the virtual commit that stands in for parents cut off by a truncated log
pub const PARTIAL_LOG_COMMIT_ID: &str = "ffffffffffffffffffffffffffffffffffffffff";

/// Maximum number of commits read from the log
pub const DEFAULT_MAX_COMMITS: usize = 30_000;

pub const REMOTE_PREFIXES: [&str; 3] = ["refs/remotes/origin/", "remotes/origin/", "origin/"];

/// Backbone branches, in priority order
pub const DEFAULT_BRANCH_PRIORITY: [&str; 4] = ["origin/main", "main", "origin/master", "master"];

/// Short id (6 chars)
pub fn to_sid(id: &str) -> String {
    id.chars().take(6).collect()
}

/// Strip a leading remote prefix such as "origin/"
pub fn strip_remote_prefix(name: &str) -> &str {
    REMOTE_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
}

pub fn is_main_branch(name: &str) -> bool {
    DEFAULT_BRANCH_PRIORITY.contains(&name)
}

#[derive(Debug, Clone)]
pub struct RawCommit {
    pub id: String,
    /// First parent continues the branch, the second one is merged in
    pub parent_ids: Vec<String>,
    pub subject: String,
    pub message: String,
    pub author: String,
    pub author_time: DateTime<Local>,
}

#[derive(Debug, Clone, Default)]
pub struct RawBranch {
    pub name: String,
    pub display_name: String,
    pub tip_id: String,
    pub is_current: bool,
    pub is_remote: bool,
    /// Upstream remote branch of a local branch, empty otherwise
    pub remote_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStatus {
    pub modified: usize,
    pub added: usize,
    pub deleted: usize,
    pub conflicted: usize,
    pub is_merging: bool,
    pub merge_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTag {
    pub commit_id: String,
    pub tag_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct RawRepo {
    pub commits: Vec<RawCommit>,
    pub branches: Vec<RawBranch>,
    pub status: RawStatus,
    pub tags: Vec<RawTag>,
}

/// Source of raw repository data and the imperatives run against it.
///
/// `get_repo` returns commits newest first across all branches, children before
/// their parents. The log may be truncated to `max_commits`.
pub trait GitSource: Send + Sync {
    fn repo_path(&self) -> &Path;

    fn get_repo(&self, max_commits: usize) -> Result<RawRepo>;
    fn get_status(&self) -> Result<RawStatus>;
    fn get_commit_diff(&self, id: &str) -> Result<CommitDiff>;

    fn checkout(&self, name: &str) -> Result<()>;
    fn commit(&self, message: &str) -> Result<()>;
    fn push_branch(&self, name: &str) -> Result<()>;
    fn pull_current_branch(&self) -> Result<()>;
    fn pull_branch(&self, name: &str) -> Result<()>;
    fn merge_branch(&self, name: &str) -> Result<()>;
    fn create_branch(&self, name: &str) -> Result<()>;
    fn delete_local_branch(&self, name: &str) -> Result<()>;
    fn delete_remote_branch(&self, name: &str) -> Result<()>;
    fn fetch(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_remote_prefix() {
        assert_eq!(strip_remote_prefix("origin/main"), "main");
        assert_eq!(strip_remote_prefix("remotes/origin/feature/x"), "feature/x");
        assert_eq!(strip_remote_prefix("refs/remotes/origin/dev"), "dev");
        assert_eq!(strip_remote_prefix("topic"), "topic");
    }

    #[test]
    fn test_to_sid() {
        assert_eq!(to_sid("abcdef0123456789"), "abcdef");
        assert_eq!(to_sid("abc"), "abc");
    }
}
