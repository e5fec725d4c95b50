//! `GitSource` backed by libgit2, with the git binary for network operations

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use chrono::{Local, TimeZone};
use git2::{BranchType, Repository, RepositoryState, Sort, Status, StatusOptions};
use tracing::{debug, info};

use super::{
    diff::CommitDiff, operations, strip_remote_prefix, GitSource, RawBranch, RawCommit, RawRepo,
    RawStatus, RawTag,
};
use crate::error::{RepoError, Result};

/// Reads and mutates a repository on disk.
///
/// `git2::Repository` is not `Sync`, so every call opens its own handle.
pub struct Git2Source {
    path: PathBuf,
}

impl Git2Source {
    /// Discover the repository containing `path` and use its working directory root
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)?;
        let root = repo
            .workdir()
            .ok_or_else(|| RepoError::GitUnavailable("bare repositories are not supported".to_string()))?
            .to_path_buf();
        Ok(Self { path: root })
    }

    fn open(&self) -> Result<Repository> {
        Ok(Repository::open(&self.path)?)
    }

    /// Run the git binary in the repository root, returning stdout
    fn git(&self, args: &[&str]) -> Result<String> {
        debug!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(|e| RepoError::GitUnavailable(format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            if stdout.contains("CONFLICT") || stderr.contains("CONFLICT") {
                return Err(RepoError::MergeConflicts);
            }
            return Err(RepoError::GitUnavailable(stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn get_log(repo: &Repository, max_commits: usize) -> Result<Vec<RawCommit>> {
        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push_glob("refs/heads")?;
        revwalk.push_glob("refs/remotes")?;
        if repo.head().is_ok() {
            // Detached HEAD is not reachable from any ref
            revwalk.push_head()?;
        }

        let mut commits = Vec::new();
        for oid in revwalk.take(max_commits) {
            let oid = oid?;
            let commit = repo.find_commit(oid)?;
            let message = commit.message().unwrap_or_default().to_string();
            let subject = message.lines().next().unwrap_or_default().trim().to_string();
            let author_time = Local
                .timestamp_opt(commit.author().when().seconds(), 0)
                .single()
                .unwrap_or_else(Local::now);

            commits.push(RawCommit {
                id: oid.to_string(),
                parent_ids: commit.parent_ids().map(|p| p.to_string()).collect(),
                subject,
                message: message.trim_end().to_string(),
                author: commit.author().name().unwrap_or_default().to_string(),
                author_time,
            });
        }
        Ok(commits)
    }

    fn get_branches(repo: &Repository) -> Result<Vec<RawBranch>> {
        let mut branches = Vec::new();

        let head_name = repo
            .head()
            .ok()
            .filter(|h| h.is_branch())
            .and_then(|h| h.shorthand().map(|s| s.to_string()));

        for branch_result in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch_result?;
            let Some(name) = branch.name()? else {
                continue;
            };
            let Some(oid) = branch.get().target() else {
                continue;
            };

            let remote_name = branch
                .upstream()
                .ok()
                .and_then(|u| u.name().ok().flatten().map(|s| s.to_string()))
                .unwrap_or_default();

            branches.push(RawBranch {
                name: name.to_string(),
                display_name: name.to_string(),
                tip_id: oid.to_string(),
                is_current: head_name.as_deref() == Some(name),
                is_remote: false,
                remote_name,
            });
        }

        for branch_result in repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = branch_result?;
            let Some(name) = branch.name()? else {
                continue;
            };
            if name.ends_with("/HEAD") {
                continue;
            }
            let Some(oid) = branch.get().target() else {
                continue;
            };

            branches.push(RawBranch {
                name: name.to_string(),
                display_name: strip_remote_prefix(name).to_string(),
                tip_id: oid.to_string(),
                is_current: false,
                is_remote: true,
                remote_name: String::new(),
            });
        }

        Ok(branches)
    }

    fn read_status(repo: &Repository) -> Result<RawStatus> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .exclude_submodules(true);

        let mut status = RawStatus::default();
        for entry in repo.statuses(Some(&mut opts))?.iter() {
            let s = entry.status();
            if s.contains(Status::CONFLICTED) {
                status.conflicted += 1;
            } else if s.intersects(Status::WT_NEW | Status::INDEX_NEW) {
                status.added += 1;
            } else if s.intersects(Status::WT_DELETED | Status::INDEX_DELETED) {
                status.deleted += 1;
            } else if !s.is_empty() && !s.contains(Status::IGNORED) {
                status.modified += 1;
            }
        }

        if repo.state() == RepositoryState::Merge {
            status.is_merging = true;
            status.merge_message = repo
                .message()
                .ok()
                .and_then(|m| m.lines().next().map(|l| l.trim().to_string()))
                .unwrap_or_default();
        }
        Ok(status)
    }

    fn get_tags(repo: &Repository) -> Result<Vec<RawTag>> {
        let mut tags = Vec::new();
        for reference in repo.references_glob("refs/tags/*")? {
            let reference = reference?;
            let Some(name) = reference.shorthand().map(|s| s.to_string()) else {
                continue;
            };
            if let Ok(commit) = reference.peel_to_commit() {
                tags.push(RawTag {
                    commit_id: commit.id().to_string(),
                    tag_name: name,
                });
            }
        }
        Ok(tags)
    }
}

impl GitSource for Git2Source {
    fn repo_path(&self) -> &Path {
        &self.path
    }

    fn get_repo(&self, max_commits: usize) -> Result<RawRepo> {
        let started = Instant::now();
        let repo = self.open()?;

        // An empty repository has no log yet
        let commits = if repo.is_empty()? {
            Vec::new()
        } else {
            Self::get_log(&repo, max_commits)?
        };
        let raw = RawRepo {
            commits,
            branches: Self::get_branches(&repo)?,
            status: Self::read_status(&repo)?,
            tags: Self::get_tags(&repo)?,
        };

        info!(
            "Read git repo {:?} in {:?}: {} commits, {} branches, {} tags",
            self.path,
            started.elapsed(),
            raw.commits.len(),
            raw.branches.len(),
            raw.tags.len()
        );
        Ok(raw)
    }

    fn get_status(&self) -> Result<RawStatus> {
        Self::read_status(&self.open()?)
    }

    fn get_commit_diff(&self, id: &str) -> Result<CommitDiff> {
        CommitDiff::from_commit(&self.open()?, id)
    }

    fn checkout(&self, name: &str) -> Result<()> {
        let repo = self.open()?;
        if repo.find_branch(name, BranchType::Local).is_ok() {
            operations::checkout_branch(&repo, name)
        } else {
            operations::checkout_remote_branch(&repo, name)
        }
    }

    fn commit(&self, message: &str) -> Result<()> {
        operations::commit_all(&self.open()?, message)
    }

    fn push_branch(&self, name: &str) -> Result<()> {
        let refs = format!("refs/heads/{}:refs/heads/{}", name, name);
        self.git(&["push", "--porcelain", "origin", "--set-upstream", &refs])?;
        Ok(())
    }

    fn pull_current_branch(&self) -> Result<()> {
        self.git(&["pull", "--ff", "--no-rebase"])?;
        Ok(())
    }

    fn pull_branch(&self, name: &str) -> Result<()> {
        let name = strip_remote_prefix(name);
        let refs = format!("{}:{}", name, name);
        self.git(&["fetch", "origin", &refs])?;
        Ok(())
    }

    fn merge_branch(&self, name: &str) -> Result<()> {
        operations::merge_branch(&self.open()?, name)
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        let repo = self.open()?;
        let head = repo.head()?.peel_to_commit()?;
        operations::create_branch(&repo, name, head.id())?;
        operations::checkout_branch(&repo, name)
    }

    fn delete_local_branch(&self, name: &str) -> Result<()> {
        operations::delete_branch(&self.open()?, name)
    }

    fn delete_remote_branch(&self, name: &str) -> Result<()> {
        self.git(&["push", "--porcelain", "origin", "--delete", strip_remote_prefix(name)])?;
        Ok(())
    }

    fn fetch(&self) -> Result<()> {
        self.git(&["fetch", "--force", "--prune", "--tags", "--prune-tags", "origin"])?;
        Ok(())
    }
}
