//! Augmented repository: raw git data with an inferred branch per commit

pub mod hierarchy;
pub mod inference;
pub mod subject;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Local, TimeZone};
use tracing::debug;

use crate::error::Result;
use crate::git::{
    strip_remote_prefix, to_sid, RawBranch, RawCommit, RawRepo, RawStatus, RawTag,
    PARTIAL_LOG_COMMIT_ID,
};

pub type CommitIdx = usize;
pub type BranchIdx = usize;

/// User set parent/children relations, keyed by branch base name
pub type BranchesChildren = BTreeMap<String, Vec<String>>;

/// How a branch came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// A live git branch (local or remote)
    Git,
    /// Synthesized for a deleted branch, named from a merge subject or the commit id
    Named,
    /// Placeholder for commits that could belong to several branches
    Ambiguous,
}

#[derive(Debug, Clone)]
pub struct AugBranch {
    pub name: String,
    pub display_name: String,
    pub kind: BranchKind,
    pub tip_id: String,
    /// Deepest commit assigned to this branch
    pub bottom_id: String,
    pub parent: Option<BranchIdx>,
    pub is_remote: bool,
    /// Remote branch of a local branch
    pub remote_name: String,
    /// Local branch of a remote branch
    pub local_name: String,
    pub is_current: bool,
    pub is_set_as_parent: bool,
    /// Child branches of the fork point this branch won in an ambiguous collapse
    pub ambiguous_branches: Vec<BranchIdx>,
    pub ambiguous_tip_id: String,
}

impl AugBranch {
    fn from_git(raw: RawBranch) -> Self {
        Self {
            name: raw.name,
            display_name: raw.display_name,
            kind: BranchKind::Git,
            tip_id: raw.tip_id,
            bottom_id: String::new(),
            parent: None,
            is_remote: raw.is_remote,
            remote_name: raw.remote_name,
            local_name: String::new(),
            is_current: raw.is_current,
            is_set_as_parent: false,
            ambiguous_branches: Vec::new(),
            ambiguous_tip_id: String::new(),
        }
    }

    fn synthesized(kind: BranchKind, name: String, display_name: String, tip_id: &str) -> Self {
        Self {
            name,
            display_name,
            kind,
            tip_id: tip_id.to_string(),
            bottom_id: String::new(),
            parent: None,
            is_remote: false,
            remote_name: String::new(),
            local_name: String::new(),
            is_current: false,
            is_set_as_parent: false,
            ambiguous_branches: Vec::new(),
            ambiguous_tip_id: String::new(),
        }
    }

    /// Branch recovered from a merge subject, e.g. `topic:a1b2c3` shown as `topic`
    pub fn named(tip_id: &str, branch_name: &str) -> Self {
        Self::synthesized(
            BranchKind::Named,
            format!("{}:{}", branch_name, to_sid(tip_id)),
            branch_name.to_string(),
            tip_id,
        )
    }

    /// Branch with no known name, e.g. `branch:a1b2c3` shown as `branch@a1b2c3`
    pub fn id_named(tip_id: &str) -> Self {
        let sid = to_sid(tip_id);
        Self::synthesized(
            BranchKind::Named,
            format!("branch:{}", sid),
            format!("branch@{}", sid),
            tip_id,
        )
    }

    pub fn ambiguous(tip_id: &str) -> Self {
        let sid = to_sid(tip_id);
        Self::synthesized(
            BranchKind::Ambiguous,
            format!("ambiguous:{}", sid),
            format!("ambiguous@{}", sid),
            tip_id,
        )
    }

    pub fn is_git_branch(&self) -> bool {
        self.kind == BranchKind::Git
    }

    pub fn is_named_branch(&self) -> bool {
        self.kind == BranchKind::Named
    }

    pub fn is_ambiguous_branch(&self) -> bool {
        self.kind == BranchKind::Ambiguous
    }

    /// Display name without any remote prefix, shared by a local and its remote
    pub fn base_name(&self) -> &str {
        strip_remote_prefix(&self.display_name)
    }
}

#[derive(Debug, Clone)]
pub struct AugCommit {
    pub id: String,
    pub sid: String,
    pub subject: String,
    pub message: String,
    pub author: String,
    pub author_time: DateTime<Local>,
    /// First parent continues the branch. Swapped for pull merges.
    pub parent_ids: Vec<String>,
    pub child_ids: Vec<String>,
    pub first_parent: Option<CommitIdx>,
    pub merge_parent: Option<CommitIdx>,
    pub children: Vec<CommitIdx>,
    pub merge_children: Vec<CommitIdx>,
    pub branch: BranchIdx,
    /// Candidate branches
    pub branches: Vec<BranchIdx>,
    pub branch_tip_names: Vec<String>,
    pub is_current: bool,
    pub is_likely: bool,
    pub is_ambiguous: bool,
    pub is_ambiguous_tip: bool,
}

impl AugCommit {
    fn from_raw(raw: RawCommit) -> Self {
        Self {
            sid: to_sid(&raw.id),
            id: raw.id,
            subject: raw.subject,
            message: raw.message,
            author: raw.author,
            author_time: raw.author_time,
            parent_ids: raw.parent_ids,
            child_ids: Vec::new(),
            first_parent: None,
            merge_parent: None,
            children: Vec::new(),
            merge_children: Vec::new(),
            branch: 0,
            branches: Vec::new(),
            branch_tip_names: Vec::new(),
            is_current: false,
            is_likely: false,
            is_ambiguous: false,
            is_ambiguous_tip: false,
        }
    }

    /// Virtual commit standing in for everything beyond a truncated log
    fn partial_log() -> Self {
        let subject = "...    (more commits)".to_string();
        let author_time = Local
            .with_ymd_and_hms(2000, 1, 1, 1, 1, 0)
            .single()
            .unwrap_or_else(Local::now);
        Self::from_raw(RawCommit {
            id: PARTIAL_LOG_COMMIT_ID.to_string(),
            parent_ids: Vec::new(),
            subject: subject.clone(),
            message: subject,
            author: String::new(),
            author_time,
        })
    }

    /// Case insensitive search in id, message and author. `lower_text` must be lower case.
    pub fn contains_text(&self, lower_text: &str) -> bool {
        [&self.id, &self.message, &self.author]
            .iter()
            .any(|t| t.to_lowercase().contains(lower_text))
    }
}

/// Working tree status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
    pub modified: usize,
    pub added: usize,
    pub deleted: usize,
    pub conflicted: usize,
    pub is_merging: bool,
    pub merge_message: String,
}

impl Status {
    pub fn ok(&self) -> bool {
        self.all_changes() == 0 && !self.is_merging
    }

    pub fn all_changes(&self) -> usize {
        self.modified + self.added + self.deleted + self.conflicted
    }
}

impl From<RawStatus> for Status {
    fn from(s: RawStatus) -> Self {
        Self {
            modified: s.modified,
            added: s.added,
            deleted: s.deleted,
            conflicted: s.conflicted,
            is_merging: s.is_merging,
            merge_message: s.merge_message,
        }
    }
}

pub type Tag = RawTag;

/// Repository with every commit assigned to exactly one branch.
/// Immutable once built; shared behind `Arc`.
#[derive(Debug, Clone)]
pub struct AugRepo {
    pub commits: Vec<AugCommit>,
    pub branches: Vec<AugBranch>,
    pub status: Status,
    pub tags: Vec<Tag>,
    pub repo_path: PathBuf,
    commit_index: HashMap<String, CommitIdx>,
}

impl AugRepo {
    pub fn commit_index(&self, id: &str) -> Option<CommitIdx> {
        self.commit_index.get(id).copied()
    }

    pub fn commit_by_id(&self, id: &str) -> Option<&AugCommit> {
        self.commit_index(id).map(|i| &self.commits[i])
    }

    pub fn branch_index(&self, name: &str) -> Option<BranchIdx> {
        self.branches.iter().position(|b| b.name == name)
    }

    pub fn branch_by_name(&self, name: &str) -> Option<&AugBranch> {
        self.branch_index(name).map(|i| &self.branches[i])
    }

    pub fn current_branch(&self) -> Option<BranchIdx> {
        self.branches.iter().position(|b| b.is_current)
    }

    /// Parent chain of a branch, nearest parent first
    pub fn ancestors(&self, branch: BranchIdx) -> Vec<BranchIdx> {
        let mut ancestors = Vec::new();
        let mut current = self.branches[branch].parent;
        while let Some(p) = current {
            // Parent links may form a loop in odd histories
            if p == branch || ancestors.contains(&p) {
                break;
            }
            ancestors.push(p);
            current = self.branches[p].parent;
        }
        ancestors
    }

    pub fn is_ancestor(&self, branch: BranchIdx, ancestor: BranchIdx) -> bool {
        self.ancestors(branch).contains(&ancestor)
    }

    /// Same repository with a new working tree status
    pub fn with_status(&self, status: Status) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// Build the augmented repository from raw git data
pub fn build(raw: RawRepo, branches_children: &BranchesChildren, repo_path: &Path) -> Result<AugRepo> {
    let started = Instant::now();
    let RawRepo {
        commits,
        branches,
        status,
        tags,
    } = raw;

    let mut builder = RepoBuilder::new(commits, branches);
    builder.set_commit_branches_and_children();
    builder.determine_commit_branches(branches_children);
    builder.merge_ambiguous_branches()?;
    let mut repo = builder.finish(status.into(), tags, repo_path)?;
    hierarchy::determine_branch_hierarchy(&mut repo, branches_children);

    debug!(
        "Augmented repo with {} commits and {} branches in {:?}",
        repo.commits.len(),
        repo.branches.len(),
        started.elapsed()
    );
    Ok(repo)
}

/// Mutable state while inferring branches.
///
/// Commits are in log order, newest first, so children precede their parents.
/// `assigned` holds the branch of each commit once it has been determined.
pub(crate) struct RepoBuilder {
    pub(crate) commits: Vec<AugCommit>,
    pub(crate) branches: Vec<AugBranch>,
    pub(crate) assigned: Vec<Option<BranchIdx>>,
    pub(crate) removed: HashSet<BranchIdx>,
    pub(crate) index: HashMap<String, CommitIdx>,
    pub(crate) names: subject::SubjectParser,
}

impl RepoBuilder {
    fn new(raw_commits: Vec<RawCommit>, raw_branches: Vec<RawBranch>) -> Self {
        let mut builder = Self {
            commits: Vec::with_capacity(raw_commits.len() + 1),
            branches: Vec::new(),
            assigned: Vec::new(),
            removed: HashSet::new(),
            index: HashMap::new(),
            names: subject::SubjectParser::new(),
        };
        builder.set_git_commits(raw_commits);
        builder.set_git_branches(raw_branches);
        builder.set_git_branch_tips();
        builder
    }

    /// Parents missing from the log point to the partial log commit, appended last
    fn set_git_commits(&mut self, raw_commits: Vec<RawCommit>) {
        let ids: HashSet<String> = raw_commits.iter().map(|c| c.id.clone()).collect();
        let mut is_partial = false;

        for raw in raw_commits {
            let mut commit = AugCommit::from_raw(raw);
            for parent_id in commit.parent_ids.iter_mut() {
                if !ids.contains(parent_id.as_str()) {
                    *parent_id = PARTIAL_LOG_COMMIT_ID.to_string();
                    is_partial = true;
                }
            }
            self.index.insert(commit.id.clone(), self.commits.len());
            self.commits.push(commit);
        }

        if is_partial {
            let partial = AugCommit::partial_log();
            self.index.insert(partial.id.clone(), self.commits.len());
            self.commits.push(partial);
        }
        self.assigned = vec![None; self.commits.len()];
    }

    /// Pair locals with their remotes. Branches whose tip is not in the log are dropped.
    fn set_git_branches(&mut self, raw_branches: Vec<RawBranch>) {
        self.branches = raw_branches
            .into_iter()
            .filter(|b| self.index.contains_key(&b.tip_id))
            .map(AugBranch::from_git)
            .collect();

        for i in 0..self.branches.len() {
            if self.branches[i].remote_name.is_empty() {
                continue;
            }
            let remote_name = self.branches[i].remote_name.clone();
            match self.branches.iter().position(|b| b.name == remote_name) {
                Some(r) => self.branches[r].local_name = self.branches[i].name.clone(),
                None => self.branches[i].remote_name.clear(),
            }
        }
    }

    /// Every tip commit knows the branches pointing at it
    fn set_git_branch_tips(&mut self) {
        for b in 0..self.branches.len() {
            let Some(&tip) = self.index.get(&self.branches[b].tip_id) else {
                continue;
            };
            self.add_branch(tip, b);
            let name = self.branches[b].name.clone();
            self.commits[tip].branch_tip_names.push(name);
            if self.branches[b].is_current {
                self.commits[tip].is_current = true;
            }
        }
    }

    pub(crate) fn add_branch(&mut self, commit: CommitIdx, branch: BranchIdx) {
        if !self.commits[commit].branches.contains(&branch) {
            self.commits[commit].branches.push(branch);
        }
    }

    /// Inherit candidate branches from a child
    pub(crate) fn add_branches(&mut self, commit: CommitIdx, branches: &[BranchIdx]) {
        if self.commits[commit].branches.is_empty() {
            self.commits[commit].branches = branches.to_vec();
            return;
        }
        if self.equal_branches(commit, branches) {
            return;
        }
        for &b in branches {
            self.add_branch(commit, b);
        }
    }

    fn equal_branches(&self, commit: CommitIdx, branches: &[BranchIdx]) -> bool {
        let own = &self.commits[commit].branches;
        own.len() == branches.len()
            && own
                .iter()
                .zip(branches)
                .all(|(&a, &b)| a == b || self.branches[a].name == self.branches[b].name)
    }

    pub(crate) fn push_branch(&mut self, branch: AugBranch) -> BranchIdx {
        self.branches.push(branch);
        self.branches.len() - 1
    }

    /// Drop removed branches and resolve the final branch of every commit
    fn finish(self, status: Status, tags: Vec<Tag>, repo_path: &Path) -> Result<AugRepo> {
        let mut remap: Vec<Option<BranchIdx>> = vec![None; self.branches.len()];
        let mut branches = Vec::with_capacity(self.branches.len());
        for (i, b) in self.branches.into_iter().enumerate() {
            if self.removed.contains(&i) {
                continue;
            }
            remap[i] = Some(branches.len());
            branches.push(b);
        }
        for b in branches.iter_mut() {
            b.ambiguous_branches = b.ambiguous_branches.iter().filter_map(|&a| remap[a]).collect();
        }

        let mut commits = self.commits;
        for (i, c) in commits.iter_mut().enumerate() {
            c.branch = self.assigned[i].and_then(|b| remap[b]).ok_or_else(|| {
                crate::error::RepoError::RepoInconsistent(format!("commit {} has no branch", c.sid))
            })?;
            c.branches = c.branches.iter().filter_map(|&b| remap[b]).collect();
        }

        Ok(AugRepo {
            commits,
            branches,
            status,
            tags,
            repo_path: repo_path.to_path_buf(),
            commit_index: self.index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_names() {
        let id = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2";
        let named = AugBranch::named(id, "topic");
        assert_eq!(named.name, "topic:a1b2c3");
        assert_eq!(named.display_name, "topic");
        assert!(named.is_named_branch());

        let id_named = AugBranch::id_named(id);
        assert_eq!(id_named.name, "branch:a1b2c3");
        assert_eq!(id_named.display_name, "branch@a1b2c3");

        let ambiguous = AugBranch::ambiguous(id);
        assert_eq!(ambiguous.display_name, "ambiguous@a1b2c3");
        assert!(ambiguous.is_ambiguous_branch());
    }

    #[test]
    fn test_status_ok() {
        let mut status = Status::default();
        assert!(status.ok());
        status.modified = 2;
        status.conflicted = 1;
        assert_eq!(status.all_changes(), 3);
        assert!(!status.ok());

        let merging = Status {
            is_merging: true,
            ..Default::default()
        };
        assert!(!merging.ok());
    }
}
