//! View repository: the branches selected for display and their commits

pub mod ahead_behind;
pub mod projector;

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use ratatui::style::Color;

use crate::augmented::BranchKind;
use crate::git::UNCOMMITTED_ID;
use crate::graph::{GraphCell, More};

pub use projector::{project, status_text, ProjectOptions};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewBranch {
    pub name: String,
    pub display_name: String,
    /// Graph column
    pub index: usize,
    pub kind: BranchKind,
    pub tip_id: String,
    pub bottom_id: String,
    /// Row of the tip commit
    pub tip: Option<usize>,
    /// Row of the bottom commit
    pub bottom: Option<usize>,
    pub parent: Option<usize>,
    pub parent_name: String,
    pub is_remote: bool,
    pub remote_name: String,
    pub local_name: String,
    pub is_current: bool,
    pub is_set_as_parent: bool,
    pub has_local_only: bool,
    pub has_remote_only: bool,
    pub color: Color,
    pub ambiguous_branch_names: Vec<String>,
    pub ambiguous_tip_id: String,
}

impl ViewBranch {
    pub fn is_git_branch(&self) -> bool {
        self.kind == BranchKind::Git
    }

    pub fn is_ambiguous_branch(&self) -> bool {
        self.kind == BranchKind::Ambiguous
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewCommit {
    pub id: String,
    pub sid: String,
    pub subject: String,
    pub message: String,
    pub author: String,
    pub author_time: DateTime<Local>,
    pub parent_ids: Vec<String>,
    pub child_ids: Vec<String>,
    /// Row
    pub index: usize,
    /// Column of the commit's branch
    pub branch: usize,
    /// Row of the first parent, if shown
    pub first_parent: Option<usize>,
    /// Row of the merge parent, if shown
    pub merge_parent: Option<usize>,
    pub branch_tip_names: Vec<String>,
    pub tags: Vec<String>,
    pub more: More,
    pub is_current: bool,
    pub is_ambiguous: bool,
    pub is_ambiguous_tip: bool,
    pub is_local_only: bool,
    pub is_remote_only: bool,
}

impl ViewCommit {
    pub fn is_uncommitted(&self) -> bool {
        self.id == UNCOMMITTED_ID
    }
}

/// Immutable snapshot published to the viewer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewRepo {
    pub commits: Vec<ViewCommit>,
    pub branches: Vec<ViewBranch>,
    pub current_branch_name: String,
    pub repo_path: PathBuf,
    pub uncommitted_changes: usize,
    pub conflicts: usize,
    pub merge_message: String,
    /// One row per commit, one cell per branch. Empty for search results.
    pub graph: Vec<Vec<GraphCell>>,
    commit_index: HashMap<String, usize>,
}

impl ViewRepo {
    pub fn commit_by_id(&self, id: &str) -> Option<&ViewCommit> {
        self.commit_index.get(id).map(|&i| &self.commits[i])
    }

    pub fn commit_row(&self, id: &str) -> Option<usize> {
        self.commit_index.get(id).copied()
    }

    pub fn branch_by_name(&self, name: &str) -> Option<&ViewBranch> {
        self.branches.iter().find(|b| b.name == name)
    }

    pub fn contains_branch(&self, name: &str) -> bool {
        self.branches.iter().any(|b| b.name == name)
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.branches.iter().map(|b| b.name.clone()).collect()
    }

    pub fn graph_row(&self, row: usize) -> &[GraphCell] {
        self.graph.get(row).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_search(&self) -> bool {
        self.graph.is_empty() && !self.commits.is_empty()
    }

    pub(crate) fn push_commit(&mut self, commit: ViewCommit) {
        self.commit_index.insert(commit.id.clone(), self.commits.len());
        self.commits.push(commit);
    }
}
