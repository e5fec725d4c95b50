//! Projects an augmented repository onto the branches selected for display

use std::collections::HashMap;
use std::time::Instant;

use chrono::Local;
use ratatui::style::Color;
use tracing::debug;

use super::{ahead_behind, ViewBranch, ViewCommit, ViewRepo};
use crate::augmented::{AugBranch, AugCommit, AugRepo, BranchIdx};
use crate::git::{strip_remote_prefix, DEFAULT_BRANCH_PRIORITY, UNCOMMITTED_ID, UNCOMMITTED_SID};
use crate::graph::{colors, rasterize, More};

#[derive(Debug, Clone, Default)]
pub struct ProjectOptions {
    /// Hide a local branch when its remote is shown with the same tip
    pub elide_synced_locals: bool,
    /// Color overrides by branch display name
    pub branch_colors: HashMap<String, Color>,
}

/// Build the view of `names` (plus their ancestors) with graph and colors.
/// An empty request shows the current branch, or else main/master.
pub fn project(aug: &AugRepo, names: &[String], options: &ProjectOptions) -> ViewRepo {
    let started = Instant::now();

    let mut selected = select_branches(aug, names);
    if options.elide_synced_locals {
        selected = remove_same_local_as_remotes(aug, selected);
    }

    let mut repo = new_view_repo(aug);
    let view_index = add_branches(&mut repo, aug, &selected);

    if let Some(current) = aug.current_branch() {
        repo.current_branch_name = aug.branches[current].name.clone();
    }

    if !aug.status.ok() {
        add_virtual_status_commit(&mut repo, aug, &view_index);
    }
    for c in &aug.commits {
        if let Some(&b) = view_index.get(&c.branch) {
            let row = repo.commits.len();
            repo.push_commit(to_view_commit(c, row, b));
        }
    }

    add_tags(&mut repo, aug);
    adjust_current_branch_if_status(&mut repo);
    set_branch_rows(&mut repo);
    set_parent_child_relations(&mut repo);
    ahead_behind::set_ahead_behind(&mut repo);
    colors::assign_branch_colors(&mut repo.branches, &options.branch_colors);
    repo.graph = rasterize(&repo);

    debug!(
        "Projected {} branches and {} commits in {:?}",
        repo.branches.len(),
        repo.commits.len(),
        started.elapsed()
    );
    repo
}

pub(crate) fn new_view_repo(aug: &AugRepo) -> ViewRepo {
    ViewRepo {
        repo_path: aug.repo_path.clone(),
        uncommitted_changes: aug.status.all_changes(),
        conflicts: aug.status.conflicted,
        merge_message: aug.status.merge_message.clone(),
        ..Default::default()
    }
}

/// Add branches as columns, in order, and link their parents among the shown branches
pub(crate) fn add_branches(repo: &mut ViewRepo, aug: &AugRepo, selected: &[BranchIdx]) -> HashMap<BranchIdx, usize> {
    let view_index: HashMap<BranchIdx, usize> = selected.iter().enumerate().map(|(i, &b)| (b, i)).collect();
    for (i, &b) in selected.iter().enumerate() {
        let mut branch = to_view_branch(aug, &aug.branches[b], i);
        branch.parent = aug.branches[b].parent.and_then(|p| view_index.get(&p).copied());
        repo.branches.push(branch);
    }
    view_index
}

/// Requested branches with their ancestors, local/remote counterparts, in column order
pub fn select_branches(aug: &AugRepo, names: &[String]) -> Vec<BranchIdx> {
    let names = if names.is_empty() {
        default_branch_names(aug)
    } else {
        names.to_vec()
    };

    let mut branches = Vec::new();
    let mut not_found = Vec::new();
    for name in &names {
        match aug.branch_index(name) {
            Some(b) => add_with_ancestors(aug, &mut branches, b),
            None => not_found.push(name),
        }
    }

    // Deleted branches get new names on rebuild but keep their display name
    for name in not_found {
        let display_name = strip_remote_prefix(name);
        if let Some(b) = aug.branches.iter().position(|b| b.display_name == display_name) {
            add_with_ancestors(aug, &mut branches, b);
        }
    }

    let branches = add_counterparts(aug, &branches, |b| &b.local_name);
    let mut branches = add_counterparts(aug, &branches, |b| &b.remote_name);
    sort_branches(aug, &mut branches);
    branches
}

/// Current branch with ancestors, or the first main branch that exists. Root first.
pub fn default_branch_names(aug: &AugRepo) -> Vec<String> {
    let branch = aug
        .current_branch()
        .or_else(|| DEFAULT_BRANCH_PRIORITY.iter().find_map(|name| aug.branch_index(name)));

    let Some(branch) = branch else {
        return Vec::new();
    };
    let mut names: Vec<String> = aug
        .ancestors(branch)
        .into_iter()
        .rev()
        .map(|b| aug.branches[b].name.clone())
        .collect();
    names.push(aug.branches[branch].name.clone());
    names
}

fn add_with_ancestors(aug: &AugRepo, branches: &mut Vec<BranchIdx>, branch: BranchIdx) {
    for b in std::iter::once(branch).chain(aug.ancestors(branch)) {
        if !branches.contains(&b) {
            branches.push(b);
        }
    }
}

/// Insert the local (or remote) counterpart right after each branch
fn add_counterparts(aug: &AugRepo, branches: &[BranchIdx], counterpart: impl Fn(&AugBranch) -> &String) -> Vec<BranchIdx> {
    let mut result = Vec::with_capacity(branches.len());
    for &b in branches {
        result.push(b);
        let name = counterpart(&aug.branches[b]);
        if name.is_empty() || branches.iter().any(|&o| &aug.branches[o].name == name) {
            continue;
        }
        if let Some(other) = aug.branch_index(name) {
            if !result.contains(&other) {
                result.push(other);
            }
        }
    }
    result
}

fn priority_index(name: &str) -> Option<usize> {
    DEFAULT_BRANCH_PRIORITY.iter().position(|&p| p == name)
}

/// `l` must be left of `r`
fn is_before(aug: &AugRepo, l: BranchIdx, r: BranchIdx) -> bool {
    let (bl, br) = (&aug.branches[l], &aug.branches[r]);
    if bl.name == br.remote_name {
        // Remote before its local
        return true;
    }
    if let Some(il) = priority_index(&bl.name) {
        if priority_index(&br.name).map_or(true, |ir| il < ir) {
            return true;
        }
    }
    aug.is_ancestor(r, l)
}

/// Stable insertion sort. The ordering is partial, so the result depends on the
/// input order, which is kept deterministic.
fn sort_branches(aug: &AugRepo, branches: &mut [BranchIdx]) {
    for i in 1..branches.len() {
        let mut j = i;
        while j > 0 && is_before(aug, branches[j], branches[j - 1]) {
            branches.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Drop locals shown next to a remote at the same tip, except a current branch with changes
fn remove_same_local_as_remotes(aug: &AugRepo, branches: Vec<BranchIdx>) -> Vec<BranchIdx> {
    let status_ok = aug.status.ok();
    let current = aug.current_branch();

    branches
        .iter()
        .copied()
        .filter(|&b| {
            let branch = &aug.branches[b];
            let has_same_remote = !branch.remote_name.is_empty()
                && branches.iter().any(|&o| {
                    let other = &aug.branches[o];
                    other.name == branch.remote_name && other.tip_id == branch.tip_id
                });
            !has_same_remote || (!status_ok && current == Some(b))
        })
        .collect()
}

pub(crate) fn to_view_branch(aug: &AugRepo, b: &AugBranch, index: usize) -> ViewBranch {
    ViewBranch {
        name: b.name.clone(),
        display_name: b.display_name.clone(),
        index,
        kind: b.kind,
        tip_id: b.tip_id.clone(),
        bottom_id: b.bottom_id.clone(),
        tip: None,
        bottom: None,
        parent: None,
        parent_name: b.parent.map(|p| aug.branches[p].name.clone()).unwrap_or_default(),
        is_remote: b.is_remote,
        remote_name: b.remote_name.clone(),
        local_name: b.local_name.clone(),
        is_current: b.is_current,
        is_set_as_parent: b.is_set_as_parent,
        has_local_only: false,
        has_remote_only: false,
        color: Color::Reset,
        ambiguous_branch_names: b.ambiguous_branches.iter().map(|&a| aug.branches[a].name.clone()).collect(),
        ambiguous_tip_id: b.ambiguous_tip_id.clone(),
    }
}

pub(crate) fn to_view_commit(c: &AugCommit, index: usize, branch: usize) -> ViewCommit {
    ViewCommit {
        id: c.id.clone(),
        sid: c.sid.clone(),
        subject: c.subject.clone(),
        message: c.message.clone(),
        author: c.author.clone(),
        author_time: c.author_time,
        parent_ids: c.parent_ids.clone(),
        child_ids: c.child_ids.clone(),
        index,
        branch,
        first_parent: None,
        merge_parent: None,
        branch_tip_names: c.branch_tip_names.clone(),
        tags: Vec::new(),
        more: More::empty(),
        is_current: c.is_current,
        is_ambiguous: c.is_ambiguous,
        is_ambiguous_tip: c.is_ambiguous_tip,
        is_local_only: false,
        is_remote_only: false,
    }
}

/// Subject of the virtual commit for working tree changes
pub fn status_text(aug: &AugRepo) -> String {
    let status = &aug.status;
    let mut text = format!("{} uncommitted changes", status.all_changes());
    if status.is_merging && !status.merge_message.is_empty() {
        text = format!("{}, {}", status.merge_message, text);
    }
    if status.conflicted > 0 {
        text = format!("CONFLICTS: {}, {}", status.conflicted, text);
    }
    text
}

/// Uncommitted changes show as the first row, on the current branch if it is shown
fn add_virtual_status_commit(repo: &mut ViewRepo, aug: &AugRepo, view_index: &HashMap<BranchIdx, usize>) {
    let Some(current) = aug.current_branch() else {
        return;
    };
    let Some(&branch) = view_index.get(&current) else {
        return;
    };

    let text = status_text(aug);
    let row = repo.commits.len();
    repo.push_commit(ViewCommit {
        id: UNCOMMITTED_ID.to_string(),
        sid: UNCOMMITTED_SID.to_string(),
        subject: text.clone(),
        message: text,
        author: String::new(),
        author_time: Local::now(),
        parent_ids: vec![aug.branches[current].tip_id.clone()],
        child_ids: Vec::new(),
        index: row,
        branch,
        first_parent: None,
        merge_parent: None,
        branch_tip_names: Vec::new(),
        tags: Vec::new(),
        more: More::empty(),
        is_current: false,
        is_ambiguous: false,
        is_ambiguous_tip: false,
        is_local_only: false,
        is_remote_only: false,
    });
}

pub(crate) fn add_tags(repo: &mut ViewRepo, aug: &AugRepo) {
    for tag in &aug.tags {
        if let Some(row) = repo.commit_row(&tag.commit_id) {
            repo.commits[row].tags.push(tag.tag_name.clone());
        }
    }
}

/// The status commit becomes the tip of the current branch, child of the current commit
fn adjust_current_branch_if_status(repo: &mut ViewRepo) {
    if repo.commits.len() < 2 || !repo.commits[0].is_uncommitted() {
        return;
    }
    let Some(current) = repo.commits.iter().position(|c| c.is_current) else {
        return;
    };

    repo.commits[current].child_ids.insert(0, UNCOMMITTED_ID.to_string());
    let branch = repo.commits[0].branch;
    repo.branches[branch].tip_id = UNCOMMITTED_ID.to_string();
    if repo.commits[current].branch != branch {
        // First local change on a branch without own commits
        repo.branches[branch].bottom_id = UNCOMMITTED_ID.to_string();
    }
}

fn set_branch_rows(repo: &mut ViewRepo) {
    for i in 0..repo.branches.len() {
        repo.branches[i].tip = repo.commit_row(&repo.branches[i].tip_id);
        repo.branches[i].bottom = repo.commit_row(&repo.branches[i].bottom_id);
    }
}

/// Link parents among shown commits and flag hidden neighbors
fn set_parent_child_relations(repo: &mut ViewRepo) {
    for i in 0..repo.commits.len() {
        let c = &repo.commits[i];
        let first_parent = c.parent_ids.first().and_then(|id| repo.commit_row(id));
        let merge_parent = c.parent_ids.get(1).and_then(|id| repo.commit_row(id));

        let mut more = More::empty();
        if c.parent_ids.len() > 1 && merge_parent.is_none() {
            more |= More::MERGE_IN;
        }
        if c.child_ids.iter().any(|id| repo.commit_row(id).is_none()) {
            more |= More::BRANCH_OUT;
        }
        if more.is_empty() && c.branch_tip_names.iter().any(|name| !repo.contains_branch(name)) {
            // Some hidden branch has its tip here
            more |= More::BRANCH_OUT;
        }

        let c = &mut repo.commits[i];
        c.first_parent = first_parent;
        c.merge_parent = merge_parent;
        c.more = more;
    }
}
