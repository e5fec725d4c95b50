//! Branch inference: decide the single branch each commit belongs to
//!
//! A commit has 0, 1 or 2 parents. The first parent continues the branch, the
//! second one is merged in. Branch tips of live git branches seed candidate
//! branches, which are inherited down the first parent chain. Where git no longer
//! knows a branch (deleted after merge), the name is recovered from merge subjects
//! or synthesized. Commits that could belong to several branches get an ambiguous
//! placeholder branch, collapsed into the likeliest child branch afterwards.

use tracing::debug;

use super::{AugBranch, BranchIdx, BranchKind, BranchesChildren, CommitIdx, RepoBuilder};
use crate::error::{RepoError, Result};
use crate::git::{is_main_branch, DEFAULT_BRANCH_PRIORITY};

impl RepoBuilder {
    fn branch_of(&self, commit: CommitIdx) -> Option<BranchIdx> {
        self.assigned[commit]
    }

    fn base_name(&self, branch: BranchIdx) -> &str {
        self.branches[branch].base_name()
    }

    /// Link children and parents and inherit candidate branches down first parents.
    /// Pull merges get their parents swapped so the remote side comes first.
    pub(crate) fn set_commit_branches_and_children(&mut self) {
        for c in 0..self.commits.len() {
            let commit = &self.commits[c];
            if commit.parent_ids.len() == 2 {
                let (id, subject, parents) = (commit.id.clone(), commit.subject.clone(), commit.parent_ids.clone());
                if self.names.is_pull_merge(&id, &subject, &parents) {
                    self.commits[c].parent_ids.swap(0, 1);
                }
            }

            let parent_ids = self.commits[c].parent_ids.clone();
            let id = self.commits[c].id.clone();

            if let Some(&first) = parent_ids.first().and_then(|p| self.index.get(p)) {
                self.commits[c].first_parent = Some(first);
                self.commits[first].children.push(c);
                self.commits[first].child_ids.push(id.clone());
                let inherited = self.commits[c].branches.clone();
                self.add_branches(first, &inherited);
            }

            if let Some(&merge) = parent_ids.get(1).and_then(|p| self.index.get(p)) {
                self.commits[c].merge_parent = Some(merge);
                self.commits[merge].merge_children.push(c);
                self.commits[merge].child_ids.push(id);
            }
        }
    }

    /// Assign a branch to every commit, newest first
    pub(crate) fn determine_commit_branches(&mut self, branches_children: &BranchesChildren) {
        for c in 0..self.commits.len() {
            let branch = self.determine_commit_branch(c, branches_children);
            self.assigned[c] = Some(branch);
            self.add_branch(c, branch);

            self.set_backbone(c, branch);
            self.branches[branch].bottom_id = self.commits[c].id.clone();
        }
    }

    fn determine_commit_branch(&mut self, c: CommitIdx, branches_children: &BranchesChildren) -> BranchIdx {
        if let Some(b) = self.has_only_one_branch(c) {
            // Must have been a branch tip originally
            return b;
        }
        if let Some(b) = self.is_local_remote_branch(c) {
            return b;
        }
        if let Some(b) = self.has_parent_child_set_branch(c, branches_children) {
            return b;
        }
        if let Some(b) = self.has_children_priority_branch(c, branches_children) {
            return b;
        }
        if let Some(b) = self.is_same_children_branches(c) {
            return b;
        }
        if let Some(b) = self.is_merged_deleted_remote_branch_tip(c) {
            return b;
        }
        if let Some(b) = self.is_merged_deleted_branch_tip(c) {
            return b;
        }
        if let Some(b) = self.has_one_child(c) {
            // Middle commit of a branch
            return b;
        }
        if let Some(b) = self.has_one_child_with_likely_branch(c) {
            return b;
        }
        if let Some(b) = self.has_priority_branch(c) {
            return b;
        }
        if let Some(b) = self.has_branch_name_in_subject(c) {
            return b;
        }
        if let Some(b) = self.has_only_one_child(c) {
            return b;
        }
        if let Some(b) = self.is_child_ambiguous_branch(c) {
            return b;
        }

        self.add_ambiguous_branch(c)
    }

    fn has_only_one_branch(&self, c: CommitIdx) -> Option<BranchIdx> {
        match self.commits[c].branches.as_slice() {
            [b] => Some(*b),
            _ => None,
        }
    }

    /// A local and its remote, prefer the remote
    fn is_local_remote_branch(&self, c: CommitIdx) -> Option<BranchIdx> {
        let [a, b] = self.commits[c].branches.as_slice() else {
            return None;
        };
        let (ba, bb) = (&self.branches[*a], &self.branches[*b]);
        if ba.is_remote && ba.name == bb.remote_name {
            return Some(*a);
        }
        if !ba.is_remote && ba.remote_name == bb.name {
            return Some(*b);
        }
        None
    }

    /// One candidate is set as parent of all other candidates
    fn has_parent_child_set_branch(&self, c: CommitIdx, branches_children: &BranchesChildren) -> Option<BranchIdx> {
        let candidates = &self.commits[c].branches;
        candidates.iter().copied().find(|&b| {
            let Some(children) = branches_children.get(self.base_name(b)) else {
                return false;
            };
            if children.is_empty() {
                return false;
            }
            candidates.iter().all(|&bb| {
                b == bb
                    || self.branches[b].name == self.branches[bb].remote_name
                    || children.iter().any(|n| n == self.base_name(bb))
            })
        })
    }

    /// The branch of one child is set as parent of all other children's branches
    fn has_children_priority_branch(&self, c: CommitIdx, branches_children: &BranchesChildren) -> Option<BranchIdx> {
        let children = &self.commits[c].children;
        if children.len() < 2 {
            return None;
        }

        children.iter().find_map(|&child| {
            let branch = self.branch_of(child)?;
            let child_branches = branches_children.get(self.base_name(branch))?;
            if child_branches.is_empty() {
                return None;
            }
            let is_parent = children.iter().all(|&cc| {
                cc == child
                    || self
                        .branch_of(cc)
                        .is_some_and(|ccb| child_branches.iter().any(|n| n == self.base_name(ccb)))
            });
            is_parent.then_some(branch)
        })
    }

    fn is_same_children_branches(&self, c: CommitIdx) -> Option<BranchIdx> {
        let commit = &self.commits[c];
        match commit.children.as_slice() {
            [c1, c2] if commit.branches.is_empty() && self.branch_of(*c1) == self.branch_of(*c2) => {
                self.branch_of(*c1)
            }
            _ => None,
        }
    }

    /// No branch and no children, but merged into some branch
    fn is_merged_deleted_remote_branch_tip(&mut self, c: CommitIdx) -> Option<BranchIdx> {
        let commit = &self.commits[c];
        if !commit.branches.is_empty() || !commit.children.is_empty() || commit.merge_children.len() != 1 {
            return None;
        }

        let merge_child = commit.merge_children[0];
        let name = self.names.branch_name(&commit.id).to_string();
        if name.is_empty() {
            return Some(self.add_id_named_branch(c));
        }
        if let Some(b) = self.branch_of(merge_child) {
            if self.branches[b].display_name == name {
                return Some(b);
            }
        }
        Some(self.add_named_branch(c, &name))
    }

    /// Tip of a deleted branch, or of some unusual branch
    fn is_merged_deleted_branch_tip(&mut self, c: CommitIdx) -> Option<BranchIdx> {
        let commit = &self.commits[c];
        if !commit.branches.is_empty() || !commit.children.is_empty() {
            return None;
        }

        let name = self.names.branch_name(&commit.id).to_string();
        if name.is_empty() {
            return Some(self.add_id_named_branch(c));
        }
        Some(self.add_named_branch(c, &name))
    }

    fn has_one_child(&self, c: CommitIdx) -> Option<BranchIdx> {
        let commit = &self.commits[c];
        match commit.children.as_slice() {
            [child] if commit.branches.is_empty() => self.branch_of(*child),
            _ => None,
        }
    }

    fn has_one_child_with_likely_branch(&self, c: CommitIdx) -> Option<BranchIdx> {
        match self.commits[c].children.as_slice() {
            [child] if self.commits[*child].is_likely => self.branch_of(*child),
            _ => None,
        }
    }

    fn has_priority_branch(&self, c: CommitIdx) -> Option<BranchIdx> {
        let candidates = &self.commits[c].branches;
        DEFAULT_BRANCH_PRIORITY.iter().find_map(|&name| {
            candidates
                .iter()
                .copied()
                .find(|&b| self.branches[b].name == name)
        })
    }

    /// A branch name hinted by a merge subject. Commits above this one that sit on
    /// an ambiguous branch are moved to the named branch as well.
    fn has_branch_name_in_subject(&mut self, c: CommitIdx) -> Option<BranchIdx> {
        let name = self.names.branch_name(&self.commits[c].id).to_string();
        if name.is_empty() {
            return None;
        }
        let branch = self.try_get_branch_from_name(c, &name)?;

        let start = match self.index.get(&self.branches[branch].bottom_id) {
            Some(&bottom) => bottom,
            None => {
                let mut current = c;
                while let [child] = self.commits[current].children.as_slice() {
                    let on_ambiguous = self
                        .branch_of(*child)
                        .is_some_and(|b| self.branches[b].kind == BranchKind::Ambiguous);
                    if !on_ambiguous {
                        break;
                    }
                    current = *child;
                }
                current
            }
        };

        // Walk down to this commit. A start that does not lead here only claims this commit.
        let stop = self.commits[c].first_parent;
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(cc) = current {
            if Some(cc) == stop {
                break;
            }
            path.push(cc);
            current = self.commits[cc].first_parent;
        }
        if !path.contains(&c) {
            path = vec![c];
        }

        for cc in path {
            self.assigned[cc] = Some(branch);
            self.add_branch(cc, branch);
            self.commits[cc].is_likely = true;
        }
        Some(branch)
    }

    fn has_only_one_child(&self, c: CommitIdx) -> Option<BranchIdx> {
        let commit = &self.commits[c];
        let [child] = commit.children.as_slice() else {
            return None;
        };
        if !commit.merge_children.is_empty() {
            return None;
        }
        let child_branches = &self.commits[*child].branches;
        let same = commit.branches.len() == child_branches.len()
            && commit
                .branches
                .iter()
                .zip(child_branches)
                .all(|(&a, &b)| self.branches[a].name == self.branches[b].name);
        if same {
            self.branch_of(*child)
        } else {
            None
        }
    }

    fn is_child_ambiguous_branch(&self, c: CommitIdx) -> Option<BranchIdx> {
        self.commits[c]
            .children
            .iter()
            .filter_map(|&child| self.branch_of(child))
            .find(|&b| self.branches[b].kind == BranchKind::Ambiguous)
    }

    /// Candidate matching `name`, preferring the remote of a local branch
    fn try_get_branch_from_name(&self, c: CommitIdx, name: &str) -> Option<BranchIdx> {
        let candidates = &self.commits[c].branches;
        if let Some(&b) = candidates.iter().find(|&&b| self.branches[b].name == name) {
            let remote_name = &self.branches[b].remote_name;
            if !remote_name.is_empty() {
                if let Some(&remote) = candidates.iter().find(|&&r| &self.branches[r].name == remote_name) {
                    return Some(remote);
                }
            }
            return Some(b);
        }
        candidates
            .iter()
            .copied()
            .find(|&b| self.branches[b].display_name == name)
    }

    /// A backbone branch is inherited by the first parent
    fn set_backbone(&mut self, c: CommitIdx, branch: BranchIdx) {
        let Some(first_parent) = self.commits[c].first_parent else {
            return;
        };
        if is_main_branch(&self.branches[branch].name) {
            self.add_branch(first_parent, branch);
        }
    }

    fn add_ambiguous_branch(&mut self, c: CommitIdx) -> BranchIdx {
        let mut branch = AugBranch::ambiguous(&self.commits[c].id);
        branch.ambiguous_branches = self.commits[c]
            .children
            .iter()
            .filter_map(|&child| self.branch_of(child))
            .collect();
        debug!("Ambiguous branch {} at {}", branch.name, self.commits[c].sid);
        self.push_branch(branch)
    }

    fn add_named_branch(&mut self, c: CommitIdx, name: &str) -> BranchIdx {
        let branch = AugBranch::named(&self.commits[c].id, name);
        self.push_branch(branch)
    }

    fn add_id_named_branch(&mut self, c: CommitIdx) -> BranchIdx {
        let branch = AugBranch::id_named(&self.commits[c].id);
        self.push_branch(branch)
    }

    /// Move the commits of every ambiguous branch to the branch of the latest child
    /// at the fork point, then drop the ambiguous branch
    pub(crate) fn merge_ambiguous_branches(&mut self) -> Result<()> {
        let ambiguous: Vec<BranchIdx> = (0..self.branches.len())
            .filter(|&b| self.branches[b].kind == BranchKind::Ambiguous)
            .collect();

        for b in ambiguous {
            self.merge_ambiguous_branch(b)?;
            self.removed.insert(b);
        }
        Ok(())
    }

    fn merge_ambiguous_branch(&mut self, b: BranchIdx) -> Result<()> {
        let tip = self.commit_of(&self.branches[b].tip_id, b)?;
        let bottom = self.commit_of(&self.branches[b].bottom_id, b)?;

        // The commit this branch forked from, none when it reaches the root
        let other = self.commits[bottom].first_parent;

        let mut ambiguous_tip = None;
        let mut current = Some(tip);
        while let Some(c) = current {
            if Some(c) == other {
                break;
            }
            if self.branch_of(c) == Some(b) {
                ambiguous_tip = Some(c);
                break;
            }
            current = self.commits[c].first_parent;
        }
        let Some(ambiguous_tip) = ambiguous_tip else {
            return Ok(());
        };

        let winner = self.likeliest_branch(ambiguous_tip, b)?;
        let child_branches: Vec<BranchIdx> = self.commits[ambiguous_tip]
            .children
            .iter()
            .filter_map(|&child| self.branch_of(child))
            .collect();

        let tip_id = self.commits[ambiguous_tip].id.clone();
        self.commits[ambiguous_tip].is_ambiguous_tip = true;
        self.commits[ambiguous_tip].is_ambiguous = true;
        self.assigned[ambiguous_tip] = Some(winner);
        let winner_branch = &mut self.branches[winner];
        winner_branch.ambiguous_tip_id = tip_id.clone();
        winner_branch.ambiguous_branches = child_branches;
        winner_branch.bottom_id = tip_id;

        let mut current = self.commits[ambiguous_tip].first_parent;
        while let Some(c) = current {
            if Some(c) == other {
                break;
            }
            self.assigned[c] = Some(winner);
            self.branches[winner].bottom_id = self.commits[c].id.clone();
            self.commits[c].is_ambiguous = true;
            current = self.commits[c].first_parent;
        }

        debug!(
            "Merged {} into {}",
            self.branches[b].name, self.branches[winner].name
        );
        Ok(())
    }

    /// Branch of the child with the latest author time, or the first real
    /// candidate when the ambiguous tip has no children
    fn likeliest_branch(&self, c: CommitIdx, ambiguous: BranchIdx) -> Result<BranchIdx> {
        let commit = &self.commits[c];
        let latest = commit
            .children
            .iter()
            .copied()
            .reduce(|latest, child| {
                if self.commits[child].author_time > self.commits[latest].author_time {
                    child
                } else {
                    latest
                }
            })
            .and_then(|child| self.branch_of(child));
        if let Some(b) = latest {
            return Ok(b);
        }

        commit
            .branches
            .iter()
            .copied()
            .find(|&cb| cb != ambiguous && self.branches[cb].kind != BranchKind::Ambiguous)
            .ok_or_else(|| {
                RepoError::RepoInconsistent(format!("no branch for ambiguous commit {}", commit.sid))
            })
    }

    fn commit_of(&self, id: &str, branch: BranchIdx) -> Result<CommitIdx> {
        self.index.get(id).copied().ok_or_else(|| {
            RepoError::RepoInconsistent(format!(
                "branch {} refers to unknown commit '{}'",
                self.branches[branch].name, id
            ))
        })
    }
}
