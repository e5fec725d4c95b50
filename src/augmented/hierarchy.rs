//! Parent branch of every branch

use super::{AugRepo, BranchesChildren};

/// A branch's parent is the branch owning the commit below its bottom. A branch
/// that owns no commits (a pointer into another branch) has that branch as parent.
pub fn determine_branch_hierarchy(repo: &mut AugRepo, branches_children: &BranchesChildren) {
    for b in 0..repo.branches.len() {
        let is_set_as_parent = branches_children
            .get(repo.branches[b].base_name())
            .is_some_and(|children| !children.is_empty());

        let branch = &mut repo.branches[b];
        branch.is_set_as_parent = is_set_as_parent;
        if branch.bottom_id.is_empty() {
            branch.bottom_id = branch.tip_id.clone();
        }

        let Some(bottom) = repo.commit_index(&repo.branches[b].bottom_id) else {
            continue;
        };
        let bottom = &repo.commits[bottom];
        let parent = if bottom.branch != b {
            Some(bottom.branch)
        } else {
            bottom.first_parent.map(|p| repo.commits[p].branch)
        };
        repo.branches[b].parent = parent.filter(|&p| p != b);
    }
}
