//! Local git operations (checkout, branch, merge, commit)

use git2::{build::CheckoutBuilder, BranchType, IndexAddOption, MergeOptions, Oid, Repository};
use tracing::info;

use super::strip_remote_prefix;
use crate::error::{RepoError, Result};

/// Checkout a local branch
pub fn checkout_branch(repo: &Repository, branch_name: &str) -> Result<()> {
    let branch = repo
        .find_branch(branch_name, BranchType::Local)
        .map_err(|_| RepoError::BranchNotFound(branch_name.to_string()))?;

    let reference = branch.get();
    let commit = reference.peel_to_commit()?;
    let tree = commit.tree()?;

    repo.checkout_tree(tree.as_object(), Some(CheckoutBuilder::new().safe()))?;
    repo.set_head(&format!("refs/heads/{}", branch_name))?;

    info!("Checked out {}", branch_name);
    Ok(())
}

/// Checkout a remote branch, creating or resetting a tracking local branch
pub fn checkout_remote_branch(repo: &Repository, remote_branch: &str) -> Result<()> {
    let local_name = strip_remote_prefix(remote_branch);
    if local_name == remote_branch {
        return Err(RepoError::BranchNotFound(remote_branch.to_string()));
    }

    let remote_ref = repo
        .find_branch(remote_branch, BranchType::Remote)
        .map_err(|_| RepoError::BranchNotFound(remote_branch.to_string()))?;
    let remote_commit = remote_ref.get().peel_to_commit()?;

    if let Ok(local_branch) = repo.find_branch(local_name, BranchType::Local) {
        let local_oid = local_branch.get().peel_to_commit()?.id();
        if local_oid != remote_commit.id() {
            // Same as: git checkout -B local_name origin/xxx
            drop(local_branch);
            repo.branch(local_name, &remote_commit, true)?;
        }
        return checkout_branch(repo, local_name);
    }

    let mut local_branch = repo.branch(local_name, &remote_commit, false)?;
    local_branch.set_upstream(Some(remote_branch))?;

    checkout_branch(repo, local_name)
}

/// Create a new local branch at `from_oid`
pub fn create_branch(repo: &Repository, branch_name: &str, from_oid: Oid) -> Result<()> {
    let commit = repo.find_commit(from_oid)?;
    repo.branch(branch_name, &commit, false)?;
    info!("Created branch {} at {}", branch_name, from_oid);
    Ok(())
}

/// Delete a local branch
pub fn delete_branch(repo: &Repository, branch_name: &str) -> Result<()> {
    let mut branch = repo
        .find_branch(branch_name, BranchType::Local)
        .map_err(|_| RepoError::BranchNotFound(branch_name.to_string()))?;

    if branch.is_head() {
        return Err(RepoError::GitUnavailable(format!(
            "Cannot delete checked out branch '{}'",
            branch_name
        )));
    }

    branch.delete()?;
    info!("Deleted local branch {}", branch_name);
    Ok(())
}

/// Merge a branch into the current one without committing.
///
/// The merge is always recorded as a merge (no fast-forward). The result is left
/// in the index for `commit_all`, with a MERGE_MSG naming the merged branch.
pub fn merge_branch(repo: &Repository, branch_name: &str) -> Result<()> {
    let reference = match repo.find_branch(branch_name, BranchType::Local) {
        Ok(branch) => branch.into_reference(),
        Err(_) => repo
            .find_branch(branch_name, BranchType::Remote)
            .map_err(|_| RepoError::BranchNotFound(branch_name.to_string()))?
            .into_reference(),
    };
    let annotated_commit = repo.reference_to_annotated_commit(&reference)?;

    let (analysis, _) = repo.merge_analysis(&[&annotated_commit])?;
    if analysis.is_up_to_date() {
        return Ok(());
    }

    repo.merge(
        &[&annotated_commit],
        Some(&mut MergeOptions::new()),
        Some(CheckoutBuilder::new().allow_conflicts(true).conflict_style_merge(true)),
    )?;

    let head_name = repo
        .head()?
        .shorthand()
        .map(|s| s.to_string())
        .unwrap_or_default();
    let message = format!("Merge branch '{}' into {}\n", strip_remote_prefix(branch_name), head_name);
    std::fs::write(repo.path().join("MERGE_MSG"), message)
        .map_err(|e| RepoError::GitUnavailable(e.to_string()))?;

    if repo.index()?.has_conflicts() {
        info!("Merge of {} has conflicts", branch_name);
        return Err(RepoError::MergeConflicts);
    }

    info!("Merged {} (not committed)", branch_name);
    Ok(())
}

/// Stage every change and commit it. Completes an ongoing merge.
pub fn commit_all(repo: &Repository, message: &str) -> Result<()> {
    let mut index = repo.index()?;
    if index.has_conflicts() {
        return Err(RepoError::MergeConflicts);
    }
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.update_all(["*"], None)?;
    index.write()?;

    let tree = repo.find_tree(index.write_tree()?)?;
    let signature = repo.signature()?;

    let mut parents = Vec::new();
    if let Ok(head) = repo.head() {
        parents.push(head.peel_to_commit()?);
    }
    // MERGE_HEAD lists the commits being merged in
    let merge_heads = std::fs::read_to_string(repo.path().join("MERGE_HEAD")).unwrap_or_default();
    for line in merge_heads.lines().filter(|l| !l.trim().is_empty()) {
        let oid = Oid::from_str(line.trim())?;
        parents.push(repo.find_commit(oid)?);
    }
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

    let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parent_refs)?;
    repo.cleanup_state()?;

    info!("Committed {}", oid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn init_repo(dir: &Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        let mut config = repo.config().unwrap();
        config.set_str("user.name", "Tester").unwrap();
        config.set_str("user.email", "tester@example.com").unwrap();
        repo
    }

    #[test]
    fn test_commit_create_and_delete_branch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());

        std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        commit_all(&repo, "first").unwrap();

        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.summary(), Some("first"));

        create_branch(&repo, "topic", head.id()).unwrap();
        checkout_branch(&repo, "topic").unwrap();
        assert_eq!(repo.head().unwrap().shorthand(), Some("topic"));

        // The checked out branch cannot be deleted
        assert!(delete_branch(&repo, "topic").is_err());

        let default = repo
            .branches(Some(BranchType::Local))
            .unwrap()
            .filter_map(|b| b.ok())
            .map(|(b, _)| b.name().unwrap().unwrap().to_string())
            .find(|n| n != "topic")
            .unwrap();
        checkout_branch(&repo, &default).unwrap();
        delete_branch(&repo, "topic").unwrap();
        assert!(repo.find_branch("topic", BranchType::Local).is_err());
    }

    #[test]
    fn test_merge_then_commit_has_two_parents() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());

        std::fs::write(dir.path().join("a.txt"), "a\n").unwrap();
        commit_all(&repo, "first").unwrap();
        let main_name = repo.head().unwrap().shorthand().unwrap().to_string();
        let base = repo.head().unwrap().peel_to_commit().unwrap().id();

        create_branch(&repo, "topic", base).unwrap();
        checkout_branch(&repo, "topic").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b\n").unwrap();
        commit_all(&repo, "topic work").unwrap();

        checkout_branch(&repo, &main_name).unwrap();
        merge_branch(&repo, "topic").unwrap();
        assert_eq!(repo.state(), git2::RepositoryState::Merge);

        commit_all(&repo, "Merge branch 'topic'").unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(head.parent_count(), 2);
        assert_eq!(repo.state(), git2::RepositoryState::Clean);
    }

    #[test]
    fn test_unknown_branch() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        assert_eq!(
            checkout_branch(&repo, "nope"),
            Err(RepoError::BranchNotFound("nope".to_string()))
        );
    }
}
