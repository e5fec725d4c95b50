//! Tests reading a real repository through libgit2

use std::fs;
use std::path::Path;

use git2::Repository;
use ketto::augmented::{self, BranchesChildren};
use ketto::git::{DiffMode, Git2Source, GitSource, RawStatus, UNCOMMITTED_ID};
use ketto::view::{project, ProjectOptions};

fn init_repo(dir: &Path) -> Git2Source {
    let repo = Repository::init(dir).unwrap();
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Tester").unwrap();
    config.set_str("user.email", "tester@example.com").unwrap();
    Git2Source::discover(dir).unwrap()
}

fn head_name(dir: &Path) -> String {
    let repo = Repository::open(dir).unwrap();
    let head = repo.head().unwrap();
    head.shorthand().unwrap().to_string()
}

/// first <- main work <- merge, first <- topic work, with topic deleted after the merge
fn merged_history(dir: &Path) -> (Git2Source, String) {
    let git = init_repo(dir);
    fs::write(dir.join("a.txt"), "a\n").unwrap();
    git.commit("first").unwrap();
    let main = head_name(dir);

    git.create_branch("topic").unwrap();
    fs::write(dir.join("b.txt"), "b\n").unwrap();
    git.commit("topic work").unwrap();

    git.checkout(&main).unwrap();
    fs::write(dir.join("c.txt"), "c\n").unwrap();
    git.commit("main work").unwrap();

    git.merge_branch("topic").unwrap();
    git.commit(&format!("Merge branch 'topic' into {}", main)).unwrap();
    git.delete_local_branch("topic").unwrap();
    (git, main)
}

#[test]
fn test_read_repo() {
    let dir = tempfile::tempdir().unwrap();
    let (git, main) = merged_history(dir.path());

    let raw = git.get_repo(100).unwrap();
    assert_eq!(raw.commits.len(), 4);
    assert_eq!(raw.commits[0].subject, format!("Merge branch 'topic' into {}", main));
    assert_eq!(raw.commits[0].parent_ids.len(), 2);
    assert_eq!(raw.branches.len(), 1);
    assert_eq!(raw.branches[0].name, main);
    assert!(raw.branches[0].is_current);
    assert_eq!(raw.status, RawStatus::default());

    // Children come before their parents
    for (i, commit) in raw.commits.iter().enumerate() {
        for parent in &commit.parent_ids {
            let parent_row = raw.commits.iter().position(|c| &c.id == parent).unwrap();
            assert!(parent_row > i);
        }
    }
}

#[test]
fn test_deleted_branch_is_recovered() {
    let dir = tempfile::tempdir().unwrap();
    let (git, main) = merged_history(dir.path());

    let raw = git.get_repo(100).unwrap();
    let topic_id = raw.commits.iter().find(|c| c.subject == "topic work").unwrap().id.clone();
    let aug = augmented::build(raw, &BranchesChildren::new(), git.repo_path()).unwrap();

    let topic = aug.commit_by_id(&topic_id).unwrap();
    assert_eq!(aug.branches[topic.branch].display_name, "topic");

    let view = project(&aug, &[main.clone(), "topic".to_string()], &ProjectOptions::default());
    assert_eq!(view.branches.len(), 2);
    assert_eq!(view.branches[0].name, main);
    assert_eq!(view.commits.len(), 4);
    assert_eq!(view.graph.len(), 4);
}

#[test]
fn test_detached_head_commits_are_read() {
    let dir = tempfile::tempdir().unwrap();
    let (git, _) = merged_history(dir.path());

    let repo = Repository::open(dir.path()).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap().id();
    repo.set_head_detached(head).unwrap();
    fs::write(dir.path().join("d.txt"), "d\n").unwrap();
    git.commit("detached work").unwrap();

    // Only HEAD reaches the new commit
    let raw = git.get_repo(100).unwrap();
    assert_eq!(raw.commits.len(), 5);
    assert_eq!(raw.commits[0].subject, "detached work");
    assert_eq!(raw.commits[0].parent_ids, vec![head.to_string()]);
}

#[test]
fn test_truncated_log() {
    let dir = tempfile::tempdir().unwrap();
    let (git, _) = merged_history(dir.path());

    let raw = git.get_repo(2).unwrap();
    assert_eq!(raw.commits.len(), 2);
    let aug = augmented::build(raw, &BranchesChildren::new(), git.repo_path()).unwrap();
    // The partial log commit stands in for the rest
    assert_eq!(aug.commits.len(), 3);
}

#[test]
fn test_status_and_diff() {
    let dir = tempfile::tempdir().unwrap();
    let (git, _) = merged_history(dir.path());

    fs::write(dir.path().join("new.txt"), "new\n").unwrap();
    fs::write(dir.path().join("a.txt"), "changed\n").unwrap();
    let status = git.get_status().unwrap();
    assert_eq!(status.added, 1);
    assert_eq!(status.modified, 1);
    assert!(!status.is_merging);

    let raw = git.get_repo(100).unwrap();
    let topic_id = raw.commits.iter().find(|c| c.subject == "topic work").unwrap().id.clone();
    let diff = git.get_commit_diff(&topic_id).unwrap();
    assert_eq!(diff.file_diffs.len(), 1);
    assert_eq!(diff.file_diffs[0].path_after, "b.txt");
    assert_eq!(diff.file_diffs[0].mode, DiffMode::Added);

    let diff = git.get_commit_diff(UNCOMMITTED_ID).unwrap();
    let mut paths: Vec<&str> = diff.file_diffs.iter().map(|f| f.path_after.as_str()).collect();
    paths.sort();
    assert_eq!(paths, vec!["a.txt", "new.txt"]);
}

#[test]
fn test_discover_from_subdirectory() {
    let dir = tempfile::tempdir().unwrap();
    init_repo(dir.path());
    let sub = dir.path().join("src");
    fs::create_dir(&sub).unwrap();

    let git = Git2Source::discover(&sub).unwrap();
    assert!(git.repo_path().join(".git").exists());

    // An empty repository has no commits yet
    let raw = git.get_repo(100).unwrap();
    assert!(raw.commits.is_empty());
}

