//! Tests for branch inference and the branch hierarchy

mod common;

use common::*;
use ketto::augmented::{BranchKind, BranchesChildren};
use ketto::git::PARTIAL_LOG_COMMIT_ID;

#[test]
fn test_pull_merge_swaps_parents() {
    // A <- L, A <- R, M = pull of main with parents [L, R]
    let aug = build(raw(
        vec![
            merge("M", &["L", "R"], 4, "Merge branch 'main' of github.com:x/y into main"),
            commit("R", &["A"], 3),
            commit("L", &["A"], 2),
            commit("A", &[], 1),
        ],
        vec![current("main", "M")],
    ));

    let m = aug.commit_by_id(&id("M")).unwrap();
    assert_eq!(m.parent_ids, vec![id("R"), id("L")]);
    assert_eq!(m.first_parent, aug.commit_index(&id("R")));
    assert_eq!(m.merge_parent, aug.commit_index(&id("L")));
    assert_eq!(branch_of(&aug, "R"), "main");
    assert_eq!(branch_of(&aug, "A"), "main");
}

#[test]
fn test_pull_merge_local_side_joins_branch_off_first_parent_line() {
    let aug = build(pull_merge_repo());

    // L is hinted "main" by the pull subject and merged into main
    assert_eq!(branch_of(&aug, "L"), "main");

    let main = aug.branch_index("main").unwrap();
    let mut line = Vec::new();
    let mut current = aug.commit_index(&id("M"));
    while let Some(c) = current {
        assert_eq!(aug.commits[c].branch, main);
        line.push(aug.commits[c].id.clone());
        current = aug.commits[c].first_parent;
    }
    assert_eq!(line, vec![id("M"), id("R"), id("A")]);
    assert_eq!(aug.branches[main].bottom_id, id("A"));
}

#[test]
fn test_merge_subject_resolves_fork() {
    // feat-a (N) and feat-c (K) both grow out of Q, which the subject of M names feat-a
    let aug = build(raw(
        vec![
            commit("K", &["Q"], 7),
            commit("N", &["Q"], 6),
            merge("M", &["P", "Q"], 5, "Merge branch 'feat-a' into feat-b"),
            commit("P", &["A"], 4),
            commit("Q", &["Q0"], 3),
            commit("Q0", &["A"], 2),
            commit("A", &[], 1),
        ],
        vec![branch("feat-a", "N"), branch("feat-b", "M"), branch("feat-c", "K")],
    ));

    assert_eq!(branch_of(&aug, "K"), "feat-c");
    assert_eq!(branch_of(&aug, "N"), "feat-a");
    assert_eq!(branch_of(&aug, "Q"), "feat-a");
    assert!(aug.commit_by_id(&id("Q")).unwrap().is_likely);
    assert!(aug.commit_by_id(&id("N")).unwrap().is_likely);
    assert!(!aug.commit_by_id(&id("Q")).unwrap().is_ambiguous);

    // The single child below a likely commit follows it
    assert_eq!(branch_of(&aug, "Q0"), "feat-a");
    assert_eq!(aug.branch_by_name("feat-c").unwrap().parent, aug.branch_index("feat-a"));
}

#[test]
fn test_ambiguous_fork_collapses_into_latest_child() {
    let aug = build(fork_repo());

    assert!(aug.branches.iter().all(|b| b.kind != BranchKind::Ambiguous));
    assert_eq!(branch_of(&aug, "C2"), "feat-b");
    assert_eq!(branch_of(&aug, "C1"), "feat-a");
    assert_eq!(branch_of(&aug, "C"), "feat-b");
    assert_eq!(branch_of(&aug, "A"), "feat-b");

    let c = aug.commit_by_id(&id("C")).unwrap();
    assert!(c.is_ambiguous);
    assert!(c.is_ambiguous_tip);
    let a = aug.commit_by_id(&id("A")).unwrap();
    assert!(a.is_ambiguous);
    assert!(!a.is_ambiguous_tip);

    let feat_b = aug.branch_by_name("feat-b").unwrap();
    assert_eq!(feat_b.ambiguous_tip_id, id("C"));
    assert_eq!(feat_b.bottom_id, id("A"));
    let mut fork_names: Vec<&str> = feat_b
        .ambiguous_branches
        .iter()
        .map(|&b| aug.branches[b].name.as_str())
        .collect();
    fork_names.sort();
    assert_eq!(fork_names, vec!["feat-a", "feat-b"]);

    // feat-a forks out of the commits now owned by feat-b
    assert_eq!(aug.branch_by_name("feat-a").unwrap().parent, aug.branch_index("feat-b"));
    assert_eq!(feat_b.parent, None);
}

#[test]
fn test_user_set_parent_resolves_fork() {
    let mut branches_children = BranchesChildren::new();
    branches_children.insert("feat-a".to_string(), vec!["feat-b".to_string()]);
    let aug = build_with(fork_repo(), &branches_children);

    assert_eq!(branch_of(&aug, "C"), "feat-a");
    assert_eq!(branch_of(&aug, "A"), "feat-a");
    assert!(!aug.commit_by_id(&id("C")).unwrap().is_ambiguous);

    let feat_a = aug.branch_by_name("feat-a").unwrap();
    assert!(feat_a.is_set_as_parent);
    assert_eq!(aug.branch_by_name("feat-b").unwrap().parent, aug.branch_index("feat-a"));
}

#[test]
fn test_merged_branch_named_from_subject() {
    let aug = build(merged_topic_repo());

    let topic = aug.branch_by_name("feature/x:CCCCCC").unwrap();
    assert_eq!(topic.kind, BranchKind::Named);
    assert_eq!(topic.display_name, "feature/x");
    assert_eq!(topic.tip_id, id("C"));
    assert_eq!(topic.parent, aug.branch_index("main"));

    // The shared base goes to the backbone branch
    assert_eq!(branch_of(&aug, "B"), "main");
    assert_eq!(branch_of(&aug, "A"), "main");
    assert_eq!(branch_of(&aug, "F"), "dev");
    assert_eq!(aug.branch_by_name("dev").unwrap().parent, aug.branch_index("main"));
    assert_eq!(aug.branch_by_name("main").unwrap().parent, None);
}

#[test]
fn test_unnamed_merged_branch_gets_id_name() {
    let aug = build(raw(
        vec![
            merge("M", &["B", "C"], 4, "Integrate work"),
            commit("C", &["A"], 3),
            commit("B", &["A"], 2),
            commit("A", &[], 1),
        ],
        vec![current("main", "M")],
    ));

    let branch = aug.branch_by_name("branch:CCCCCC").unwrap();
    assert_eq!(branch.display_name, "branch@CCCCCC");
    assert!(branch.is_named_branch());
    assert_eq!(branch_of(&aug, "C"), "branch:CCCCCC");
}

#[test]
fn test_truncated_log_ends_in_partial_commit() {
    // A is beyond the log
    let aug = build(raw(
        vec![commit("C", &["B"], 3), commit("B", &["A"], 2)],
        vec![current("main", "C")],
    ));

    assert_eq!(aug.commits.len(), 3);
    let b = aug.commit_by_id(&id("B")).unwrap();
    assert_eq!(b.parent_ids, vec![PARTIAL_LOG_COMMIT_ID.to_string()]);

    let partial = aug.commit_by_id(PARTIAL_LOG_COMMIT_ID).unwrap();
    assert_eq!(aug.branches[partial.branch].name, "main");
    assert_eq!(aug.branch_by_name("main").unwrap().bottom_id, PARTIAL_LOG_COMMIT_ID);
}

#[test]
fn test_branch_outside_log_is_dropped() {
    let aug = build(raw(
        vec![commit("B", &["A"], 2), commit("A", &[], 1)],
        vec![current("main", "B"), branch("gone", "Z")],
    ));

    assert!(aug.branch_by_name("gone").is_none());
    assert_eq!(aug.branches.len(), 1);
}

#[test]
fn test_remote_owns_shared_commits() {
    // foo is one commit ahead of origin/foo
    let aug = build(raw(
        vec![commit("F2", &["R1"], 3), commit("R1", &["A"], 2), commit("A", &[], 1)],
        vec![
            branch("main", "A"),
            remote("origin/foo", "R1"),
            tracking(current("foo", "F2"), "origin/foo"),
        ],
    ));

    assert_eq!(branch_of(&aug, "F2"), "foo");
    assert_eq!(branch_of(&aug, "R1"), "origin/foo");
    assert_eq!(branch_of(&aug, "A"), "main");

    let origin_foo = aug.branch_by_name("origin/foo").unwrap();
    assert_eq!(origin_foo.local_name, "foo");
    assert_eq!(origin_foo.parent, aug.branch_index("main"));
    assert_eq!(aug.branch_by_name("foo").unwrap().parent, aug.branch_index("origin/foo"));

    let foo = aug.branch_index("foo").unwrap();
    assert_eq!(
        aug.ancestors(foo),
        vec![aug.branch_index("origin/foo").unwrap(), aug.branch_index("main").unwrap()]
    );
}

#[test]
fn test_every_commit_has_a_branch() {
    for raw in [merged_topic_repo(), fork_repo()] {
        let count = raw.commits.len();
        let aug = build(raw);
        assert_eq!(aug.commits.len(), count);
        for commit in &aug.commits {
            assert!(commit.branch < aug.branches.len());
            assert!(commit.child_ids.iter().all(|c| aug.commit_by_id(c).is_some()));
        }
    }
}
