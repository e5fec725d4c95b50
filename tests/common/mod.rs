//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use std::path::Path;

use chrono::{DateTime, Duration, Local, TimeZone};
use ketto::augmented::{self, AugRepo, BranchesChildren};
use ketto::git::{RawBranch, RawCommit, RawRepo, RawStatus, RawTag};
use ketto::graph::row_text;
use ketto::view::ViewRepo;

pub const REPO_PATH: &str = "/tmp/ketto-fixture";

/// Readable fake commit id, e.g. "C1" becomes "C1C1C1..." (40 chars)
pub fn id(label: &str) -> String {
    label.repeat(40).chars().take(40).collect()
}

pub fn time(minute: i64) -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
}

pub fn commit(label: &str, parents: &[&str], minute: i64) -> RawCommit {
    merge(label, parents, minute, &format!("Commit {}", label))
}

pub fn merge(label: &str, parents: &[&str], minute: i64, subject: &str) -> RawCommit {
    RawCommit {
        id: id(label),
        parent_ids: parents.iter().map(|p| id(p)).collect(),
        subject: subject.to_string(),
        message: subject.to_string(),
        author: "tester".to_string(),
        author_time: time(minute),
    }
}

pub fn branch(name: &str, tip: &str) -> RawBranch {
    RawBranch {
        name: name.to_string(),
        display_name: name.to_string(),
        tip_id: id(tip),
        ..Default::default()
    }
}

pub fn current(name: &str, tip: &str) -> RawBranch {
    RawBranch {
        is_current: true,
        ..branch(name, tip)
    }
}

pub fn remote(name: &str, tip: &str) -> RawBranch {
    RawBranch {
        display_name: ketto::git::strip_remote_prefix(name).to_string(),
        is_remote: true,
        ..branch(name, tip)
    }
}

pub fn tracking(local: RawBranch, remote_name: &str) -> RawBranch {
    RawBranch {
        remote_name: remote_name.to_string(),
        ..local
    }
}

pub fn raw(commits: Vec<RawCommit>, branches: Vec<RawBranch>) -> RawRepo {
    RawRepo {
        commits,
        branches,
        status: RawStatus::default(),
        tags: Vec::<RawTag>::new(),
    }
}

pub fn build(raw: RawRepo) -> AugRepo {
    build_with(raw, &BranchesChildren::new())
}

pub fn build_with(raw: RawRepo, branches_children: &BranchesChildren) -> AugRepo {
    augmented::build(raw, branches_children, Path::new(REPO_PATH)).unwrap()
}

pub fn names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Name of the branch a commit was assigned to
pub fn branch_of(aug: &AugRepo, label: &str) -> String {
    let commit = aug.commit_by_id(&id(label)).unwrap();
    aug.branches[commit.branch].name.clone()
}

pub fn rows(view: &ViewRepo) -> Vec<String> {
    view.graph.iter().map(|row| row_text(row)).collect()
}

pub fn print_graph(title: &str, view: &ViewRepo) {
    println!("\n{}:", title);
    let names: Vec<&str> = view.branches.iter().map(|b| b.name.as_str()).collect();
    println!("  columns {:?}", names);
    for commit in &view.commits {
        println!("  {} {} {}", row_text(view.graph_row(commit.index)), commit.sid, commit.subject);
    }
}

/// main A-B-D-E with feature/x (C) merged at D, deleted since, and dev (F-G) out of B
pub fn merged_topic_repo() -> RawRepo {
    raw(
        vec![
            commit("G", &["F"], 7),
            commit("E", &["D"], 6),
            commit("F", &["B"], 5),
            merge("D", &["B", "C"], 4, "Merge branch 'feature/x' into main"),
            commit("C", &["A"], 3),
            commit("B", &["A"], 2),
            commit("A", &[], 1),
        ],
        vec![current("main", "E"), branch("dev", "G")],
    )
}

/// A-C forking into feat-a (C1) and feat-b (C2, the newer one)
pub fn fork_repo() -> RawRepo {
    raw(
        vec![
            commit("C2", &["C"], 4),
            commit("C1", &["C"], 3),
            commit("C", &["A"], 2),
            commit("A", &[], 1),
        ],
        vec![branch("feat-a", "C1"), branch("feat-b", "C2")],
    )
}

/// A-L and A-R pulled together at M, git's parent order [L, R]
pub fn pull_merge_repo() -> RawRepo {
    raw(
        vec![
            merge("M", &["L", "R"], 4, "Merge branch 'main' of github.com:x/y into main"),
            commit("R", &["A"], 3),
            commit("L", &["A"], 2),
            commit("A", &[], 1),
        ],
        vec![current("main", "M")],
    )
}

/// main A-B-E, feat (F1) out of B, dev (D1) out of A merging B back in at D2
pub fn merge_from_left_repo() -> RawRepo {
    raw(
        vec![
            commit("E", &["B"], 6),
            merge("D2", &["D1", "B"], 5, "Merge branch 'main' into dev"),
            commit("D1", &["A"], 4),
            commit("F1", &["B"], 3),
            commit("B", &["A"], 2),
            commit("A", &[], 1),
        ],
        vec![current("main", "E"), branch("feat", "F1"), branch("dev", "D2")],
    )
}
