//! Tests for the repository service against an in-memory git source

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::*;
use crossbeam_channel::Receiver;
use ketto::config::{Config, ConfigStore, Settings};
use ketto::error::{RepoError, Result};
use ketto::git::{CommitDiff, GitSource, RawRepo, RawStatus, UNCOMMITTED_ID};
use ketto::service::{ChangeKind, RepoChange, RepoService};
use ketto::view::ViewRepo;
use parking_lot::Mutex;

struct FakeGit {
    path: PathBuf,
    repo: Arc<Mutex<RawRepo>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeGit {
    fn new(repo: RawRepo) -> (Self, Arc<Mutex<RawRepo>>, Arc<Mutex<Vec<String>>>) {
        let repo = Arc::new(Mutex::new(repo));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let git = Self {
            path: PathBuf::from(REPO_PATH),
            repo: Arc::clone(&repo),
            calls: Arc::clone(&calls),
        };
        (git, repo, calls)
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().push(call);
        Ok(())
    }
}

impl GitSource for FakeGit {
    fn repo_path(&self) -> &Path {
        &self.path
    }

    fn get_repo(&self, _max_commits: usize) -> Result<RawRepo> {
        Ok(self.repo.lock().clone())
    }

    fn get_status(&self) -> Result<RawStatus> {
        Ok(self.repo.lock().status.clone())
    }

    fn get_commit_diff(&self, _id: &str) -> Result<CommitDiff> {
        Ok(CommitDiff::default())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        self.record(format!("checkout {}", name))
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.record(format!("commit {}", message))
    }

    fn push_branch(&self, name: &str) -> Result<()> {
        self.record(format!("push {}", name))
    }

    fn pull_current_branch(&self) -> Result<()> {
        self.record("pull".to_string())
    }

    fn pull_branch(&self, name: &str) -> Result<()> {
        self.record(format!("pull {}", name))
    }

    fn merge_branch(&self, _name: &str) -> Result<()> {
        Err(RepoError::MergeConflicts)
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        self.record(format!("create {}", name))
    }

    fn delete_local_branch(&self, name: &str) -> Result<()> {
        self.record(format!("delete local {}", name))
    }

    fn delete_remote_branch(&self, name: &str) -> Result<()> {
        self.record(format!("delete remote {}", name))
    }

    fn fetch(&self) -> Result<()> {
        self.record("fetch".to_string())
    }
}

fn service(repo: RawRepo) -> (RepoService<FakeGit>, Arc<Mutex<RawRepo>>, Arc<Mutex<Vec<String>>>) {
    let (git, repo, calls) = FakeGit::new(repo);
    (RepoService::new(git, ConfigStore::in_memory()), repo, calls)
}

fn quick_config() -> ConfigStore {
    ConfigStore::with_config(Config {
        settings: Settings {
            fetch_interval_secs: 0,
            batch_interval_millis: 10,
            ..Default::default()
        },
        ..Default::default()
    })
}

/// Next published view, skipping progress notices
fn next_view(changes: &Receiver<RepoChange>) -> Arc<ViewRepo> {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let timeout = deadline.saturating_duration_since(Instant::now());
        match changes.recv_timeout(timeout) {
            Ok(RepoChange::Ok(view)) => return view,
            Ok(RepoChange::IsStarting) => continue,
            Ok(other) => panic!("unexpected change {:?}", other),
            Err(e) => panic!("no view published: {}", e),
        }
    }
}

#[test]
fn test_load_projects_current_branch() {
    let (service, _, _) = service(merged_topic_repo());
    assert!(service.view_repo().is_none());

    let view = service.load().unwrap();
    assert_eq!(view.branch_names(), names(&["main"]));
    assert_eq!(view.current_branch_name, "main");
    assert_eq!(service.view_repo().as_deref(), Some(view.as_ref()));
    assert!(service.aug_repo().is_some());
}

#[test]
fn test_show_and_hide_branch() {
    let (service, _, _) = service(merged_topic_repo());
    service.load().unwrap();

    service.show_branch("dev").unwrap();
    let view = service.view_repo().unwrap();
    assert_eq!(view.branch_names(), names(&["main", "dev"]));

    service.hide_branch("dev").unwrap();
    let view = service.view_repo().unwrap();
    assert_eq!(view.branch_names(), names(&["main"]));

    assert_eq!(
        service.show_branch("nope"),
        Err(RepoError::BranchNotFound("nope".to_string()))
    );
}

#[test]
fn test_hide_synthesized_branch() {
    let (service, _, _) = service(merged_topic_repo());
    service.load().unwrap();
    service.show_branches(names(&["main", "dev", "feature/x"]));
    assert_eq!(service.view_repo().unwrap().branches.len(), 3);

    service.hide_branch("feature/x:CCCCCC").unwrap();
    assert_eq!(service.view_repo().unwrap().branch_names(), names(&["main", "dev"]));
}

#[test]
fn test_hidden_branches_at_commit() {
    let (service, _, _) = service(merged_topic_repo());
    service.load().unwrap();

    assert_eq!(service.hidden_branches_at(&id("D")), names(&["feature/x:CCCCCC"]));
    assert_eq!(service.hidden_branches_at(&id("B")), names(&["dev"]));
    assert!(service.hidden_branches_at(&id("E")).is_empty());
    assert!(service.hidden_branches_at("unknown").is_empty());
}

#[test]
fn test_delete_checks() {
    let (service, _, calls) = service(merged_topic_repo());
    service.load().unwrap();

    assert_eq!(
        service.delete_branch("main"),
        Err(RepoError::ProtectedBranch("main".to_string()))
    );
    assert_eq!(
        service.delete_branch("feature/x:CCCCCC"),
        Err(RepoError::NotGitBranch("feature/x:CCCCCC".to_string()))
    );
    assert!(calls.lock().is_empty());

    service.delete_branch("dev").unwrap();
    assert_eq!(*calls.lock(), vec!["delete local dev".to_string()]);
}

#[test]
fn test_delete_removes_remote_as_well() {
    let (service, _, calls) = service(raw(
        vec![commit("F2", &["R1"], 3), commit("R1", &["A"], 2), commit("A", &[], 1)],
        vec![
            current("main", "A"),
            remote("origin/foo", "R1"),
            tracking(branch("foo", "F2"), "origin/foo"),
        ],
    ));
    service.load().unwrap();

    service.delete_branch("foo").unwrap();
    assert_eq!(
        *calls.lock(),
        vec!["delete remote origin/foo".to_string(), "delete local foo".to_string()]
    );
}

#[test]
fn test_set_and_unset_parent_branch() {
    let (service, _, _) = service(fork_repo());
    service.load().unwrap();
    let aug = service.aug_repo().unwrap();
    assert_eq!(branch_of(&aug, "C"), "feat-b");

    service.set_as_parent_branch("feat-a").unwrap();
    service.load().unwrap();
    let aug = service.aug_repo().unwrap();
    assert_eq!(branch_of(&aug, "C"), "feat-a");
    assert!(aug.branch_by_name("feat-a").unwrap().is_set_as_parent);

    service.unset_as_parent_branch("feat-a").unwrap();
    service.load().unwrap();
    let aug = service.aug_repo().unwrap();
    assert_eq!(branch_of(&aug, "C"), "feat-b");
}

#[test]
fn test_set_parent_needs_ambiguous_fork() {
    let (service, _, _) = service(merged_topic_repo());
    service.load().unwrap();
    assert_eq!(
        service.set_as_parent_branch("dev"),
        Err(RepoError::NotAmbiguous("dev".to_string()))
    );
}

#[test]
fn test_imperatives_reach_git() {
    let (service, _, calls) = service(merged_topic_repo());
    service.checkout("dev").unwrap();
    service.create_branch("topic").unwrap();
    service.push_branch("topic").unwrap();
    assert_eq!(service.merge_branch("dev"), Err(RepoError::MergeConflicts));

    assert_eq!(
        *calls.lock(),
        vec!["checkout dev".to_string(), "create topic".to_string(), "push topic".to_string()]
    );
}

#[test]
fn test_publishes_views() {
    let (git, repo, _) = FakeGit::new(merged_topic_repo());
    let service = RepoService::new(git, quick_config());
    let changes = service.subscribe();
    let workers = service.start();

    let view = next_view(&changes);
    assert_eq!(view.branch_names(), names(&["main"]));

    // Showing a branch publishes right away
    service.show_branches(names(&["dev"]));
    let view = next_view(&changes);
    assert_eq!(view.branch_names(), names(&["main", "dev"]));

    // A status change adds the uncommitted changes row
    repo.lock().status.modified = 2;
    service.notify_change(ChangeKind::Status);
    let view = next_view(&changes);
    assert_eq!(view.commits[0].id, UNCOMMITTED_ID);
    assert_eq!(view.branch_names(), names(&["main", "dev"]));

    service.search("merge branch");
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match changes.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(RepoChange::Search { view_repo, search_text }) => {
                assert_eq!(search_text, "merge branch");
                assert_eq!(view_repo.commits.len(), 1);
                break;
            }
            Ok(_) => continue,
            Err(e) => panic!("no search published: {}", e),
        }
    }

    service.close();
    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_repo_change_rebuilds() {
    let (git, repo, _) = FakeGit::new(merged_topic_repo());
    let service = RepoService::new(git, quick_config());
    let changes = service.subscribe();
    let workers = service.start();
    assert_eq!(next_view(&changes).commits.len(), 4);

    // A new commit on main
    {
        let mut repo = repo.lock();
        repo.commits.insert(0, commit("H", &["E"], 8));
        repo.branches[0].tip_id = id("H");
    }
    service.notify_path(&Path::new(REPO_PATH).join(".git/refs/heads/main"));
    let view = next_view(&changes);
    assert_eq!(view.commits.len(), 5);
    assert_eq!(view.commits[0].id, id("H"));
    assert_eq!(view.branch_by_name("main").unwrap().tip, Some(0));

    service.close();
    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_refresh_covers_pending_changes() {
    let (git, _, calls) = FakeGit::new(merged_topic_repo());
    let service = RepoService::new(git, quick_config());
    let changes = service.subscribe();
    let workers = service.start();
    next_view(&changes);

    service.notify_change(ChangeKind::Repo);
    service.trigger_refresh();
    assert_eq!(next_view(&changes).commits.len(), 4);

    // The refresh fetches once the build is done
    let deadline = Instant::now() + Duration::from_secs(10);
    while !calls.lock().contains(&"fetch".to_string()) {
        assert!(Instant::now() < deadline, "no fetch after refresh");
        std::thread::sleep(Duration::from_millis(10));
    }

    service.close();
    for worker in workers {
        worker.join().unwrap();
    }
}
