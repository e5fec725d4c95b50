//! Repository service: rebuilds the repo in the background and publishes views

pub mod cancel;
pub mod monitor;
pub mod publisher;

use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{select, unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::augmented::{self, AugRepo};
use crate::config::{ConfigStore, RepoConfig};
use crate::error::{RepoError, Result};
use crate::git::{is_main_branch, CommitDiff, GitSource, RawStatus};
use crate::search::search_view;
use crate::view::{project, ProjectOptions, ViewRepo};

pub use cancel::CancelToken;
pub use monitor::{classify_path, ChangeKind, Debouncer};
pub use publisher::Publisher;

/// Published to the viewer
#[derive(Debug, Clone)]
pub enum RepoChange {
    /// A refresh has started, a new view follows
    IsStarting,
    Ok(Arc<ViewRepo>),
    /// Building failed, the previous view stays valid
    Error { reason: String },
    Search { view_repo: Arc<ViewRepo>, search_text: String },
}

enum Message {
    Changed(ChangeKind),
    Refresh { fetch: bool },
    Built(Result<AugRepo>),
    StatusRead(Result<RawStatus>),
}

#[derive(Default)]
struct State {
    aug: Option<Arc<AugRepo>>,
    view: Option<Arc<ViewRepo>>,
    /// Names requested for the next projection
    shown: Vec<String>,
    is_building: bool,
}

struct Inner<S> {
    git: S,
    config: Mutex<ConfigStore>,
    state: RwLock<State>,
    publisher: Publisher<RepoChange>,
    messages: Sender<Message>,
    inbox: Receiver<Message>,
    cancel: CancelToken,
}

pub struct RepoService<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for RepoService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: GitSource + 'static> RepoService<S> {
    pub fn new(git: S, config: ConfigStore) -> Self {
        let shown = config.repo(git.repo_path()).shown_branches;
        let (messages, inbox) = unbounded();
        Self {
            inner: Arc::new(Inner {
                git,
                config: Mutex::new(config),
                state: RwLock::new(State {
                    shown,
                    ..Default::default()
                }),
                publisher: Publisher::new(),
                messages,
                inbox,
                cancel: CancelToken::new(),
            }),
        }
    }

    pub fn repo_path(&self) -> &Path {
        self.inner.git.repo_path()
    }

    pub fn subscribe(&self) -> Receiver<RepoChange> {
        self.inner.publisher.subscribe()
    }

    /// Start the monitor and fetch workers and load the repo
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        let mut workers = Vec::new();
        let inner = Arc::clone(&self.inner);
        workers.push(thread::spawn(move || inner.monitor_routine()));

        if self.inner.config.lock().settings().fetch_interval_secs > 0 {
            let inner = Arc::clone(&self.inner);
            workers.push(thread::spawn(move || inner.fetch_routine()));
        }
        self.inner.send(Message::Refresh { fetch: false });
        workers
    }

    /// Stop the workers. Subscribers see the channel close.
    pub fn close(&self) {
        self.inner.cancel.cancel();
        self.inner.publisher.close();
    }

    /// Rebuild now and fetch afterwards
    pub fn trigger_refresh(&self) {
        self.inner.send(Message::Refresh { fetch: true });
    }

    /// Report a file change, batched before refreshing
    pub fn notify_change(&self, kind: ChangeKind) {
        self.inner.send(Message::Changed(kind));
    }

    /// Report a changed file path, ignored unless it affects the repo or status
    pub fn notify_path(&self, path: &Path) {
        if let Some(kind) = classify_path(self.repo_path(), path) {
            self.notify_change(kind);
        }
    }

    /// Build and project synchronously without publishing
    pub fn load(&self) -> Result<Arc<ViewRepo>> {
        let aug = Arc::new(self.inner.build_aug()?);
        let names = self.inner.state.read().shown.clone();
        Ok(self.inner.set_view(aug, &names))
    }

    pub fn view_repo(&self) -> Option<Arc<ViewRepo>> {
        self.inner.state.read().view.clone()
    }

    pub fn aug_repo(&self) -> Option<Arc<AugRepo>> {
        self.inner.state.read().aug.clone()
    }

    fn require_aug(&self, name: &str) -> Result<Arc<AugRepo>> {
        self.aug_repo().ok_or_else(|| RepoError::BranchNotFound(name.to_string()))
    }

    /// Project `names` (plus ancestors), remember them and publish the view
    pub fn show_branches(&self, names: Vec<String>) {
        let aug = {
            let mut state = self.inner.state.write();
            if state.is_building || state.aug.is_none() {
                // The pending build projects these
                state.shown = names;
                return;
            }
            state.aug.clone()
        };
        let Some(aug) = aug else {
            return;
        };
        let view = self.inner.set_view(aug, &names);
        self.inner.persist_shown();
        self.inner.publisher.publish(RepoChange::Ok(view));
    }

    pub fn show_branch(&self, name: &str) -> Result<()> {
        let aug = self.require_aug(name)?;
        let branch = aug
            .branch_by_name(name)
            .ok_or_else(|| RepoError::BranchNotFound(name.to_string()))?;

        let mut names = self.inner.state.read().shown.clone();
        names.push(branch.name.clone());
        if branch.is_ambiguous_branch() {
            names.extend(branch.ambiguous_branches.iter().map(|&b| aug.branches[b].name.clone()));
        }
        self.show_branches(names);
        Ok(())
    }

    /// Hide a branch with every shown branch based on it. A local branch with
    /// its remote shown hides the remote.
    pub fn hide_branch(&self, name: &str) -> Result<()> {
        let aug = self.require_aug(name)?;
        let Some(view) = self.view_repo() else {
            return Err(RepoError::BranchNotFound(name.to_string()));
        };
        let mut hide = aug
            .branch_index(name)
            .ok_or_else(|| RepoError::BranchNotFound(name.to_string()))?;

        let remote_name = &aug.branches[hide].remote_name;
        if !remote_name.is_empty() && view.contains_branch(remote_name) {
            if let Some(remote) = aug.branch_index(remote_name) {
                hide = remote;
            }
        }
        let hide_name = &aug.branches[hide].name;

        let names = view
            .branches
            .iter()
            .filter(|vb| match aug.branch_index(&vb.name) {
                Some(b) => b != hide && !aug.is_ancestor(b, hide) && &aug.branches[b].remote_name != hide_name,
                None => true,
            })
            .map(|vb| vb.name.clone())
            .collect();
        self.show_branches(names);
        Ok(())
    }

    /// Hidden branches that merge into or branch out of a commit
    pub fn hidden_branches_at(&self, commit_id: &str) -> Vec<String> {
        let (Some(aug), Some(view)) = (self.aug_repo(), self.view_repo()) else {
            return Vec::new();
        };
        let Some(c) = aug.commit_index(commit_id) else {
            return Vec::new();
        };
        let commit = &aug.commits[c];

        let mut branches = Vec::new();
        if let Some(merge_parent) = commit.merge_parent {
            branches.push(aug.commits[merge_parent].branch);
        }
        for &child in commit.children.iter().chain(&commit.merge_children) {
            if aug.commits[child].branch != commit.branch {
                branches.push(aug.commits[child].branch);
            }
        }
        // Branches pointing here without commits of their own
        for (b, branch) in aug.branches.iter().enumerate() {
            if branch.tip_id == commit.id && branch.bottom_id == commit.id && branch.parent == Some(commit.branch) {
                branches.push(b);
            }
        }

        let mut names: Vec<String> = Vec::new();
        for b in branches {
            let name = &aug.branches[b].name;
            if !view.contains_branch(name) && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    /// Publish the commits matching `text`, an empty text restores the view
    pub fn search(&self, text: &str) {
        if text.is_empty() {
            if let Some(view) = self.view_repo() {
                self.inner.publisher.publish(RepoChange::Ok(view));
            }
            return;
        }
        let Some(aug) = self.aug_repo() else {
            return;
        };
        let view_repo = Arc::new(search_view(&aug, text));
        self.inner.publisher.publish(RepoChange::Search {
            view_repo,
            search_text: text.to_string(),
        });
    }

    pub fn commit_diff(&self, id: &str) -> Result<CommitDiff> {
        self.inner.git.get_commit_diff(id)
    }

    pub fn checkout(&self, name: &str) -> Result<()> {
        self.run(|git| git.checkout(name))
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(|git| git.commit(message))
    }

    pub fn push_branch(&self, name: &str) -> Result<()> {
        self.run(|git| git.push_branch(name))
    }

    pub fn pull_current_branch(&self) -> Result<()> {
        self.run(|git| git.pull_current_branch())
    }

    pub fn pull_branch(&self, name: &str) -> Result<()> {
        self.run(|git| git.pull_branch(name))
    }

    pub fn merge_branch(&self, name: &str) -> Result<()> {
        self.run(|git| git.merge_branch(name))
    }

    pub fn create_branch(&self, name: &str) -> Result<()> {
        self.run(|git| git.create_branch(name))
    }

    /// Delete a git branch with its remote counterpart
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let aug = self.require_aug(name)?;
        let branch = aug
            .branch_by_name(name)
            .ok_or_else(|| RepoError::BranchNotFound(name.to_string()))?;
        if !branch.is_git_branch() {
            return Err(RepoError::NotGitBranch(name.to_string()));
        }
        if is_main_branch(name) {
            return Err(RepoError::ProtectedBranch(name.to_string()));
        }

        let existing = |n: &str| aug.branch_by_name(n).map(|b| b.name.clone());
        let (local, remote) = if branch.is_remote {
            (existing(&branch.local_name), Some(branch.name.clone()))
        } else {
            (Some(branch.name.clone()), existing(&branch.remote_name))
        };

        if let Some(remote) = remote {
            info!("Deleting remote branch {}", remote);
            self.inner.git.delete_remote_branch(&remote)?;
        }
        if let Some(local) = local {
            info!("Deleting local branch {}", local);
            self.inner.git.delete_local_branch(&local)?;
        }
        self.inner.send(Message::Refresh { fetch: false });
        Ok(())
    }

    /// Make `name` the parent of the other branches at its ambiguous fork
    pub fn set_as_parent_branch(&self, name: &str) -> Result<()> {
        let aug = self.require_aug(name)?;
        let b = aug
            .branch_index(name)
            .ok_or_else(|| RepoError::BranchNotFound(name.to_string()))?;
        let branch = &aug.branches[b];

        let fork = if branch.ambiguous_branches.contains(&b) {
            b
        } else {
            branch
                .parent
                .filter(|&p| aug.branches[p].ambiguous_branches.contains(&b))
                .ok_or_else(|| RepoError::NotAmbiguous(name.to_string()))?
        };

        let parent = branch.base_name().to_string();
        let mut children: Vec<String> = Vec::new();
        for &other in &aug.branches[fork].ambiguous_branches {
            let child = aug.branches[other].base_name().to_string();
            if child != parent && !children.contains(&child) {
                children.push(child);
            }
        }

        info!("Setting {} as parent of {:?}", parent, children);
        self.inner.update_repo_config(|config| {
            for child in &children {
                if let Some(grandchildren) = config.branches_children.get_mut(child) {
                    grandchildren.retain(|c| c != &parent);
                }
            }
            config.branches_children.retain(|_, c| !c.is_empty());
            let entry = config.branches_children.entry(parent.clone()).or_default();
            for child in children {
                if !entry.contains(&child) {
                    entry.push(child);
                }
            }
        })?;
        self.inner.send(Message::Refresh { fetch: false });
        Ok(())
    }

    pub fn unset_as_parent_branch(&self, name: &str) -> Result<()> {
        let aug = self.require_aug(name)?;
        let branch = aug
            .branch_by_name(name)
            .ok_or_else(|| RepoError::BranchNotFound(name.to_string()))?;
        let parent = branch.base_name().to_string();

        self.inner.update_repo_config(|config| {
            config.branches_children.remove(&parent);
        })?;
        self.inner.send(Message::Refresh { fetch: false });
        Ok(())
    }

    /// Run an imperative and rebuild when it changed something
    fn run(&self, f: impl FnOnce(&S) -> Result<()>) -> Result<()> {
        let result = f(&self.inner.git);
        match &result {
            // Conflicts leave a changed working tree behind
            Ok(()) | Err(RepoError::MergeConflicts) => self.inner.send(Message::Refresh { fetch: false }),
            Err(_) => {}
        }
        result
    }
}

impl<S: GitSource + 'static> Inner<S> {
    fn send(&self, message: Message) {
        if self.messages.send(message).is_err() {
            debug!("Service closed");
        }
    }

    fn build_aug(&self) -> Result<AugRepo> {
        let (max_commits, branches_children) = {
            let config = self.config.lock();
            (config.settings().max_commits, config.repo(self.git.repo_path()).branches_children)
        };
        let raw = self.git.get_repo(max_commits)?;
        augmented::build(raw, &branches_children, self.git.repo_path())
    }

    /// Project and store as the current view
    fn set_view(&self, aug: Arc<AugRepo>, names: &[String]) -> Arc<ViewRepo> {
        let options = {
            let config = self.config.lock();
            ProjectOptions {
                elide_synced_locals: config.settings().elide_synced_locals,
                branch_colors: config.repo(self.git.repo_path()).branch_colors(),
            }
        };

        let view = Arc::new(project(&aug, names, &options));
        let mut state = self.state.write();
        state.shown = view.branch_names();
        state.aug = Some(aug);
        state.view = Some(Arc::clone(&view));
        view
    }

    fn persist_shown(&self) {
        let shown = self.state.read().shown.clone();
        if let Err(e) = self.update_repo_config(|config| config.shown_branches = shown) {
            warn!("Failed to save shown branches: {}", e);
        }
    }

    fn update_repo_config(&self, update: impl FnOnce(&mut RepoConfig)) -> Result<()> {
        self.config
            .lock()
            .update_repo(self.git.repo_path(), update)
            .map_err(|e| RepoError::Config(format!("{:#}", e)))
    }

    fn monitor_routine(self: Arc<Self>) {
        info!("Monitoring {:?}", self.git.repo_path());
        let mut debouncer = Debouncer::new(self.config.lock().settings().batch_interval());

        loop {
            let timeout = debouncer.timeout(Instant::now());
            select! {
                recv(self.cancel.receiver()) -> _ => break,
                recv(self.inbox) -> message => match message {
                    Ok(message) => self.handle(message, &mut debouncer),
                    Err(_) => break,
                },
                default(timeout) => {}
            }

            match debouncer.take_due(Instant::now()) {
                Some(ChangeKind::Status) if !self.state.read().is_building => self.spawn_status(),
                Some(ChangeKind::Status) => debug!("Status change covered by running build"),
                Some(ChangeKind::Repo) => self.spawn_build(false),
                None => {}
            }
        }

        self.publisher.close();
        info!("Closed monitor of {:?}", self.git.repo_path());
    }

    fn handle(self: &Arc<Self>, message: Message, debouncer: &mut Debouncer) {
        match message {
            Message::Changed(kind) => {
                if kind == ChangeKind::Status && self.state.read().aug.is_none() {
                    debug!("No repo yet for status change");
                    return;
                }
                if debouncer.add(kind, Instant::now()) {
                    debug!("Got {:?} change, waiting for more", kind);
                    self.publisher.publish(RepoChange::IsStarting);
                }
            }
            Message::Refresh { fetch } => {
                if debouncer.is_pending() {
                    debug!("Refresh covers pending changes");
                }
                debouncer.clear();
                self.spawn_build(fetch);
            }
            Message::Built(Ok(aug)) => {
                let names = {
                    let mut state = self.state.write();
                    state.is_building = false;
                    state.shown.clone()
                };
                let view = self.set_view(Arc::new(aug), &names);
                self.publisher.publish(RepoChange::Ok(view));
            }
            Message::Built(Err(e)) => {
                self.state.write().is_building = false;
                warn!("Failed to build repo: {}", e);
                self.publisher.publish(RepoChange::Error { reason: e.to_string() });
            }
            Message::StatusRead(Ok(status)) => {
                let (aug, names) = {
                    let state = self.state.read();
                    if state.is_building {
                        // The build reads the status as well
                        return;
                    }
                    (state.aug.clone(), state.shown.clone())
                };
                let Some(aug) = aug else {
                    return;
                };
                let view = self.set_view(Arc::new(aug.with_status(status.into())), &names);
                self.publisher.publish(RepoChange::Ok(view));
            }
            Message::StatusRead(Err(e)) => {
                warn!("Failed to read status: {}", e);
                self.publisher.publish(RepoChange::Error { reason: e.to_string() });
            }
        }
    }

    fn spawn_build(self: &Arc<Self>, fetch: bool) {
        self.state.write().is_building = true;
        self.publisher.publish(RepoChange::IsStarting);

        let inner = Arc::clone(self);
        thread::spawn(move || {
            let started = Instant::now();
            let result = inner.build_aug();
            debug!("Built repo in {:?}", started.elapsed());
            inner.send(Message::Built(result));
            if fetch && !inner.cancel.is_cancelled() {
                inner.fetch();
            }
        });
    }

    fn spawn_status(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        thread::spawn(move || {
            let status = inner.git.get_status();
            inner.send(Message::StatusRead(status));
        });
    }

    fn fetch_routine(self: Arc<Self>) {
        let interval = self.config.lock().settings().fetch_interval();
        loop {
            select! {
                recv(self.cancel.receiver()) -> _ => break,
                default(interval) => self.fetch(),
            }
        }
    }

    fn fetch(&self) {
        let started = Instant::now();
        match self.git.fetch() {
            Ok(()) => {
                debug!("Fetched in {:?}", started.elapsed());
                self.send(Message::Changed(ChangeKind::Repo));
            }
            Err(e) => warn!("Failed to fetch: {}", e),
        }
    }
}
