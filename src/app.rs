//! Application state management

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::Result;
use crossbeam_channel::TryRecvError;
use ratatui::widgets::ListState;
use tracing::{debug, info};

use crate::{
    action::Action,
    error::RepoError,
    git::{CommitDiff, Git2Source, GitSource, PARTIAL_LOG_COMMIT_ID, UNCOMMITTED_ID},
    search::{fuzzy_search_branches, FuzzySearchResult},
    service::{RepoChange, RepoService},
    view::{ViewBranch, ViewCommit, ViewRepo},
};

/// Application modes
#[derive(Debug, Clone)]
pub enum AppMode {
    Normal,
    Help,
    Input {
        title: String,
        input: String,
        action: InputAction,
    },
    /// Fuzzy pick of a branch to show
    Pick {
        title: String,
        input: String,
        names: Vec<String>,
        results: Vec<FuzzySearchResult>,
        selected: Option<usize>,
    },
    Confirm {
        message: String,
        action: ConfirmAction,
    },
    Error {
        message: String,
    },
}

/// Input action kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputAction {
    CreateBranch,
    Commit,
    Search,
}

/// Confirmation action kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteBranch(String),
    Merge(String),
    Push(String),
}

/// Result of async diff computation
struct DiffResult {
    id: String,
    diff: Option<CommitDiff>,
}

/// Application state
pub struct App<S = Git2Source> {
    pub mode: AppMode,
    pub service: RepoService<S>,
    changes: crossbeam_channel::Receiver<RepoChange>,
    workers: Vec<JoinHandle<()>>,

    // Data
    pub repo: Arc<ViewRepo>,
    /// Text of the shown search result
    pub search_text: Option<String>,
    pub is_loading: bool,

    // UI state
    pub graph_list_state: ListState,

    // Diff cache (async load)
    diff_cache: Option<CommitDiff>,
    diff_cache_id: Option<String>,
    diff_loading_id: Option<String>,
    diff_receiver: Option<Receiver<DiffResult>>,

    // Flags
    pub should_quit: bool,

    // Status message with auto-clear
    message: Option<String>,
    message_time: Option<Instant>,
}

impl<S: GitSource + 'static> App<S> {
    /// Create the application over a service that has not been started yet
    pub fn new(service: RepoService<S>) -> Self {
        let changes = service.subscribe();
        let mut graph_list_state = ListState::default();
        graph_list_state.select(Some(0));

        Self {
            mode: AppMode::Normal,
            service,
            changes,
            workers: Vec::new(),
            repo: Arc::new(ViewRepo::default()),
            search_text: None,
            is_loading: true,
            graph_list_state,
            diff_cache: None,
            diff_cache_id: None,
            diff_loading_id: None,
            diff_receiver: None,
            should_quit: false,
            message: None,
            message_time: None,
        }
    }

    /// Start monitoring and the first load
    pub fn start(&mut self) {
        self.workers = self.service.start();
    }

    /// Stop the service and wait for its workers
    pub fn shutdown(&mut self) {
        self.service.close();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                debug!("Worker panicked");
            }
        }
    }

    /// Apply every change published since the last tick
    pub fn update_repo(&mut self) {
        loop {
            match self.changes.try_recv() {
                Ok(change) => self.apply_change(change),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.is_loading = false;
                    break;
                }
            }
        }
    }

    pub fn apply_change(&mut self, change: RepoChange) {
        match change {
            RepoChange::IsStarting => self.is_loading = true,
            RepoChange::Ok(view) => {
                self.is_loading = false;
                match self.search_text.clone() {
                    // Search again on the rebuilt repo, the result follows
                    Some(text) => self.service.search(&text),
                    None => self.set_repo(view),
                }
            }
            RepoChange::Search {
                view_repo,
                search_text,
            } => {
                if self.search_text.as_deref() == Some(search_text.as_str()) {
                    self.set_repo(view_repo);
                }
            }
            RepoChange::Error { reason } => {
                self.is_loading = false;
                self.set_message(format!("Failed to read repository: {}", reason));
            }
        }
    }

    /// Replace the shown repo, keeping the selected commit
    fn set_repo(&mut self, repo: Arc<ViewRepo>) {
        let selected_id = self.selected_commit().map(|c| c.id.clone());
        self.repo = repo;

        let row = selected_id
            .and_then(|id| self.repo.commit_row(&id))
            .unwrap_or_else(|| {
                let current = self.graph_list_state.selected().unwrap_or(0);
                current.min(self.repo.commits.len().saturating_sub(1))
            });
        self.graph_list_state.select(Some(row));

        // Working tree changes may differ now
        if self.diff_cache_id.as_deref() == Some(UNCOMMITTED_ID) {
            self.diff_cache = None;
            self.diff_cache_id = None;
        }
    }

    /// Set a status message (will auto-clear after a few seconds)
    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_time = Some(Instant::now());
    }

    /// Get current message if not expired (5 seconds timeout)
    pub fn get_message(&self) -> Option<&str> {
        const MESSAGE_TIMEOUT_SECS: u64 = 5;

        let msg = self.message.as_deref()?;
        let time = self.message_time.as_ref()?;

        if time.elapsed().as_secs() < MESSAGE_TIMEOUT_SECS {
            Some(msg)
        } else {
            None
        }
    }

    /// Update diff info for the selected commit (async)
    pub fn update_diff_cache(&mut self) {
        if let Some(ref receiver) = self.diff_receiver {
            if let Ok(result) = receiver.try_recv() {
                // Ignore results for a commit no longer selected
                if self.diff_loading_id.as_deref() == Some(result.id.as_str()) {
                    self.diff_cache = result.diff;
                    self.diff_cache_id = Some(result.id);
                    self.diff_loading_id = None;
                    self.diff_receiver = None;
                }
            }
        }

        let Some(id) = self.selected_commit().map(|c| c.id.clone()) else {
            return;
        };

        // Do nothing if the cache is valid or already loading
        if self.diff_cache_id.as_ref() == Some(&id) || self.diff_loading_id.as_ref() == Some(&id) {
            return;
        }
        if id == PARTIAL_LOG_COMMIT_ID {
            return;
        }

        // Compute diff in the background
        let (tx, rx) = mpsc::channel();
        let service = self.service.clone();

        self.diff_loading_id = Some(id.clone());
        self.diff_receiver = Some(rx);

        thread::spawn(move || {
            let diff = match service.commit_diff(&id) {
                Ok(diff) => Some(diff),
                Err(e) => {
                    debug!("Failed to diff {}: {}", id, e);
                    None
                }
            };
            let _ = tx.send(DiffResult { id, diff });
        });
    }

    /// Get cached diff info for the currently selected commit
    pub fn cached_diff(&self) -> Option<&CommitDiff> {
        let commit = self.selected_commit()?;
        if self.diff_cache_id.as_deref() == Some(commit.id.as_str()) {
            self.diff_cache.as_ref()
        } else {
            None
        }
    }

    /// Whether diff is currently loading for the selected commit
    pub fn is_diff_loading(&self) -> bool {
        match (self.selected_commit(), &self.diff_loading_id) {
            (Some(commit), Some(id)) => &commit.id == id,
            _ => false,
        }
    }

    pub fn selected_commit(&self) -> Option<&ViewCommit> {
        self.graph_list_state
            .selected()
            .and_then(|row| self.repo.commits.get(row))
    }

    /// Branch owning the selected commit
    pub fn selected_branch(&self) -> Option<&ViewBranch> {
        let commit = self.selected_commit()?;
        self.repo.branches.get(commit.branch)
    }

    /// Handle an action
    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        match &self.mode {
            AppMode::Normal => self.handle_normal_action(action)?,
            AppMode::Help => self.handle_help_action(action),
            AppMode::Input { .. } => self.handle_input_action(action)?,
            AppMode::Pick { .. } => self.handle_pick_action(action)?,
            AppMode::Confirm { .. } => self.handle_confirm_action(action)?,
            AppMode::Error { .. } => self.handle_error_action(action),
        }
        Ok(())
    }

    /// Show an error
    pub fn show_error(&mut self, message: String) {
        self.mode = AppMode::Error { message };
    }

    fn handle_normal_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => {
                if self.search_text.is_some() {
                    self.clear_search();
                } else {
                    self.should_quit = true;
                }
            }
            Action::MoveUp => self.move_selection(-1),
            Action::MoveDown => self.move_selection(1),
            Action::PageUp => self.move_selection(-10),
            Action::PageDown => self.move_selection(10),
            Action::GoToTop => self.select_row(0),
            Action::GoToBottom => self.select_row(self.repo.commits.len().saturating_sub(1)),
            Action::JumpToCurrent => self.jump_to_current(),
            Action::NextBranchTip => self.move_to_branch_tip(true),
            Action::PrevBranchTip => self.move_to_branch_tip(false),
            Action::ToggleHelp => self.mode = AppMode::Help,
            Action::Refresh => {
                self.service.trigger_refresh();
                self.set_message("Refreshing...");
            }
            Action::Fetch => {
                // Fetch runs after the rebuild
                self.service.trigger_refresh();
                self.set_message("Fetching from origin...");
            }
            Action::ShowBranch => self.open_branch_picker(),
            Action::OpenHiddenBranches => self.open_hidden_branches(),
            Action::HideBranch => {
                if let Some(name) = self.selected_branch().map(|b| b.name.clone()) {
                    self.service.hide_branch(&name)?;
                }
            }
            Action::SetAsParent => {
                if let Some(name) = self.selected_branch().map(|b| b.name.clone()) {
                    self.service.set_as_parent_branch(&name)?;
                    self.set_message(format!("'{}' set as parent branch", name));
                }
            }
            Action::UnsetAsParent => {
                if let Some(name) = self.selected_branch().map(|b| b.name.clone()) {
                    self.service.unset_as_parent_branch(&name)?;
                    self.set_message(format!("'{}' no longer set as parent branch", name));
                }
            }
            Action::Checkout => self.do_checkout()?,
            Action::CreateBranch => {
                self.mode = AppMode::Input {
                    title: "New Branch Name".to_string(),
                    input: String::new(),
                    action: InputAction::CreateBranch,
                };
            }
            Action::Commit => {
                if self.repo.uncommitted_changes == 0 {
                    self.set_message("Nothing to commit");
                } else {
                    self.mode = AppMode::Input {
                        title: "Commit Message".to_string(),
                        input: self.repo.merge_message.clone(),
                        action: InputAction::Commit,
                    };
                }
            }
            Action::Search => {
                self.mode = AppMode::Input {
                    title: "Search commits".to_string(),
                    input: self.search_text.clone().unwrap_or_default(),
                    action: InputAction::Search,
                };
            }
            Action::DeleteBranch => {
                if let Some(branch) = self.selected_git_branch()? {
                    self.mode = AppMode::Confirm {
                        message: format!("Delete branch '{}'?", branch.display_name),
                        action: ConfirmAction::DeleteBranch(branch.name.clone()),
                    };
                }
            }
            Action::Merge => {
                if let Some(branch) = self.selected_git_branch()? {
                    if !branch.is_current {
                        self.mode = AppMode::Confirm {
                            message: format!("Merge '{}' into current branch?", branch.name),
                            action: ConfirmAction::Merge(branch.name.clone()),
                        };
                    }
                }
            }
            Action::Push => {
                if let Some(branch) = self.selected_git_branch()? {
                    let local = if branch.is_remote {
                        branch.local_name.clone()
                    } else {
                        branch.name.clone()
                    };
                    if !local.is_empty() {
                        self.mode = AppMode::Confirm {
                            message: format!("Push '{}' to origin?", local),
                            action: ConfirmAction::Push(local),
                        };
                    }
                }
            }
            Action::Pull => self.do_pull()?,
            _ => {}
        }
        Ok(())
    }

    fn handle_help_action(&mut self, action: Action) {
        if matches!(action, Action::ToggleHelp | Action::Quit | Action::Cancel) {
            self.mode = AppMode::Normal;
        }
    }

    fn handle_error_action(&mut self, action: Action) {
        // Close the error on any key
        if matches!(action, Action::Quit | Action::Cancel | Action::Confirm) {
            self.mode = AppMode::Normal;
        }
    }

    fn handle_input_action(&mut self, action: Action) -> Result<()> {
        let AppMode::Input {
            title,
            input,
            action: input_action,
        } = &self.mode
        else {
            return Ok(());
        };
        let (title, mut input, input_action) = (title.clone(), input.clone(), input_action.clone());

        match action {
            Action::Confirm => {
                self.mode = AppMode::Normal;
                let input = input.trim();
                match input_action {
                    InputAction::CreateBranch if !input.is_empty() => {
                        self.service.create_branch(input)?;
                        self.set_message(format!("Created branch '{}'", input));
                    }
                    InputAction::Commit if !input.is_empty() => {
                        self.service.commit(input)?;
                        self.set_message("Committed");
                    }
                    // Results already shown by the incremental search
                    _ => {}
                }
            }
            Action::Cancel => {
                if input_action == InputAction::Search {
                    self.clear_search();
                }
                self.mode = AppMode::Normal;
            }
            Action::InputChar(c) => {
                input.push(c);
                if input_action == InputAction::Search {
                    self.update_search(&input);
                }
                self.mode = AppMode::Input {
                    title,
                    input,
                    action: input_action,
                };
            }
            Action::InputBackspace => {
                input.pop();
                if input_action == InputAction::Search {
                    self.update_search(&input);
                }
                self.mode = AppMode::Input {
                    title,
                    input,
                    action: input_action,
                };
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_pick_action(&mut self, action: Action) -> Result<()> {
        let AppMode::Pick {
            input,
            names,
            results,
            selected,
            ..
        } = &mut self.mode
        else {
            return Ok(());
        };

        match action {
            Action::Confirm => {
                let name = selected
                    .and_then(|i| results.get(i))
                    .and_then(|r| names.get(r.index))
                    .cloned();
                self.mode = AppMode::Normal;
                if let Some(name) = name {
                    info!("Showing branch {}", name);
                    self.service.show_branch(&name)?;
                }
            }
            Action::Cancel => self.mode = AppMode::Normal,
            Action::PickUp => {
                if let Some(i) = selected {
                    *i = i.saturating_sub(1);
                }
            }
            Action::PickDown => {
                if let Some(i) = selected {
                    *i = (*i + 1).min(results.len().saturating_sub(1));
                }
            }
            Action::InputChar(c) => {
                input.push(c);
                *results = fuzzy_search_branches(input, names);
                *selected = (!results.is_empty()).then_some(0);
            }
            Action::InputBackspace => {
                input.pop();
                *results = fuzzy_search_branches(input, names);
                *selected = (!results.is_empty()).then_some(0);
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_confirm_action(&mut self, action: Action) -> Result<()> {
        let AppMode::Confirm {
            action: confirm_action,
            ..
        } = &self.mode
        else {
            return Ok(());
        };
        let confirm_action = confirm_action.clone();

        match action {
            Action::Confirm => {
                self.mode = AppMode::Normal;
                match confirm_action {
                    ConfirmAction::DeleteBranch(name) => {
                        self.service.delete_branch(&name)?;
                        self.set_message(format!("Deleted branch '{}'", name));
                    }
                    ConfirmAction::Merge(name) => match self.service.merge_branch(&name) {
                        Err(RepoError::MergeConflicts) => {
                            self.set_message("Merge has conflicts, resolve and commit");
                        }
                        result => {
                            result?;
                            self.set_message(format!("Merged '{}'", name));
                        }
                    },
                    ConfirmAction::Push(name) => {
                        self.service.push_branch(&name)?;
                        self.set_message(format!("Pushed '{}'", name));
                    }
                }
            }
            Action::Cancel => self.mode = AppMode::Normal,
            _ => {}
        }
        Ok(())
    }

    fn update_search(&mut self, text: &str) {
        if text.is_empty() {
            self.clear_search();
        } else {
            self.search_text = Some(text.to_string());
            self.service.search(text);
        }
    }

    fn clear_search(&mut self) {
        if self.search_text.take().is_some() {
            self.service.search("");
        }
    }

    fn open_branch_picker(&mut self) {
        let Some(aug) = self.service.aug_repo() else {
            return;
        };
        let names: Vec<String> = aug
            .branches
            .iter()
            .filter(|b| !self.repo.contains_branch(&b.name))
            .map(|b| b.name.clone())
            .collect();
        self.open_picker("Show branch", names);
    }

    /// Branches hidden at the selected commit, shown directly when only one
    fn open_hidden_branches(&mut self) {
        let Some(id) = self.selected_commit().map(|c| c.id.clone()) else {
            return;
        };
        let mut names = self.service.hidden_branches_at(&id);
        match names.len() {
            0 => self.set_message("No hidden branches at this commit"),
            1 => {
                let name = names.remove(0);
                if let Err(e) = self.service.show_branch(&name) {
                    self.show_error(e.to_string());
                }
            }
            _ => self.open_picker("Show hidden branch", names),
        }
    }

    fn open_picker(&mut self, title: &str, names: Vec<String>) {
        if names.is_empty() {
            self.set_message("All branches are shown");
            return;
        }
        let results = fuzzy_search_branches("", &names);
        self.mode = AppMode::Pick {
            title: title.to_string(),
            input: String::new(),
            selected: (!results.is_empty()).then_some(0),
            names,
            results,
        };
    }

    fn selected_git_branch(&self) -> Result<Option<&ViewBranch>> {
        let Some(branch) = self.selected_branch() else {
            return Ok(None);
        };
        if !branch.is_git_branch() {
            return Err(RepoError::NotGitBranch(branch.display_name.clone()).into());
        }
        Ok(Some(branch))
    }

    fn do_checkout(&mut self) -> Result<()> {
        let Some(branch) = self.selected_git_branch()? else {
            return Ok(());
        };
        if branch.is_current {
            return Ok(());
        }
        // A remote branch checks out its local branch when there is one
        let name = if branch.is_remote && !branch.local_name.is_empty() {
            branch.local_name.clone()
        } else {
            branch.name.clone()
        };
        self.service.checkout(&name)?;
        self.set_message(format!("Checked out '{}'", name));
        Ok(())
    }

    fn do_pull(&mut self) -> Result<()> {
        let Some(branch) = self.selected_git_branch()? else {
            return Ok(());
        };
        if branch.is_current || self.repo.current_branch_name == branch.local_name {
            self.service.pull_current_branch()?;
        } else {
            let name = branch.name.clone();
            self.service.pull_branch(&name)?;
        }
        self.set_message("Pulled");
        Ok(())
    }

    fn move_selection(&mut self, delta: i32) {
        let max = self.repo.commits.len().saturating_sub(1);
        let current = self.graph_list_state.selected().unwrap_or(0);
        let new = (current as i32 + delta).clamp(0, max as i32) as usize;
        self.select_row(new);
    }

    fn select_row(&mut self, row: usize) {
        self.graph_list_state.select(Some(row));
    }

    fn jump_to_current(&mut self) {
        if let Some(row) = self.repo.commits.iter().position(|c| c.is_current) {
            self.select_row(row);
        }
    }

    /// Move to the next or previous row holding a branch tip
    fn move_to_branch_tip(&mut self, forward: bool) {
        let mut tips: Vec<usize> = self.repo.branches.iter().filter_map(|b| b.tip).collect();
        tips.sort_unstable();
        tips.dedup();

        let current = self.graph_list_state.selected().unwrap_or(0);
        let target = if forward {
            tips.into_iter().find(|&row| row > current)
        } else {
            tips.into_iter().rev().find(|&row| row < current)
        };
        if let Some(row) = target {
            self.select_row(row);
        }
    }
}
