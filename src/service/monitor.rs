//! Classify file changes and batch them before refreshing

use std::path::Path;
use std::time::{Duration, Instant};

/// What has to be re-read. A repo change includes the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    Status,
    Repo,
}

/// Kind of refresh a changed path needs, `None` for paths to ignore
pub fn classify_path(repo_root: &Path, path: &Path) -> Option<ChangeKind> {
    if path.extension().is_some_and(|ext| ext == "lock") {
        return None;
    }

    let git_dir = repo_root.join(".git");
    let Ok(in_git) = path.strip_prefix(&git_dir) else {
        return Some(ChangeKind::Status);
    };

    if in_git == Path::new("FETCH_HEAD") || in_git.starts_with("objects") {
        None
    } else if in_git == Path::new("HEAD") || in_git.starts_with("refs") {
        Some(ChangeKind::Repo)
    } else {
        // Index, logs, hooks and other internals
        None
    }
}

/// Collects changes and releases them once the batch interval since the first
/// pending change has passed. A pending repo change absorbs status changes.
#[derive(Debug)]
pub struct Debouncer {
    interval: Duration,
    pending: Option<ChangeKind>,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: None,
            deadline: None,
        }
    }

    /// True for the first change of a batch
    pub fn add(&mut self, kind: ChangeKind, now: Instant) -> bool {
        let is_first = self.pending.is_none();
        if is_first {
            self.deadline = Some(now + self.interval);
        }
        self.pending = self.pending.max(Some(kind));
        is_first
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time to wait for the next due batch
    pub fn timeout(&self, now: Instant) -> Duration {
        match self.deadline {
            Some(deadline) => deadline.saturating_duration_since(now),
            None => self.interval,
        }
    }

    pub fn take_due(&mut self, now: Instant) -> Option<ChangeKind> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Forget pending changes, a full refresh covers them
    pub fn clear(&mut self) {
        self.pending = None;
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_classify_path() {
        let root = PathBuf::from("/work/repo");
        let classify = |p: &str| classify_path(&root, &root.join(p));

        assert_eq!(classify("src/main.rs"), Some(ChangeKind::Status));
        assert_eq!(classify(".git/HEAD"), Some(ChangeKind::Repo));
        assert_eq!(classify(".git/refs/heads/main"), Some(ChangeKind::Repo));
        assert_eq!(classify(".git/refs/heads/main.lock"), None);
        assert_eq!(classify(".git/index.lock"), None);
        assert_eq!(classify(".git/FETCH_HEAD"), None);
        assert_eq!(classify(".git/objects/ab/cdef"), None);
        assert_eq!(classify(".git/index"), None);
    }

    #[test]
    fn test_batches_until_interval() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_secs(1));
        assert!(debouncer.add(ChangeKind::Status, start));
        assert!(!debouncer.add(ChangeKind::Status, start + Duration::from_millis(300)));

        assert_eq!(debouncer.take_due(start + Duration::from_millis(500)), None);
        assert_eq!(debouncer.timeout(start + Duration::from_millis(500)), Duration::from_millis(500));
        assert_eq!(debouncer.take_due(start + Duration::from_secs(1)), Some(ChangeKind::Status));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_repo_change_supersedes_status() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_secs(1));
        debouncer.add(ChangeKind::Repo, start);
        debouncer.add(ChangeKind::Status, start);
        assert_eq!(debouncer.take_due(start + Duration::from_secs(2)), Some(ChangeKind::Repo));
    }

    #[test]
    fn test_clear() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_secs(1));
        debouncer.add(ChangeKind::Status, start);
        debouncer.clear();
        assert_eq!(debouncer.take_due(start + Duration::from_secs(2)), None);
    }
}
