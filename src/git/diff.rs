//! Commit diff information

use std::path::Path;

use git2::{Delta, Diff, DiffOptions, Oid, Patch, Repository};

use super::UNCOMMITTED_ID;
use crate::error::{RepoError, Result};

/// File change kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffMode {
    Modified,
    Added,
    Removed,
    Conflicts,
}

/// Line change kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineMode {
    Added,
    Removed,
    Same,
    ConflictStart,
    ConflictSplit,
    ConflictEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    pub mode: LineMode,
    pub text: String,
}

/// One hunk of a file diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDiff {
    /// Hunk header, e.g. "@@ -1,3 +1,4 @@"
    pub changed_indexes: String,
    pub lines: Vec<LineDiff>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path_before: String,
    pub path_after: String,
    pub is_renamed: bool,
    pub mode: DiffMode,
    pub section_diffs: Vec<SectionDiff>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitDiff {
    pub id: String,
    pub author: String,
    pub date: String,
    pub message: String,
    pub file_diffs: Vec<FileDiff>,
}

impl CommitDiff {
    /// Diff of a commit against its first parent (empty tree for a root commit).
    /// `UNCOMMITTED_ID` diffs the working tree, including untracked and conflicted files.
    pub fn from_commit(repo: &Repository, id: &str) -> Result<Self> {
        if id == UNCOMMITTED_ID {
            return Self::from_working_tree(repo);
        }

        let oid = Oid::from_str(id)?;
        let commit = repo.find_commit(oid)?;
        let new_tree = commit.tree()?;
        let old_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let mut opts = DiffOptions::new();
        opts.ignore_submodules(true);

        let diff = repo.diff_tree_to_tree(old_tree.as_ref(), Some(&new_tree), Some(&mut opts))?;

        let author = commit.author();
        let date = chrono::DateTime::from_timestamp(commit.time().seconds(), 0)
            .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();

        Ok(Self {
            id: id.to_string(),
            author: author.name().unwrap_or_default().to_string(),
            date,
            message: commit.message().unwrap_or_default().trim_end().to_string(),
            file_diffs: file_diffs(&diff)?,
        })
    }

    fn from_working_tree(repo: &Repository) -> Result<Self> {
        let head_tree = repo.head().ok().and_then(|h| h.peel_to_tree().ok());

        let mut opts = DiffOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true)
            .ignore_submodules(true);

        let diff = repo.diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))?;
        let mut files = file_diffs(&diff)?;

        let index = repo.index()?;
        if index.has_conflicts() {
            let workdir = repo
                .workdir()
                .ok_or_else(|| RepoError::GitUnavailable("bare repository".to_string()))?;
            for conflict in index.conflicts()? {
                let conflict = conflict?;
                let Some(entry) = conflict.our.or(conflict.their) else {
                    continue;
                };
                let path = String::from_utf8_lossy(&entry.path).to_string();
                let file = conflict_file_diff(workdir, &path);
                files.retain(|f| f.path_after != path);
                files.push(file);
            }
        }

        files.sort_by_key(|f| f.path_after.to_lowercase());

        Ok(Self {
            id: UNCOMMITTED_ID.to_string(),
            file_diffs: files,
            ..Default::default()
        })
    }
}

fn file_diffs(diff: &Diff) -> Result<Vec<FileDiff>> {
    let mut files = Vec::with_capacity(diff.deltas().len());

    for idx in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(idx) else {
            continue;
        };
        if delta.flags().is_binary() {
            continue;
        }

        let mode = match delta.status() {
            Delta::Added | Delta::Untracked | Delta::Copied => DiffMode::Added,
            Delta::Deleted => DiffMode::Removed,
            Delta::Conflicted => DiffMode::Conflicts,
            Delta::Modified | Delta::Renamed | Delta::Typechange => DiffMode::Modified,
            _ => continue,
        };
        let path_of = |p: Option<&Path>| p.map(|p| p.to_string_lossy().to_string());
        let path_before = path_of(delta.old_file().path()).unwrap_or_default();
        let path_after = path_of(delta.new_file().path()).unwrap_or_else(|| path_before.clone());

        let mut section_diffs = Vec::new();
        if let Some(patch) = Patch::from_diff(diff, idx)? {
            for hunk_idx in 0..patch.num_hunks() {
                let (hunk, line_count) = patch.hunk(hunk_idx)?;
                let mut lines = Vec::with_capacity(line_count);
                for line_idx in 0..line_count {
                    let line = patch.line_in_hunk(hunk_idx, line_idx)?;
                    let mode = match line.origin() {
                        '+' => LineMode::Added,
                        '-' => LineMode::Removed,
                        ' ' => LineMode::Same,
                        _ => continue,
                    };
                    let text = String::from_utf8_lossy(line.content())
                        .trim_end_matches(['\n', '\r'])
                        .to_string();
                    lines.push(LineDiff { mode, text });
                }
                section_diffs.push(SectionDiff {
                    changed_indexes: String::from_utf8_lossy(hunk.header()).trim().to_string(),
                    lines,
                });
            }
        }

        files.push(FileDiff {
            is_renamed: delta.status() == Delta::Renamed,
            path_before,
            path_after,
            mode,
            section_diffs,
        });
    }

    Ok(files)
}

/// Read a conflicted working file and mark its conflict regions
fn conflict_file_diff(workdir: &Path, path: &str) -> FileDiff {
    let text = std::fs::read_to_string(workdir.join(path)).unwrap_or_default();
    FileDiff {
        path_before: path.to_string(),
        path_after: path.to_string(),
        is_renamed: false,
        mode: DiffMode::Conflicts,
        section_diffs: vec![SectionDiff {
            changed_indexes: String::new(),
            lines: conflict_lines(&text),
        }],
    }
}

pub(crate) fn conflict_lines(text: &str) -> Vec<LineDiff> {
    text.lines()
        .map(|line| {
            let mode = if line.starts_with("<<<<<<<") {
                LineMode::ConflictStart
            } else if line.starts_with("=======") {
                LineMode::ConflictSplit
            } else if line.starts_with(">>>>>>>") {
                LineMode::ConflictEnd
            } else {
                LineMode::Same
            };
            LineDiff {
                mode,
                text: line.to_string(),
            }
        })
        .collect()
}
