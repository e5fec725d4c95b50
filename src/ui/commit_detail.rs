//! Commit detail widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};

use crate::app::App;
use crate::git::{to_sid, CommitDiff, DiffMode, GitSource, LineMode};
use crate::view::{ViewCommit, ViewRepo};

/// Diff lines shown before cutting off
const MAX_DIFF_LINES: usize = 400;

pub struct CommitDetailWidget<'a> {
    lines: Vec<Line<'a>>,
}

impl<'a> CommitDetailWidget<'a> {
    pub fn new<S: GitSource + 'static>(app: &App<S>) -> Self {
        let Some(commit) = app.selected_commit() else {
            return Self {
                lines: vec![Line::from(Span::styled(
                    "No commit selected",
                    Style::default().fg(Color::DarkGray),
                ))],
            };
        };

        let mut lines = header_lines(&app.repo, commit);
        lines.push(Line::from(""));

        match app.cached_diff() {
            Some(diff) => lines.extend(diff_lines(diff)),
            None if app.is_diff_loading() => lines.push(Line::from(Span::styled(
                "Loading diff...",
                Style::default().fg(Color::DarkGray),
            ))),
            None => {}
        }

        Self { lines }
    }
}

fn label(text: &'static str) -> Span<'static> {
    Span::styled(text, Style::default().add_modifier(Modifier::BOLD))
}

fn header_lines(repo: &ViewRepo, commit: &ViewCommit) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if commit.is_uncommitted() {
        lines.push(Line::from(Span::styled(commit.subject.clone(), Style::default().fg(Color::Yellow))));
        if !repo.merge_message.is_empty() {
            lines.push(Line::from(vec![label("Merging: "), Span::raw(repo.merge_message.clone())]));
        }
        return lines;
    }

    lines.push(Line::from(vec![
        label("Commit: "),
        Span::styled(commit.id.clone(), Style::default().fg(Color::Yellow)),
    ]));
    lines.push(Line::from(vec![
        label("Author: "),
        Span::styled(commit.author.clone(), Style::default().fg(Color::Blue)),
    ]));
    lines.push(Line::from(vec![
        label("Date:   "),
        Span::styled(
            commit.author_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    ]));

    if let Some(branch) = repo.branches.get(commit.branch) {
        let mut name = branch.display_name.clone();
        if commit.is_ambiguous && !branch.ambiguous_branch_names.is_empty() {
            name = format!("{} (ambiguous: {})", name, branch.ambiguous_branch_names.join(", "));
        }
        lines.push(Line::from(vec![
            label("Branch: "),
            Span::styled(name, Style::default().fg(branch.color)),
        ]));
    }

    if !commit.parent_ids.is_empty() {
        let parents: Vec<String> = commit.parent_ids.iter().map(|id| to_sid(id)).collect();
        lines.push(Line::from(vec![
            label("Parent: "),
            Span::styled(parents.join(", "), Style::default().fg(Color::DarkGray)),
        ]));
    }

    lines.push(Line::from(""));
    for line in commit.message.lines() {
        lines.push(Line::from(Span::raw(line.to_string())));
    }
    lines
}

fn diff_lines(diff: &CommitDiff) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for file in &diff.file_diffs {
        let (mark, color) = match file.mode {
            DiffMode::Added => ("A", Color::Green),
            DiffMode::Removed => ("D", Color::Red),
            DiffMode::Modified => ("M", Color::Yellow),
            DiffMode::Conflicts => ("C", Color::Red),
        };
        let path = if file.is_renamed {
            format!("{} -> {}", file.path_before, file.path_after)
        } else {
            file.path_after.clone()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", mark), Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(path, Style::default().add_modifier(Modifier::BOLD)),
        ]));
    }

    for file in &diff.file_diffs {
        for section in &file.section_diffs {
            if lines.len() >= MAX_DIFF_LINES {
                lines.push(Line::from(Span::styled("...", Style::default().fg(Color::DarkGray))));
                return lines;
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("{} {}", file.path_after, section.changed_indexes),
                Style::default().fg(Color::Cyan),
            )));
            for line in &section.lines {
                let (prefix, style) = match line.mode {
                    LineMode::Added => ("+", Style::default().fg(Color::Green)),
                    LineMode::Removed => ("-", Style::default().fg(Color::Red)),
                    LineMode::Same => (" ", Style::default()),
                    LineMode::ConflictStart | LineMode::ConflictSplit | LineMode::ConflictEnd => {
                        ("!", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
                    }
                };
                lines.push(Line::from(Span::styled(format!("{}{}", prefix, line.text), style)));
            }
        }
    }
    lines
}

impl<'a> Widget for CommitDetailWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Commit Detail ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));

        let paragraph = Paragraph::new(self.lines)
            .block(block)
            .wrap(Wrap { trim: false });

        Widget::render(paragraph, area, buf);
    }
}
