//! Graph view widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::App,
    git::{strip_remote_prefix, GitSource, PARTIAL_LOG_COMMIT_ID},
    graph::{BranchBits, GraphCell, More},
    view::{ViewCommit, ViewRepo},
};

/// Calculate display width of a string
/// Accounts for emoji variation selectors (U+FE0F) which cause preceding
/// characters to display as 2-width emoji in terminals
pub fn display_width(s: &str) -> usize {
    let base_width = UnicodeWidthStr::width(s);
    let variation_selectors = s.chars().filter(|&c| c == '\u{FE0F}').count();
    base_width + variation_selectors
}

pub struct GraphViewWidget<'a> {
    items: Vec<ListItem<'a>>,
    title: String,
}

impl<'a> GraphViewWidget<'a> {
    pub fn new<S: GitSource + 'static>(app: &App<S>, width: u16) -> Self {
        // Actual width minus borders
        let inner_width = width.saturating_sub(2) as usize;
        let repo = &app.repo;

        let items: Vec<ListItem> = repo
            .commits
            .iter()
            .map(|commit| {
                let is_selected = app.graph_list_state.selected() == Some(commit.index);
                ListItem::new(render_commit_line(repo, commit, is_selected, inner_width))
            })
            .collect();

        let title = match &app.search_text {
            Some(text) => format!(" Search: {} ({}) ", text, repo.commits.len()),
            None => " Commits ".to_string(),
        };

        Self { items, title }
    }
}

/// Spans of one graph row, two cells per branch column
pub fn graph_spans(row: &[GraphCell]) -> Vec<Span<'static>> {
    let mut spans = Vec::with_capacity(row.len() * 2);
    for cell in row {
        let (connector, branch) = cell.glyphs();
        spans.push(Span::styled(connector.to_string(), glyph_style(connector_color(cell))));
        spans.push(Span::styled(branch.to_string(), glyph_style(branch_color(cell))));
    }
    spans
}

fn glyph_style(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Connectors take the color of the ribbon through them
fn connector_color(cell: &GraphCell) -> Color {
    cell.pass_color.unwrap_or(cell.branch_color)
}

fn branch_color(cell: &GraphCell) -> Color {
    if cell.branch == BranchBits::PASS {
        // Ribbon only, no line of the column branch
        cell.pass_color.unwrap_or(cell.branch_color)
    } else {
        cell.branch_color
    }
}

/// Marker after the graph: hidden neighbors first, then ahead/behind
fn commit_marker(commit: &ViewCommit) -> (&'static str, Color) {
    if commit.is_current {
        return ("●", Color::White);
    }
    if commit.more.contains(More::MERGE_IN | More::BRANCH_OUT) {
        return ("<", Color::DarkGray);
    }
    if commit.more.contains(More::MERGE_IN) {
        return ("╮", Color::DarkGray);
    }
    if commit.more.contains(More::BRANCH_OUT) {
        return ("╭", Color::DarkGray);
    }
    if commit.is_local_only {
        return ("▲", Color::Green);
    }
    if commit.is_remote_only {
        return ("▼", Color::Blue);
    }
    (" ", Color::Reset)
}

fn subject_style(repo: &ViewRepo, commit: &ViewCommit, is_selected: bool) -> Style {
    let style = if commit.is_uncommitted() {
        let color = if repo.conflicts > 0 {
            Color::Red
        } else if !repo.merge_message.is_empty() {
            Color::LightRed
        } else {
            Color::Yellow
        };
        Style::default().fg(color)
    } else if commit.id == PARTIAL_LOG_COMMIT_ID {
        Style::default().fg(Color::DarkGray)
    } else if commit.is_local_only {
        Style::default().fg(Color::Green)
    } else if commit.is_remote_only {
        Style::default().fg(Color::Blue)
    } else if repo
        .branches
        .get(commit.branch)
        .is_some_and(|b| !b.is_current && !repo.current_branch_name.is_empty() && b.local_name != repo.current_branch_name)
    {
        Style::default().fg(Color::Gray)
    } else {
        Style::default()
    };

    if is_selected {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

/// Labels of the branches with a tip on this commit.
/// A local branch in sync with its remote shows as "xxx ↔ origin".
fn branch_labels(repo: &ViewRepo, commit: &ViewCommit) -> Vec<(String, Style)> {
    // Max width for a single branch label (e.g., "[fix/feature-name]")
    const MAX_BRANCH_LABEL_WIDTH: usize = 40;

    let names = &commit.branch_tip_names;
    let mut labels = Vec::new();
    for name in names {
        let is_remote = name.starts_with("origin/");
        let local = strip_remote_prefix(name);
        let has_local = names.iter().any(|n| n == local);
        if is_remote && has_local {
            // Shown with its local branch
            continue;
        }

        let color = repo
            .branch_by_name(name)
            .map(|b| b.color)
            .unwrap_or(Color::DarkGray);
        let mut style = Style::default().fg(color).add_modifier(Modifier::BOLD);
        if repo.current_branch_name == *name {
            style = style.add_modifier(Modifier::UNDERLINED);
        }

        let synced = !is_remote && names.iter().any(|n| n.starts_with("origin/") && strip_remote_prefix(n) == name);
        let label = if synced {
            let label = format!("[{} ↔ origin]", name);
            if display_width(&label) > MAX_BRANCH_LABEL_WIDTH {
                abbreviate_branch_label(name, MAX_BRANCH_LABEL_WIDTH - 11).replace(']', " ↔ origin]")
            } else {
                label
            }
        } else {
            abbreviate_branch_label(name, MAX_BRANCH_LABEL_WIDTH)
        };
        labels.push((label, style));
    }

    let tag_style = Style::default().fg(Color::Yellow);
    for tag in &commit.tags {
        labels.push((format!("<{}>", tag), tag_style));
    }
    labels
}

/// Truncate a string to the specified display width
/// Accounts for emoji variation selectors (U+FE0F)
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;
    for ch in s.chars() {
        // Variation selector adds 1 to width (makes preceding char 2-width emoji)
        let ch_width = if ch == '\u{FE0F}' {
            1
        } else {
            unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0)
        };
        if current_width + ch_width > max_width {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }
    result
}

/// Bracketed branch name fitting `max_width`.
/// Uses format: prefix/head...tail (preserving last 5 chars)
fn abbreviate_branch_label(name: &str, max_width: usize) -> String {
    const TAIL_LEN: usize = 5;
    const ELLIPSIS: &str = "...";

    // -2 for brackets
    let available = max_width.saturating_sub(2);
    if display_width(name) <= available {
        return format!("[{}]", name);
    }

    let (prefix, rest) = match name.find('/') {
        Some(pos) => (&name[..=pos], &name[pos + 1..]),
        None => ("", name),
    };

    let rest_chars: Vec<char> = rest.chars().collect();
    let tail: String = if rest_chars.len() > TAIL_LEN {
        rest_chars[rest_chars.len() - TAIL_LEN..].iter().collect()
    } else {
        rest.to_string()
    };

    let head_available =
        available.saturating_sub(display_width(prefix) + display_width(ELLIPSIS) + display_width(&tail));
    if head_available == 0 {
        let truncated = truncate_to_width(name, available.saturating_sub(3));
        return format!("[{}...]", truncated);
    }

    let head = truncate_to_width(rest, head_available);
    format!("[{}{}{}{}]", prefix, head, ELLIPSIS, tail)
}

fn render_commit_line<'a>(repo: &ViewRepo, commit: &ViewCommit, is_selected: bool, total_width: usize) -> Line<'a> {
    // Graph start marker (to distinguish from borders)
    let mut spans: Vec<Span> = vec![Span::raw(" ")];
    let mut left_width: usize = 1;

    let row = repo.graph_row(commit.index);
    spans.extend(graph_spans(row));
    left_width += row.len() * 2;

    let (marker, marker_color) = commit_marker(commit);
    spans.push(Span::styled(marker, Style::default().fg(marker_color)));
    spans.push(Span::raw(" "));
    left_width += 2;

    let labels = branch_labels(repo, commit);
    let labels_width: usize = labels.iter().map(|(label, _)| display_width(label) + 1).sum();

    // === Right-aligned: date author sid (fixed width) ===
    // Priority: author > date > sid (sid disappears first, then date, then author)
    const WIDTH_DATE_AUTHOR_SID: usize = 30; // " YYYY-MM-DD  author    sid   "
    const WIDTH_DATE_AUTHOR: usize = 22; // " YYYY-MM-DD  author   "
    const WIDTH_AUTHOR_ONLY: usize = 11; // "  author   "
    const CONTENT_MIN_WIDTH: usize = 50;

    let remaining_for_content = total_width.saturating_sub(left_width);
    let has_details = !commit.is_uncommitted() && commit.id != PARTIAL_LOG_COMMIT_ID;
    let available_for_right = if has_details {
        remaining_for_content.saturating_sub(CONTENT_MIN_WIDTH)
    } else {
        0
    };
    let (show_date, show_author, show_sid, right_width) = match available_for_right {
        w if w >= WIDTH_DATE_AUTHOR_SID => (true, true, true, WIDTH_DATE_AUTHOR_SID),
        w if w >= WIDTH_DATE_AUTHOR => (true, true, false, WIDTH_DATE_AUTHOR),
        w if w >= WIDTH_AUTHOR_ONLY => (false, true, false, WIDTH_AUTHOR_ONLY),
        _ => (false, false, false, 0),
    };

    for (label, style) in labels {
        left_width += display_width(&label) + 1;
        spans.push(Span::styled(label, style));
        spans.push(Span::raw(" "));
    }

    let available_for_subject = remaining_for_content
        .saturating_sub(labels_width)
        .saturating_sub(right_width);
    let subject = truncate_to_width(&commit.subject, available_for_subject);
    left_width += display_width(&subject);
    spans.push(Span::styled(subject, subject_style(repo, commit, is_selected)));

    let padding = total_width.saturating_sub(left_width).saturating_sub(right_width);
    if padding > 0 && right_width > 0 {
        spans.push(Span::raw(" ".repeat(padding)));
    }

    if show_date {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            commit.author_time.format("%Y-%m-%d").to_string(),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if show_author {
        let author = truncate_to_width(&commit.author, 8);
        spans.push(Span::raw("  "));
        spans.push(Span::styled(format!("{:<8}", author), Style::default().fg(Color::Cyan)));
    }
    if show_sid {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(format!("{:<6}", commit.sid), Style::default().fg(Color::Yellow)));
    }
    if show_date || show_author || show_sid {
        spans.push(Span::raw(" "));
    }

    Line::from(spans)
}

impl<'a> StatefulWidget for GraphViewWidget<'a> {
    type State = ListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));

        let highlight_style = Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD);

        let list = List::new(self.items)
            .block(block)
            .highlight_style(highlight_style);

        StatefulWidget::render(list, area, buf, state);
    }
}
