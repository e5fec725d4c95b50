//! Plain text rendering of a view, for printing to a terminal or a pipe

use std::fmt::Write;

use crossterm::style::{style, Color as AnsiColor, Stylize};
use ratatui::style::Color;

use crate::git::UNCOMMITTED_ID;
use crate::graph::{BranchBits, GraphCell};
use crate::view::ViewRepo;

/// One line per commit: graph, branch tips, subject and short id
pub fn render_text(repo: &ViewRepo, use_color: bool) -> String {
    let mut out = String::new();
    for commit in &repo.commits {
        if !repo.graph.is_empty() {
            out.push_str(&graph_text(repo.graph_row(commit.index), use_color));
            out.push(' ');
        }

        for name in &commit.branch_tip_names {
            let label = format!("[{}]", name);
            match repo.branch_by_name(name) {
                Some(b) if use_color => {
                    let _ = write!(out, "{} ", style(&label).with(to_ansi(b.color)).bold());
                }
                _ => {
                    let _ = write!(out, "{} ", label);
                }
            }
        }
        for tag in &commit.tags {
            let _ = write!(out, "<{}> ", tag);
        }

        out.push_str(&commit.subject);
        if commit.id != UNCOMMITTED_ID {
            let _ = write!(out, " {}", commit.sid);
        }
        out.push('\n');
    }
    out
}

fn graph_text(row: &[GraphCell], use_color: bool) -> String {
    let mut out = String::new();
    for cell in row {
        let (connector, branch) = cell.glyphs();
        if use_color {
            let pass = to_ansi(cell.pass_color.unwrap_or(cell.branch_color));
            let _ = write!(out, "{}", style(connector).with(pass));
            let branch_color = if cell.branch == BranchBits::PASS {
                pass
            } else {
                to_ansi(cell.branch_color)
            };
            let _ = write!(out, "{}", style(branch).with(branch_color));
        } else {
            out.push(connector);
            out.push(branch);
        }
    }
    out
}

fn to_ansi(color: Color) -> AnsiColor {
    match color {
        Color::Reset => AnsiColor::Reset,
        Color::Black => AnsiColor::Black,
        Color::Red => AnsiColor::DarkRed,
        Color::Green => AnsiColor::DarkGreen,
        Color::Yellow => AnsiColor::DarkYellow,
        Color::Blue => AnsiColor::DarkBlue,
        Color::Magenta => AnsiColor::DarkMagenta,
        Color::Cyan => AnsiColor::DarkCyan,
        Color::Gray => AnsiColor::Grey,
        Color::DarkGray => AnsiColor::DarkGrey,
        Color::LightRed => AnsiColor::Red,
        Color::LightGreen => AnsiColor::Green,
        Color::LightYellow => AnsiColor::Yellow,
        Color::LightBlue => AnsiColor::Blue,
        Color::LightMagenta => AnsiColor::Magenta,
        Color::LightCyan => AnsiColor::Cyan,
        Color::White => AnsiColor::White,
        Color::Rgb(r, g, b) => AnsiColor::Rgb { r, g, b },
        Color::Indexed(i) => AnsiColor::AnsiValue(i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ConnectorBits;

    #[test]
    fn test_graph_text_plain() {
        let row = vec![
            GraphCell {
                branch: BranchBits::COMMIT,
                ..Default::default()
            },
            GraphCell {
                branch: BranchBits::TIP,
                connector: ConnectorBits::MERGE_RIGHT,
                ..Default::default()
            },
        ];
        assert_eq!(graph_text(&row, false), " ┣╮┏");
    }

    #[test]
    fn test_colored_text_has_escapes() {
        let row = vec![GraphCell {
            branch: BranchBits::LINE,
            branch_color: Color::Green,
            ..Default::default()
        }];
        let text = graph_text(&row, true);
        assert!(text.contains('\u{1b}'));
        assert!(text.contains('┃'));
    }

    #[test]
    fn test_empty_repo() {
        assert_eq!(render_text(&ViewRepo::default(), false), "");
    }
}
