//! Status bar widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

use crate::app::{App, AppMode};
use crate::git::GitSource;

pub struct StatusBar<'a> {
    mode: &'a AppMode,
    repo_name: String,
    current_branch: &'a str,
    message: Option<&'a str>,
    is_loading: bool,
    search_info: Option<String>,
}

impl<'a> StatusBar<'a> {
    pub fn new<S: GitSource + 'static>(app: &'a App<S>) -> Self {
        let path = app.service.repo_path();
        let repo_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let search_info = app.search_text.as_ref().map(|_| {
            let count = app.repo.commits.len();
            if count > 0 {
                format!("{} matches", count)
            } else {
                "No matches".to_string()
            }
        });

        Self {
            mode: &app.mode,
            repo_name,
            current_branch: &app.repo.current_branch_name,
            message: app.get_message(),
            is_loading: app.is_loading,
            search_info,
        }
    }
}

fn key_hints(spans: &mut Vec<Span<'static>>, hints: &[(&'static str, &'static str)]) {
    let key_style = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(Color::White);
    for (key, desc) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!("{} ", desc), desc_style));
    }
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mode_style = Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
        let repo_style = Style::default()
            .fg(Color::Black)
            .bg(Color::Magenta)
            .add_modifier(Modifier::BOLD);

        let mut spans: Vec<Span> = vec![
            Span::styled(format!(" {} ", self.repo_name), repo_style),
            Span::raw(" "),
        ];

        if !self.current_branch.is_empty() {
            spans.push(Span::styled(
                format!(" {} ", self.current_branch),
                Style::default().fg(Color::Black).bg(Color::Green),
            ));
            spans.push(Span::raw(" "));
        }

        if self.is_loading {
            spans.push(Span::styled(" loading ", Style::default().fg(Color::Black).bg(Color::Yellow)));
            spans.push(Span::raw(" "));
        }

        match self.mode {
            AppMode::Normal => {
                if let Some(msg) = self.message {
                    let msg_style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                    spans.push(Span::styled(format!(" {} ", msg), msg_style));
                    spans.push(Span::raw("  "));
                } else if let Some(info) = &self.search_info {
                    let search_style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Green)
                        .add_modifier(Modifier::BOLD);
                    spans.push(Span::styled(format!(" {} ", info), search_style));
                    spans.push(Span::raw("  "));
                    key_hints(&mut spans, &[("/", "edit"), ("Esc", "clear search")]);
                } else {
                    key_hints(
                        &mut spans,
                        &[
                            ("j/k", "move"),
                            ("s", "show"),
                            ("x", "hide"),
                            ("Enter", "checkout"),
                            ("/", "search"),
                            ("?", "help"),
                            ("q", "quit"),
                        ],
                    );
                }
            }
            AppMode::Help => key_hints(&mut spans, &[("Esc/q", "close help")]),
            AppMode::Input { .. } | AppMode::Pick { .. } => {
                key_hints(&mut spans, &[("Enter", "confirm"), ("Esc", "cancel")])
            }
            AppMode::Confirm { .. } => key_hints(&mut spans, &[("y", "yes"), ("n", "no")]),
            AppMode::Error { message } => {
                let error_style = Style::default()
                    .fg(Color::White)
                    .bg(Color::Red)
                    .add_modifier(Modifier::BOLD);
                spans.push(Span::styled(format!(" {} ", message), error_style));
                spans.push(Span::raw("  "));
                key_hints(&mut spans, &[("Esc/Enter", "close")]);
            }
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);

        // Mode on the right, except in Normal mode
        let mode_text = match self.mode {
            AppMode::Normal => None,
            AppMode::Help => Some(" HELP "),
            AppMode::Input { .. } => Some(" INPUT "),
            AppMode::Pick { .. } => Some(" PICK "),
            AppMode::Confirm { .. } => Some(" CONFIRM "),
            AppMode::Error { .. } => Some(" ERROR "),
        };
        if let Some(text) = mode_text {
            let mode_len = text.len() as u16;
            if area.width > mode_len {
                buf.set_string(area.x + area.width - mode_len, area.y, text, mode_style);
            }
        }
    }
}
