//! Help popup widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation",
        &[
            ("j / ↓", "Move down"),
            ("k / ↑", "Move up"),
            ("] / Tab", "Next branch tip"),
            ("[ / S-Tab", "Previous branch tip"),
            ("Ctrl+d", "Page down"),
            ("Ctrl+u", "Page up"),
            ("g / Home", "Go to top"),
            ("G / End", "Go to bottom"),
            ("@", "Jump to current commit"),
        ],
    ),
    (
        "Branches",
        &[
            ("s / →", "Show branches hidden at commit"),
            ("S", "Show any branch"),
            ("x / ←", "Hide branch"),
            ("a", "Set as parent of ambiguous branches"),
            ("A", "Unset as parent"),
        ],
    ),
    (
        "Git Operations",
        &[
            ("Enter", "Checkout branch"),
            ("b", "Create branch at current commit"),
            ("d", "Delete branch (local and remote)"),
            ("c", "Commit all changes"),
            ("m", "Merge into current branch"),
            ("p", "Push branch"),
            ("P", "Pull branch"),
            ("f", "Fetch from origin"),
        ],
    ),
    (
        "Other",
        &[
            ("/", "Search commits"),
            ("R", "Refresh"),
            ("?", "Toggle this help"),
            ("q / Esc", "Clear search, quit"),
        ],
    ),
];

pub struct HelpPopup;

impl Widget for HelpPopup {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let desc_style = Style::default().fg(Color::White);
        let header_style = Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);

        let mut lines = Vec::new();
        for (i, (header, keys)) in SECTIONS.iter().enumerate() {
            if i > 0 {
                lines.push(Line::from(""));
            }
            lines.push(Line::from(Span::styled(*header, header_style)));
            for (key, desc) in keys.iter() {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {:<11}", key), key_style),
                    Span::styled(*desc, desc_style),
                ]));
            }
        }

        let block = Block::default()
            .title(" Help ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .style(Style::default().bg(Color::Black));

        Paragraph::new(lines).block(block).render(area, buf);
    }
}
