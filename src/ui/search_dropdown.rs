//! Branch picker dropdown with fuzzy matching

use std::collections::HashSet;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};

use crate::search::FuzzySearchResult;

const MAX_VISIBLE_RESULTS: usize = 10;

/// Input field over the branch names matching it
pub struct SearchDropdown<'a> {
    title: &'a str,
    input: &'a str,
    results: &'a [FuzzySearchResult],
    names: &'a [String],
    selected_index: Option<usize>,
}

impl<'a> SearchDropdown<'a> {
    pub fn new(
        title: &'a str,
        input: &'a str,
        results: &'a [FuzzySearchResult],
        names: &'a [String],
        selected_index: Option<usize>,
    ) -> Self {
        Self {
            title,
            input,
            results,
            names,
            selected_index,
        }
    }

    fn name(&self, result: &FuzzySearchResult) -> &'a str {
        self.names.get(result.index).map(String::as_str).unwrap_or("")
    }

    /// Branch name with matched characters highlighted
    fn highlighted_name(&self, result: &FuzzySearchResult, max_width: usize) -> Vec<Span<'a>> {
        let matched: HashSet<usize> = result.matched_indices.iter().copied().collect();

        let mut spans = Vec::new();
        let mut segment = String::new();
        let mut segment_matched = false;

        for (char_idx, ch) in self.name(result).chars().enumerate() {
            if char_idx >= max_width.saturating_sub(3) {
                segment.push_str("...");
                break;
            }
            let is_matched = matched.contains(&char_idx);
            if is_matched != segment_matched && !segment.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut segment), highlight_style(segment_matched)));
            }
            segment.push(ch);
            segment_matched = is_matched;
        }
        if !segment.is_empty() {
            spans.push(Span::styled(segment, highlight_style(segment_matched)));
        }
        spans
    }
}

fn highlight_style(is_matched: bool) -> Style {
    if is_matched {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

/// First visible result keeping the selection in view
fn scroll_offset(selected: usize, visible_count: usize) -> usize {
    (selected + 1).saturating_sub(visible_count)
}

impl<'a> Widget for SearchDropdown<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let block = Block::default()
            .title(format!(" {} ", self.title))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .style(Style::default().bg(Color::Black));

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height < 2 || inner.width < 4 {
            return;
        }
        let bottom = inner.y + inner.height;
        let mut y = inner.y;

        let input_line = Line::from(vec![
            Span::raw("  "),
            Span::styled(self.input, Style::default().fg(Color::White).add_modifier(Modifier::UNDERLINED)),
            Span::styled("_", Style::default().fg(Color::Cyan)),
        ]);
        buf.set_line(inner.x, y, &input_line, inner.width);
        y += 1;

        let has_results = !self.results.is_empty();
        if has_results && y < bottom {
            buf.set_string(
                inner.x,
                y,
                "─".repeat(inner.width as usize),
                Style::default().fg(Color::DarkGray),
            );
            y += 1;

            let visible_count = self.results.len().min(MAX_VISIBLE_RESULTS);
            let offset = scroll_offset(self.selected_index.unwrap_or(0), visible_count);
            let has_more_above = offset > 0;
            let has_more_below = offset + visible_count < self.results.len();
            let max_name_width = inner.width.saturating_sub(4) as usize;

            for (display_idx, (i, result)) in self
                .results
                .iter()
                .enumerate()
                .skip(offset)
                .take(visible_count)
                .enumerate()
            {
                if y >= bottom {
                    break;
                }
                let is_selected = self.selected_index == Some(i);
                let prefix = match (is_selected, display_idx) {
                    (_, 0) if has_more_above => "↑ ",
                    (_, d) if d == visible_count - 1 && has_more_below => "↓ ",
                    (true, _) => "▶ ",
                    _ => "  ",
                };

                let mut spans = vec![Span::styled(
                    prefix,
                    Style::default().fg(if is_selected { Color::Cyan } else { Color::DarkGray }),
                )];
                if is_selected {
                    let name: String = self.name(result).chars().take(max_name_width).collect();
                    spans.push(Span::styled(
                        name,
                        Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ));
                } else {
                    spans.extend(self.highlighted_name(result, max_name_width));
                }
                buf.set_line(inner.x, y, &Line::from(spans), inner.width);
                y += 1;
            }
        }

        if y < bottom {
            let hint = if has_results {
                "  ↑↓: select  Enter: show  Esc: cancel"
            } else {
                "  No matches"
            };
            buf.set_string(inner.x, bottom - 1, hint, Style::default().fg(Color::DarkGray));
        }
    }
}

/// Height needed for `result_count` results
pub fn calculate_dropdown_height(result_count: usize) -> u16 {
    // borders + input + hint
    let base_height = 4;
    let results_height = if result_count > 0 {
        // separator + results
        1 + result_count.min(MAX_VISIBLE_RESULTS)
    } else {
        0
    };
    (base_height + results_height) as u16
}
