//! UI components

pub mod commit_detail;
pub mod dialog;
pub mod graph_view;
pub mod help_popup;
pub mod search_dropdown;
pub mod status_bar;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use crate::app::{App, AppMode, InputAction};
use crate::git::GitSource;

use self::{
    commit_detail::CommitDetailWidget,
    dialog::{ConfirmDialog, InputDialog},
    graph_view::GraphViewWidget,
    help_popup::HelpPopup,
    search_dropdown::{calculate_dropdown_height, SearchDropdown},
    status_bar::StatusBar,
};

/// Draw the main UI
pub fn draw<S: GitSource + 'static>(frame: &mut Frame, app: &mut App<S>) {
    let area = frame.area();

    // Main area + status bar (1 line)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    // Graph (65%) over commit detail (35%)
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(vertical[0]);

    let graph = GraphViewWidget::new(app, main[0].width);
    frame.render_stateful_widget(graph, main[0], &mut app.graph_list_state);
    frame.render_widget(CommitDetailWidget::new(app), main[1]);
    frame.render_widget(StatusBar::new(app), vertical[1]);

    match &app.mode {
        AppMode::Help => {
            frame.render_widget(HelpPopup, centered_rect(60, 80, area));
        }
        AppMode::Input { title, input, action } => {
            let dialog = InputDialog::new(title, input);
            let dialog = match action {
                InputAction::Search => dialog.hint("Matches subject, id, author or tag"),
                _ => dialog,
            };
            frame.render_widget(dialog, fixed_height_rect(50, 6, area));
        }
        AppMode::Pick {
            title,
            input,
            names,
            results,
            selected,
        } => {
            let height = calculate_dropdown_height(results.len());
            frame.render_widget(
                SearchDropdown::new(title, input, results, names, *selected),
                fixed_height_rect(50, height, area),
            );
        }
        AppMode::Confirm { message, .. } => {
            frame.render_widget(ConfirmDialog::new(message), fixed_height_rect(50, 6, area));
        }
        _ => {}
    }
}

/// Compute a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    horizontal_center(percent_x, popup_layout[1])
}

/// Centered rectangle of a fixed number of lines
fn fixed_height_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let height = height.min(area.height);
    let row = Rect {
        y: area.y + (area.height - height) / 2,
        height,
        ..area
    };
    horizontal_center(percent_x, row)
}

fn horizontal_center(percent_x: u16, area: Rect) -> Rect {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area)[1]
}
