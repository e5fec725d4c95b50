//! Keybindings

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::Action;
use crate::app::AppMode;

pub fn map_key_to_action(key: KeyEvent, mode: &AppMode) -> Option<Action> {
    match mode {
        AppMode::Normal => map_normal_mode(key),
        AppMode::Help => map_help_mode(key),
        AppMode::Input { .. } => map_input_mode(key),
        AppMode::Pick { .. } => map_pick_mode(key),
        AppMode::Confirm { .. } => map_confirm_mode(key),
        AppMode::Error { .. } => map_error_mode(key),
    }
}

fn map_normal_mode(key: KeyEvent) -> Option<Action> {
    match (key.modifiers, key.code) {
        // Movement
        (KeyModifiers::NONE, KeyCode::Char('j')) | (KeyModifiers::NONE, KeyCode::Down) => {
            Some(Action::MoveDown)
        }
        (KeyModifiers::NONE, KeyCode::Char('k')) | (KeyModifiers::NONE, KeyCode::Up) => {
            Some(Action::MoveUp)
        }

        // Page scroll
        (KeyModifiers::CONTROL, KeyCode::Char('d')) | (KeyModifiers::NONE, KeyCode::PageDown) => {
            Some(Action::PageDown)
        }
        (KeyModifiers::CONTROL, KeyCode::Char('u')) | (KeyModifiers::NONE, KeyCode::PageUp) => {
            Some(Action::PageUp)
        }

        // Top/bottom
        (KeyModifiers::NONE, KeyCode::Char('g')) | (KeyModifiers::NONE, KeyCode::Home) => {
            Some(Action::GoToTop)
        }
        (KeyModifiers::SHIFT, KeyCode::Char('G')) | (KeyModifiers::NONE, KeyCode::End) => {
            Some(Action::GoToBottom)
        }

        // Jump to the current commit (@ works with or without Shift depending on keyboard layout)
        (_, KeyCode::Char('@')) => Some(Action::JumpToCurrent),

        // Branch tip jump
        (KeyModifiers::NONE, KeyCode::Char(']')) | (KeyModifiers::NONE, KeyCode::Tab) => {
            Some(Action::NextBranchTip)
        }
        (KeyModifiers::NONE, KeyCode::Char('[')) | (KeyModifiers::SHIFT, KeyCode::BackTab) => {
            Some(Action::PrevBranchTip)
        }

        // Branches shown
        (KeyModifiers::NONE, KeyCode::Char('s')) | (KeyModifiers::NONE, KeyCode::Right) => {
            Some(Action::OpenHiddenBranches)
        }
        (KeyModifiers::SHIFT, KeyCode::Char('S')) => Some(Action::ShowBranch),
        (KeyModifiers::NONE, KeyCode::Char('x')) | (KeyModifiers::NONE, KeyCode::Left) => {
            Some(Action::HideBranch)
        }
        (KeyModifiers::NONE, KeyCode::Char('a')) => Some(Action::SetAsParent),
        (KeyModifiers::SHIFT, KeyCode::Char('A')) => Some(Action::UnsetAsParent),

        // Git operations
        (KeyModifiers::NONE, KeyCode::Enter) => Some(Action::Checkout),
        (KeyModifiers::NONE, KeyCode::Char('b')) => Some(Action::CreateBranch),
        (KeyModifiers::NONE, KeyCode::Char('d')) => Some(Action::DeleteBranch),
        (KeyModifiers::NONE, KeyCode::Char('c')) => Some(Action::Commit),
        (KeyModifiers::NONE, KeyCode::Char('m')) => Some(Action::Merge),
        (KeyModifiers::NONE, KeyCode::Char('p')) => Some(Action::Push),
        (KeyModifiers::SHIFT, KeyCode::Char('P')) => Some(Action::Pull),
        (KeyModifiers::NONE, KeyCode::Char('f')) => Some(Action::Fetch),

        // UI
        (KeyModifiers::NONE, KeyCode::Char('/')) => Some(Action::Search),
        (KeyModifiers::SHIFT, KeyCode::Char('R')) => Some(Action::Refresh),
        (KeyModifiers::NONE, KeyCode::Char('?')) | (KeyModifiers::SHIFT, KeyCode::Char('?')) => {
            Some(Action::ToggleHelp)
        }
        (KeyModifiers::NONE, KeyCode::Char('q')) | (KeyModifiers::NONE, KeyCode::Esc) => {
            Some(Action::Quit)
        }

        _ => None,
    }
}

fn map_help_mode(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => Some(Action::ToggleHelp),
        _ => None,
    }
}

fn map_input_mode(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Enter => Some(Action::Confirm),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Backspace => Some(Action::InputBackspace),
        KeyCode::Char(c) => Some(Action::InputChar(c)),
        _ => None,
    }
}

fn map_pick_mode(key: KeyEvent) -> Option<Action> {
    match (key.modifiers, key.code) {
        (KeyModifiers::NONE, KeyCode::Up) | (KeyModifiers::CONTROL, KeyCode::Char('k')) => {
            Some(Action::PickUp)
        }
        (KeyModifiers::NONE, KeyCode::Down) | (KeyModifiers::CONTROL, KeyCode::Char('j')) => {
            Some(Action::PickDown)
        }
        (KeyModifiers::NONE, KeyCode::Tab) => Some(Action::PickDown),
        (KeyModifiers::SHIFT, KeyCode::BackTab) => Some(Action::PickUp),
        (_, KeyCode::Enter) => Some(Action::Confirm),
        (_, KeyCode::Esc) => Some(Action::Cancel),
        (_, KeyCode::Backspace) | (_, KeyCode::Delete) => Some(Action::InputBackspace),
        (_, KeyCode::Char(c)) => Some(Action::InputChar(c)),
        _ => None,
    }
}

fn map_confirm_mode(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => Some(Action::Confirm),
        KeyCode::Char('n') | KeyCode::Esc => Some(Action::Cancel),
        _ => None,
    }
}

fn map_error_mode(key: KeyEvent) -> Option<Action> {
    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Some(Action::Cancel),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_normal_mode_keys() {
        let mode = AppMode::Normal;
        assert_eq!(map_key_to_action(key(KeyCode::Char('j')), &mode), Some(Action::MoveDown));
        assert_eq!(map_key_to_action(key(KeyCode::Char('s')), &mode), Some(Action::OpenHiddenBranches));
        assert_eq!(
            map_key_to_action(KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT), &mode),
            Some(Action::ShowBranch)
        );
        assert_eq!(map_key_to_action(key(KeyCode::Char('z')), &mode), None);
    }

    #[test]
    fn test_pick_mode_types_letters() {
        let mode = AppMode::Pick {
            title: String::new(),
            input: String::new(),
            names: Vec::new(),
            results: Vec::new(),
            selected: None,
        };
        assert_eq!(map_key_to_action(key(KeyCode::Char('j')), &mode), Some(Action::InputChar('j')));
        assert_eq!(map_key_to_action(key(KeyCode::Down), &mode), Some(Action::PickDown));
    }
}
