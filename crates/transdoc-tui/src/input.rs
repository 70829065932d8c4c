use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::action::Action;

/// Map a crossterm terminal event to a TUI action.
///
/// While `editing` is set, printable keys go into the destination buffer instead
/// of being read as shortcuts.
pub fn map_event(event: &Event, editing: bool) -> Action {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            if editing {
                map_edit_key(key)
            } else {
                map_key(key)
            }
        }
        Event::Resize(w, h) => Action::Resize(*w, *h),
        _ => Action::None,
    }
}

fn map_key(key: &KeyEvent) -> Action {
    // Ctrl+C always quits
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
        KeyCode::Enter => Action::DrillIn,
        KeyCode::Esc => Action::NavigateBack,
        KeyCode::Char('g') => Action::GoTop,
        KeyCode::Char('G') => Action::GoBottom,
        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Save,
        KeyCode::Char('b') => Action::LoadBlocks,
        KeyCode::Char('t') => Action::Translate,
        KeyCode::Char('e') => Action::Edit,
        KeyCode::Char('x') => Action::Export,
        KeyCode::Char('?') => Action::ToggleHelp,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::PageDown,
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::Home => Action::GoTop,
        KeyCode::End => Action::GoBottom,
        _ => Action::None,
    }
}

fn map_edit_key(key: &KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Action::Quit,
            KeyCode::Char('s') => Action::Save,
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Esc => Action::NavigateBack,
        KeyCode::Enter => Action::Newline,
        KeyCode::Backspace => Action::Backspace,
        KeyCode::Char(c) => Action::InsertChar(c),
        _ => Action::None,
    }
}
