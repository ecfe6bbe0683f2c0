use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Quit,
    /// Run `service.run_cycle`() now
    Refresh,
    /// Send the selected bin to the selected worker
    DispatchSelected,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{BackTab, Char, Down, Enter, Tab, Up};

    // Global quit shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if key.code == Char('q') && key.modifiers.is_empty() {
        return Action::Quit;
    }

    match key.code {
        Tab => {
            app.screen = app.screen.next();
            return Action::None;
        }
        BackTab => {
            app.screen = app.screen.previous();
            return Action::None;
        }
        Char('r') => return Action::Refresh,
        _ => {}
    }

    let mut action = Action::None;

    match app.screen {
        Screen::Bins => match key.code {
            Up | Char('k') => app.move_up(),
            Down | Char('j') => app.move_down(),
            _ => {}
        },

        Screen::Dispatch => match key.code {
            Up | Char('k') => app.move_up(),
            Down | Char('j') => app.move_down(),
            Char('w') => app.cycle_worker(),
            Enter => {
                action = Action::DispatchSelected;
            }
            _ => {}
        },

        Screen::Map | Screen::Routes | Screen::Analytics => {}
    }
    action
}
