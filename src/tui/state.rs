use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::registry::CommandStatus;
use crate::runner::UpdateEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
}

/// Dashboard-private state: selection, interaction mode, search query and
/// end-of-run tracking. Everything displayed about the commands themselves
/// is read from the registry at render time.
pub struct ViewState {
    pub selected: usize,
    pub mode: InputMode,
    pub query: String,
    pub min_sidebar_width: u16,
    command_count: usize,
    completed: usize,
}

impl ViewState {
    pub fn new(command_count: usize, min_sidebar_width: u16) -> Self {
        Self {
            selected: 0,
            mode: InputMode::Normal,
            query: String::new(),
            min_sidebar_width,
            command_count,
            completed: 0,
        }
    }

    /// React to a terminal event. Returns true when the dashboard should
    /// exit. Resize events need no bookkeeping: reaching the event loop at
    /// all forces a redraw, and the renderer reads the new size from the
    /// frame.
    pub fn handle_event(&mut self, event: &Event) -> bool {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            _ => false,
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        // Interrupt quits from either mode.
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        match self.mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Search => self.handle_search_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.command_count {
                    self.selected += 1;
                }
            }
            KeyCode::Char('/') => {
                self.mode = InputMode::Search;
                self.query.clear();
            }
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.query.clear();
                self.mode = InputMode::Normal;
            }
            // Commit: back to Normal, query stays active as the filter.
            KeyCode::Enter => self.mode = InputMode::Normal,
            KeyCode::Backspace => {
                self.query.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.query.push(c);
            }
            _ => {}
        }
        false
    }

    /// Fold in an update event. Returns true when the dashboard should exit:
    /// every command completed, or (under fail-fast) any command failed.
    pub fn apply_update(&mut self, event: &UpdateEvent, fail_fast: bool) -> bool {
        if let UpdateEvent::Completed { status, .. } = event {
            self.completed += 1;
            if fail_fast && *status == CommandStatus::Failed {
                return true;
            }
            if self.completed >= self.command_count {
                return true;
            }
        }
        false
    }
}

/// Case-insensitive substring filter over captured output lines. An empty
/// query passes everything through.
pub fn filter_lines<'a>(output: &'a [String], query: &str) -> Vec<&'a str> {
    if query.is_empty() {
        return output.iter().map(String::as_str).collect();
    }
    let needle = query.to_lowercase();
    output
        .iter()
        .filter(|line| line.to_lowercase().contains(&needle))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn view(count: usize) -> ViewState {
        ViewState::new(count, 20)
    }

    #[test]
    fn down_at_last_index_stays_in_range() {
        let mut v = view(3);
        v.selected = 2;
        v.handle_key(&key(KeyCode::Down));
        assert_eq!(v.selected, 2);
    }

    #[test]
    fn up_at_first_index_stays_at_zero() {
        let mut v = view(3);
        v.handle_key(&key(KeyCode::Up));
        assert_eq!(v.selected, 0);
    }

    #[test]
    fn vim_keys_navigate() {
        let mut v = view(3);
        v.handle_key(&key(KeyCode::Char('j')));
        v.handle_key(&key(KeyCode::Char('j')));
        v.handle_key(&key(KeyCode::Char('k')));
        assert_eq!(v.selected, 1);
    }

    #[test]
    fn slash_enters_search_and_clears_previous_query() {
        let mut v = view(1);
        v.query = "stale".to_string();
        v.handle_key(&key(KeyCode::Char('/')));
        assert_eq!(v.mode, InputMode::Search);
        assert!(v.query.is_empty());
    }

    #[test]
    fn search_typing_appends_and_backspace_pops() {
        let mut v = view(1);
        v.handle_key(&key(KeyCode::Char('/')));
        v.handle_key(&key(KeyCode::Char('e')));
        v.handle_key(&key(KeyCode::Char('r')));
        v.handle_key(&key(KeyCode::Char('r')));
        v.handle_key(&key(KeyCode::Backspace));
        assert_eq!(v.query, "er");
    }

    #[test]
    fn q_is_a_literal_character_in_search_mode() {
        let mut v = view(1);
        v.handle_key(&key(KeyCode::Char('/')));
        let quit = v.handle_key(&key(KeyCode::Char('q')));
        assert!(!quit);
        assert_eq!(v.query, "q");
    }

    #[test]
    fn escape_clears_query_and_leaves_search() {
        let mut v = view(1);
        v.handle_key(&key(KeyCode::Char('/')));
        v.handle_key(&key(KeyCode::Char('x')));
        v.handle_key(&key(KeyCode::Esc));
        assert_eq!(v.mode, InputMode::Normal);
        assert!(v.query.is_empty());
    }

    #[test]
    fn enter_commits_query_and_keeps_it_as_filter() {
        let mut v = view(1);
        v.handle_key(&key(KeyCode::Char('/')));
        v.handle_key(&key(KeyCode::Char('o')));
        v.handle_key(&key(KeyCode::Enter));
        assert_eq!(v.mode, InputMode::Normal);
        assert_eq!(v.query, "o");
    }

    #[test]
    fn ctrl_c_quits_even_in_search_mode() {
        let mut v = view(1);
        v.handle_key(&key(KeyCode::Char('/')));
        let quit = v.handle_key(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(quit);
    }

    #[test]
    fn q_quits_in_normal_mode() {
        let mut v = view(1);
        assert!(v.handle_key(&key(KeyCode::Char('q'))));
    }

    #[test]
    fn exits_once_every_command_completed() {
        let mut v = view(2);
        let first = UpdateEvent::Completed {
            index: 0,
            status: CommandStatus::Success,
            exit_code: 0,
        };
        let second = UpdateEvent::Completed {
            index: 1,
            status: CommandStatus::Success,
            exit_code: 0,
        };
        assert!(!v.apply_update(&first, false));
        assert!(v.apply_update(&second, false));
    }

    #[test]
    fn fail_fast_exits_on_first_failure() {
        let mut v = view(3);
        let failed = UpdateEvent::Completed {
            index: 1,
            status: CommandStatus::Failed,
            exit_code: 2,
        };
        assert!(v.apply_update(&failed, true));
    }

    #[test]
    fn failure_does_not_exit_when_continuing_on_error() {
        let mut v = view(3);
        let failed = UpdateEvent::Completed {
            index: 1,
            status: CommandStatus::Failed,
            exit_code: 2,
        };
        assert!(!v.apply_update(&failed, false));
    }

    #[test]
    fn output_events_never_exit() {
        let mut v = view(1);
        let output = UpdateEvent::OutputAppended {
            index: 0,
            line: "hi".to_string(),
        };
        assert!(!v.apply_update(&output, true));
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let lines = vec![
            "build ok".to_string(),
            "ERROR: missing file".to_string(),
            "done".to_string(),
        ];
        assert_eq!(filter_lines(&lines, "error"), vec!["ERROR: missing file"]);
    }

    #[test]
    fn empty_query_passes_everything() {
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(filter_lines(&lines, ""), vec!["a", "b"]);
    }
}
