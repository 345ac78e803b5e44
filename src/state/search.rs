// Search tab state.
// The query input box and the results of the last submitted search.

use super::videos::VideoListState;

#[derive(Debug, Clone)]
pub struct SearchTabState {
    /// Text in the search box.
    pub input: String,
    /// Whether keystrokes go to the search box.
    pub editing: bool,
    /// Last submitted query.
    pub query: Option<String>,
    pub results: VideoListState,
}

impl SearchTabState {
    pub fn new(columns: usize) -> Self {
        Self {
            input: String::new(),
            editing: false,
            query: None,
            results: VideoListState::new(columns),
        }
    }

    pub fn start_editing(&mut self) {
        self.editing = true;
    }

    pub fn stop_editing(&mut self) {
        self.editing = false;
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    /// Finish editing and return the trimmed query, if any.
    pub fn submit(&mut self) -> Option<String> {
        self.editing = false;
        let query = self.input.trim();
        if query.is_empty() {
            return None;
        }
        let query = query.to_string();
        self.query = Some(query.clone());
        Some(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_and_submit() {
        let mut search = SearchTabState::new(3);
        search.start_editing();
        for c in " rust tui ".chars() {
            search.push_char(c);
        }
        search.pop_char();
        search.push_char('!');

        assert_eq!(search.submit(), Some("rust tui!".to_string()));
        assert!(!search.editing);
        assert_eq!(search.query.as_deref(), Some("rust tui!"));
    }

    #[test]
    fn test_blank_submit() {
        let mut search = SearchTabState::new(3);
        search.start_editing();
        search.push_char(' ');

        assert_eq!(search.submit(), None);
        assert_eq!(search.query, None);
    }
}
