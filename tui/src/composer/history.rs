//! Shell-style history navigation (Up/Down) for the composer.
//!
//! Decoupled from the widget so the navigation rules stay testable. History
//! is session-local: entries live only as long as the renderer.

/// Tracks recorded submissions and the user's position while browsing them.
#[derive(Debug, Default)]
pub(crate) struct SubmissionHistory {
    entries: Vec<String>,

    /// Current position within `entries`. `None` means the user is not
    /// browsing history.
    cursor: Option<usize>,

    /// The text most recently inserted into the composer by navigation.
    /// Further Up/Down presses only count as navigation while the buffer
    /// still matches this, so regular editing is never hijacked.
    last_recalled: Option<String>,
}

const MAX_ENTRIES: usize = 500;

impl SubmissionHistory {
    /// Record a submitted message so it can be recalled later.
    pub(crate) fn record(&mut self, text: &str) {
        self.cursor = None;
        self.last_recalled = None;
        if text.is_empty() {
            return;
        }
        if self.entries.last().is_some_and(|prev| prev == text) {
            return;
        }
        self.entries.push(text.to_string());
        if self.entries.len() > MAX_ENTRIES {
            let drop_count = self.entries.len() - MAX_ENTRIES;
            self.entries.drain(0..drop_count);
        }
    }

    /// Forget the browsing position; the next Up resumes from the newest
    /// entry.
    pub(crate) fn reset_navigation(&mut self) {
        self.cursor = None;
        self.last_recalled = None;
    }

    /// Should Up/Down be interpreted as history navigation for the current
    /// buffer state?
    pub(crate) fn should_handle_navigation(&self, text: &str, cursor: usize) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        if text.is_empty() {
            return true;
        }
        if cursor != 0 {
            return false;
        }
        matches!(&self.last_recalled, Some(prev) if prev == text)
    }

    /// Handle Up. Returns the text to load into the buffer.
    pub(crate) fn navigate_up(&mut self, current_text: &str) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let mut next = match self.cursor {
            None => self.entries.len() - 1,
            Some(0) => return None,
            Some(idx) => idx - 1,
        };
        loop {
            let entry = &self.entries[next];
            if entry != current_text {
                self.cursor = Some(next);
                self.last_recalled = Some(entry.clone());
                return Some(entry.clone());
            }
            if next == 0 {
                return None;
            }
            next -= 1;
        }
    }

    /// Handle Down. Returns `Some(String::new())` when navigation walks off
    /// the newest entry, restoring an empty buffer.
    pub(crate) fn navigate_down(&mut self, current_text: &str) -> Option<String> {
        let mut next = match self.cursor {
            None => return None,
            Some(idx) if idx + 1 >= self.entries.len() => {
                self.reset_navigation();
                return Some(String::new());
            }
            Some(idx) => idx + 1,
        };
        while next < self.entries.len() {
            let entry = &self.entries[next];
            if entry != current_text {
                self.cursor = Some(next);
                self.last_recalled = Some(entry.clone());
                return Some(entry.clone());
            }
            next += 1;
        }
        self.reset_navigation();
        Some(String::new())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn duplicate_and_empty_submissions_are_not_recorded() {
        let mut history = SubmissionHistory::default();
        history.record("");
        history.record("hello");
        history.record("hello");
        history.record("world");
        assert_eq!(history.entries, vec!["hello", "world"]);
    }

    #[test]
    fn navigation_skips_the_current_text() {
        let mut history = SubmissionHistory::default();
        history.record("same");
        history.record("newer");
        history.record("same");

        assert!(history.should_handle_navigation("", 0));
        assert_eq!(history.navigate_up(""), Some("same".to_string()));

        assert!(history.should_handle_navigation("same", 0));
        assert_eq!(history.navigate_up("same"), Some("newer".to_string()));
    }

    #[test]
    fn down_past_newest_restores_an_empty_buffer() {
        let mut history = SubmissionHistory::default();
        history.record("one");
        assert_eq!(history.navigate_up(""), Some("one".to_string()));
        assert_eq!(history.navigate_down("one"), Some(String::new()));
        // No longer browsing.
        assert_eq!(history.navigate_down("one"), None);
    }

    #[test]
    fn editing_recalled_text_stops_navigation() {
        let mut history = SubmissionHistory::default();
        history.record("recall");
        assert_eq!(history.navigate_up(""), Some("recall".to_string()));
        // Buffer was edited: no longer matches the recalled text.
        assert!(!history.should_handle_navigation("recall edited", 0));
        // Cursor away from the start also disables navigation.
        assert!(!history.should_handle_navigation("recall", 3));
    }

    #[test]
    fn record_caps_the_entry_count() {
        let mut history = SubmissionHistory::default();
        for idx in 0..(MAX_ENTRIES + 10) {
            history.record(&format!("cmd {idx}"));
        }
        assert_eq!(history.entries.len(), MAX_ENTRIES);
        assert_eq!(history.entries[0], "cmd 10");
    }
}
