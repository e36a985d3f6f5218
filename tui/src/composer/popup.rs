//! Slash-command autocomplete popup.
//!
//! Opens while the buffer starts with `/` and the cursor is still inside
//! the command token. Filtering is a case-insensitive subsequence match
//! with a strong bonus for prefix matches; matched characters are
//! highlighted in the rendered rows.

use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;

/// One completable command, provided by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    /// Name without the leading slash.
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct CommandPopup {
    commands: Vec<CommandSpec>,
    query: String,
    selected: usize,
}

impl CommandPopup {
    pub(crate) fn set_commands(&mut self, commands: Vec<CommandSpec>) {
        self.commands = commands;
        self.clamp_selection();
    }

    pub(crate) fn set_query(&mut self, query: &str) {
        if self.query != query {
            self.query = query.to_string();
            self.selected = 0;
        }
        self.clamp_selection();
    }

    pub(crate) fn move_up(&mut self) {
        let len = self.filtered().len();
        if len == 0 {
            return;
        }
        self.selected = if self.selected == 0 {
            len - 1
        } else {
            self.selected - 1
        };
    }

    pub(crate) fn move_down(&mut self) {
        let len = self.filtered().len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected + 1) % len;
    }

    pub(crate) fn selected_command(&self) -> Option<&CommandSpec> {
        let filtered = self.filtered();
        let (idx, _, _) = filtered.get(self.selected)?;
        self.commands.get(*idx)
    }

    pub(crate) fn has_commands(&self) -> bool {
        !self.commands.is_empty()
    }

    pub(crate) fn has_matches(&self) -> bool {
        !self.filtered().is_empty()
    }

    /// Render up to `max_rows` suggestion lines, keeping the selection
    /// visible. The selected row is drawn reversed.
    pub(crate) fn rows(&self, max_rows: usize) -> Vec<Line<'static>> {
        let filtered = self.filtered();
        if filtered.is_empty() || max_rows == 0 {
            return Vec::new();
        }
        let visible = filtered.len().min(max_rows);
        let first = self
            .selected
            .saturating_sub(visible.saturating_sub(1))
            .min(filtered.len() - visible);

        filtered
            .iter()
            .enumerate()
            .skip(first)
            .take(visible)
            .map(|(row_idx, (cmd_idx, indices, _))| {
                let command = &self.commands[*cmd_idx];
                let mut spans: Vec<Span<'static>> = vec!["  /".into()];
                for (char_idx, ch) in command.name.chars().enumerate() {
                    let span = Span::from(ch.to_string());
                    if indices.contains(&char_idx) {
                        spans.push(span.cyan().bold());
                    } else {
                        spans.push(span);
                    }
                }
                if let Some(description) = &command.description {
                    spans.push(Span::from(format!("  {description}")).dim());
                }
                let line = Line::from(spans);
                if row_idx == self.selected {
                    line.reversed()
                } else {
                    line
                }
            })
            .collect()
    }

    fn clamp_selection(&mut self) {
        let len = self.filtered().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    /// Matching command indices with matched character positions, best
    /// score first.
    fn filtered(&self) -> Vec<(usize, Vec<usize>, i32)> {
        let filter = self.query.trim();
        let mut out: Vec<(usize, Vec<usize>, i32)> = Vec::new();
        for (idx, command) in self.commands.iter().enumerate() {
            if let Some((indices, score)) = fuzzy_match(&command.name, filter) {
                out.push((idx, indices, score));
            }
        }
        out.sort_by(|a, b| {
            a.2.cmp(&b.2)
                .then_with(|| self.commands[a.0].name.cmp(&self.commands[b.0].name))
        });
        out
    }
}

/// Case-insensitive subsequence matcher. Returns character positions of the
/// matched characters in `haystack` and a score where smaller is better;
/// matches anchored at the start of the name score far better.
fn fuzzy_match(haystack: &str, needle: &str) -> Option<(Vec<usize>, i32)> {
    if needle.is_empty() {
        return Some((Vec::new(), 0));
    }

    let haystack_chars: Vec<char> = haystack.chars().flat_map(char::to_lowercase).collect();
    let needle_chars: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();

    let mut indices = Vec::with_capacity(needle_chars.len());
    let mut cur = 0usize;
    for &nc in &needle_chars {
        let found = haystack_chars[cur..].iter().position(|&hc| hc == nc)?;
        indices.push(cur + found);
        cur += found + 1;
    }

    let first = indices[0];
    let last = indices[indices.len() - 1];
    let window = (last as i32 - first as i32 + 1) - needle_chars.len() as i32;
    let mut score = window.max(0);
    if first == 0 {
        score -= 100;
    }
    Some((indices, score))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn commands(names: &[&str]) -> Vec<CommandSpec> {
        names
            .iter()
            .map(|name| CommandSpec {
                name: name.to_string(),
                description: None,
            })
            .collect()
    }

    #[test]
    fn prefix_matches_rank_first() {
        let mut popup = CommandPopup::default();
        popup.set_commands(commands(&["retest", "test", "status"]));
        popup.set_query("te");
        assert_eq!(popup.selected_command().map(|c| c.name.as_str()), Some("test"));
    }

    #[test]
    fn selection_wraps_in_both_directions() {
        let mut popup = CommandPopup::default();
        popup.set_commands(commands(&["alpha", "beta"]));
        popup.set_query("");
        popup.move_up();
        assert_eq!(popup.selected_command().map(|c| c.name.as_str()), Some("beta"));
        popup.move_down();
        assert_eq!(
            popup.selected_command().map(|c| c.name.as_str()),
            Some("alpha")
        );
    }

    #[test]
    fn no_match_yields_no_rows() {
        let mut popup = CommandPopup::default();
        popup.set_commands(commands(&["alpha"]));
        popup.set_query("zzz");
        assert!(!popup.has_matches());
        assert!(popup.rows(5).is_empty());
    }

    #[test]
    fn rows_window_keeps_the_selection_visible() {
        let mut popup = CommandPopup::default();
        popup.set_commands(commands(&["a1", "a2", "a3", "a4", "a5"]));
        popup.set_query("");
        popup.move_up(); // wraps to the last entry
        let rows = popup.rows(3);
        assert_eq!(rows.len(), 3);
        let texts: Vec<String> = rows.iter().map(ToString::to_string).collect();
        assert!(texts[2].contains("a5"));
    }

    #[test]
    fn narrowing_the_query_resets_the_selection() {
        let mut popup = CommandPopup::default();
        popup.set_commands(commands(&["alpha", "album"]));
        popup.set_query("al");
        popup.move_down();
        popup.set_query("alp");
        assert_eq!(
            popup.selected_command().map(|c| c.name.as_str()),
            Some("alpha")
        );
    }
}
