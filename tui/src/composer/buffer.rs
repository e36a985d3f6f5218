//! Multi-line input buffer with a byte-offset cursor.
//!
//! The cursor always sits on a character boundary and inside `0..=len`;
//! every mutation re-clamps instead of asserting, because terminal timing
//! can deliver operations against state that changed underneath them
//! (e.g. a host `setBuffer` racing a keystroke).

use unicode_segmentation::UnicodeSegmentation;

use super::word_boundary;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct InputBuffer {
    text: String,
    cursor: usize,
    /// Grapheme column vertical moves try to keep. Cleared by any other
    /// mutation or horizontal move.
    preferred_col: Option<usize>,
}

impl InputBuffer {
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Replace the whole buffer. `cursor` of `None` places the cursor at the
    /// end.
    pub(crate) fn set_text(&mut self, text: String, cursor: Option<usize>) {
        self.text = text;
        self.cursor = cursor.unwrap_or(self.text.len());
        self.preferred_col = None;
        self.clamp_cursor();
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
        self.preferred_col = None;
        self.clamp_cursor();
    }

    /// Clear the buffer and return its contents.
    pub(crate) fn take(&mut self) -> String {
        self.cursor = 0;
        self.preferred_col = None;
        std::mem::take(&mut self.text)
    }

    pub(crate) fn insert_str(&mut self, s: &str) {
        self.clamp_cursor();
        self.text.insert_str(self.cursor, s);
        self.cursor += s.len();
        self.preferred_col = None;
    }

    /// Remove a byte range, leaving the cursor at its start. Out-of-range or
    /// unaligned bounds are clamped.
    pub(crate) fn remove_range(&mut self, start: usize, end: usize) {
        let start = clamp_to_char_boundary(&self.text, start);
        let end = clamp_to_char_boundary(&self.text, end).max(start);
        self.text.replace_range(start..end, "");
        self.cursor = start;
        self.preferred_col = None;
    }

    /// Delete the grapheme before the cursor. Returns false at the start of
    /// the buffer.
    pub(crate) fn backspace(&mut self) -> bool {
        self.clamp_cursor();
        let Some((start, _)) = self.text[..self.cursor].grapheme_indices(true).next_back() else {
            return false;
        };
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
        self.preferred_col = None;
        true
    }

    /// Delete the grapheme after the cursor.
    pub(crate) fn delete_forward(&mut self) -> bool {
        self.clamp_cursor();
        let Some((offset, grapheme)) = self.text[self.cursor..].grapheme_indices(true).next()
        else {
            return false;
        };
        let start = self.cursor + offset;
        self.text.replace_range(start..start + grapheme.len(), "");
        self.preferred_col = None;
        true
    }

    pub(crate) fn move_left(&mut self) {
        self.clamp_cursor();
        if let Some((start, _)) = self.text[..self.cursor].grapheme_indices(true).next_back() {
            self.cursor = start;
        }
        self.preferred_col = None;
    }

    pub(crate) fn move_right(&mut self) {
        self.clamp_cursor();
        if let Some((offset, grapheme)) = self.text[self.cursor..].grapheme_indices(true).next() {
            self.cursor += offset + grapheme.len();
        }
        self.preferred_col = None;
    }

    pub(crate) fn move_word_left(&mut self) {
        self.cursor = word_boundary::beginning_of_previous_word(&self.text, self.cursor);
        self.preferred_col = None;
    }

    pub(crate) fn move_word_right(&mut self) {
        self.cursor = word_boundary::end_of_next_word(&self.text, self.cursor);
        self.preferred_col = None;
    }

    pub(crate) fn move_home(&mut self) {
        self.cursor = self.line_start(self.cursor);
        self.preferred_col = None;
    }

    pub(crate) fn move_end(&mut self) {
        self.cursor = self.line_end(self.cursor);
        self.preferred_col = None;
    }

    /// Move the cursor one logical line up, keeping the column when
    /// possible. Returns false on the first line so the caller can fall
    /// back to history navigation.
    pub(crate) fn move_up(&mut self) -> bool {
        self.clamp_cursor();
        let line_start = self.line_start(self.cursor);
        if line_start == 0 {
            return false;
        }
        let col = self.text[line_start..self.cursor].graphemes(true).count();
        let goal = *self.preferred_col.get_or_insert(col);
        let prev_end = line_start - 1;
        let prev_start = self.line_start(prev_end);
        self.cursor = advance_by_graphemes(&self.text, prev_start, prev_end, goal);
        true
    }

    /// Mirror of [`InputBuffer::move_up`].
    pub(crate) fn move_down(&mut self) -> bool {
        self.clamp_cursor();
        let line_end = self.line_end(self.cursor);
        if line_end == self.text.len() {
            return false;
        }
        let line_start = self.line_start(self.cursor);
        let col = self.text[line_start..self.cursor].graphemes(true).count();
        let goal = *self.preferred_col.get_or_insert(col);
        let next_start = line_end + 1;
        let next_end = self.line_end(next_start);
        self.cursor = advance_by_graphemes(&self.text, next_start, next_end, goal);
        true
    }

    /// Ctrl+U: delete from line start to cursor.
    pub(crate) fn kill_to_line_start(&mut self) -> bool {
        self.clamp_cursor();
        let start = self.line_start(self.cursor);
        if start == self.cursor {
            return false;
        }
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
        self.preferred_col = None;
        true
    }

    /// Ctrl+K: delete from cursor to line end.
    pub(crate) fn kill_to_line_end(&mut self) -> bool {
        self.clamp_cursor();
        let end = self.line_end(self.cursor);
        if end == self.cursor {
            return false;
        }
        self.text.replace_range(self.cursor..end, "");
        self.preferred_col = None;
        true
    }

    /// Ctrl+W / Alt+Backspace: delete the word before the cursor.
    pub(crate) fn delete_word_back(&mut self) -> bool {
        self.clamp_cursor();
        let start = word_boundary::beginning_of_previous_word(&self.text, self.cursor);
        if start == self.cursor {
            return false;
        }
        self.text.replace_range(start..self.cursor, "");
        self.cursor = start;
        self.preferred_col = None;
        true
    }

    fn line_start(&self, pos: usize) -> usize {
        let pos = clamp_to_char_boundary(&self.text, pos);
        self.text[..pos].rfind('\n').map_or(0, |i| i + 1)
    }

    fn line_end(&self, pos: usize) -> usize {
        let pos = clamp_to_char_boundary(&self.text, pos);
        self.text[pos..].find('\n').map_or(self.text.len(), |i| pos + i)
    }

    fn clamp_cursor(&mut self) {
        self.cursor = clamp_to_char_boundary(&self.text, self.cursor);
    }
}

/// Largest char boundary not past `pos`.
pub(crate) fn clamp_to_char_boundary(text: &str, pos: usize) -> usize {
    let mut pos = pos.min(text.len());
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

fn advance_by_graphemes(text: &str, start: usize, end: usize, count: usize) -> usize {
    let mut pos = start;
    for (taken, (offset, grapheme)) in text[start..end].grapheme_indices(true).enumerate() {
        if taken == count {
            return start + offset;
        }
        pos = start + offset + grapheme.len();
    }
    pos.min(end)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn insert_and_backspace_respect_graphemes() {
        let mut buf = InputBuffer::default();
        buf.insert_str("héllo");
        assert_eq!(buf.cursor(), "héllo".len());
        assert!(buf.backspace());
        assert_eq!(buf.text(), "héll");
        buf.set_cursor(0);
        assert!(!buf.backspace());
    }

    #[test]
    fn vertical_moves_keep_the_preferred_column() {
        let mut buf = InputBuffer::default();
        buf.set_text("longest line\nab\nmiddle".into(), None);
        buf.set_cursor("longest line".len());

        assert!(buf.move_down());
        assert_eq!(buf.cursor(), "longest line\nab".len());
        assert!(buf.move_down());
        // Column goal survives crossing the short line.
        assert_eq!(buf.cursor(), "longest line\nab\nmiddle".len());
        assert!(!buf.move_down());
    }

    #[test]
    fn move_up_stops_on_first_line() {
        let mut buf = InputBuffer::default();
        buf.set_text("one\ntwo".into(), Some(5));
        assert!(buf.move_up());
        assert_eq!(buf.cursor(), 1);
        assert!(!buf.move_up());
    }

    #[test]
    fn kill_ops_work_on_the_current_line() {
        let mut buf = InputBuffer::default();
        buf.set_text("first\nsecond line".into(), Some("first\nsecond".len()));
        assert!(buf.kill_to_line_end());
        assert_eq!(buf.text(), "first\nsecond");
        assert!(buf.kill_to_line_start());
        assert_eq!(buf.text(), "first\n");
        assert_eq!(buf.cursor(), "first\n".len());
    }

    #[test]
    fn delete_word_back_eats_trailing_spaces() {
        let mut buf = InputBuffer::default();
        buf.set_text("alpha beta  ".into(), None);
        assert!(buf.delete_word_back());
        assert_eq!(buf.text(), "alpha ");
    }

    #[test]
    fn set_text_clamps_cursor_to_char_boundary() {
        let mut buf = InputBuffer::default();
        // 999 is far past the end; 2 is inside the é.
        buf.set_text("é".into(), Some(999));
        assert_eq!(buf.cursor(), "é".len());
        buf.set_cursor(1);
        assert_eq!(buf.cursor(), 0);
    }

    #[test]
    fn cursor_stays_in_bounds_across_random_operations() {
        let mut buf = InputBuffer::default();
        let ops: Vec<&dyn Fn(&mut InputBuffer)> = vec![
            &|b| b.insert_str("ab"),
            &|b| b.insert_str("日本"),
            &|b| b.insert_str("\n"),
            &|b| {
                b.backspace();
            },
            &|b| {
                b.delete_forward();
            },
            &|b| b.move_left(),
            &|b| b.move_right(),
            &|b| {
                b.move_up();
            },
            &|b| {
                b.move_down();
            },
            &|b| b.move_home(),
            &|b| b.move_end(),
            &|b| {
                b.kill_to_line_start();
            },
            &|b| {
                b.delete_word_back();
            },
        ];
        // Deterministic pseudo-random walk over the op table.
        let mut seed = 0x2545_f491u64;
        for _ in 0..2000 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let op = ops[(seed >> 33) as usize % ops.len()];
            op(&mut buf);
            assert!(buf.cursor() <= buf.text().len());
            assert!(buf.text().is_char_boundary(buf.cursor()));
        }
    }
}
