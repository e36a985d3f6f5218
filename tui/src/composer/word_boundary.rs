//! Word-boundary helpers for word-wise navigation and deletion.
//!
//! Boundaries are runs of whitespace, runs of separator punctuation, and
//! runs of everything else. Skipping backwards over trailing whitespace
//! before landing on a word start matches shell line-editor behavior for
//! Ctrl+W.

/// ASCII punctuation treated as word separators.
pub(crate) const WORD_SEPARATORS: &str = "`~!@#$%^&*()-=+[{]}\\|;:'\",.<>/?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    start: usize,
    end: usize,
    is_whitespace: bool,
}

/// Byte index of the start of the previous word.
pub(crate) fn beginning_of_previous_word(text: &str, cursor_pos: usize) -> usize {
    let cursor_pos = super::buffer::clamp_to_char_boundary(text, cursor_pos);
    if cursor_pos == 0 {
        return 0;
    }

    let segments = segments(text);
    let Some((probe_idx, _)) = text[..cursor_pos].char_indices().next_back() else {
        return 0;
    };
    let Some(mut segment_idx) = segments
        .iter()
        .position(|s| probe_idx >= s.start && probe_idx < s.end)
    else {
        return 0;
    };

    while segments[segment_idx].is_whitespace {
        if segment_idx == 0 {
            return 0;
        }
        segment_idx -= 1;
    }

    segments[segment_idx].start
}

/// Byte index of the end of the next word.
pub(crate) fn end_of_next_word(text: &str, cursor_pos: usize) -> usize {
    let cursor_pos = super::buffer::clamp_to_char_boundary(text, cursor_pos);
    if cursor_pos >= text.len() {
        return text.len();
    }

    let segments = segments(text);
    let Some(mut segment_idx) = segments.iter().position(|s| s.end > cursor_pos) else {
        return text.len();
    };

    while segments[segment_idx].is_whitespace {
        segment_idx += 1;
        if segment_idx >= segments.len() {
            return text.len();
        }
    }

    segments[segment_idx].end
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RunClass {
    Whitespace,
    Separator,
    Word,
}

fn classify(ch: char) -> RunClass {
    if ch.is_whitespace() {
        RunClass::Whitespace
    } else if WORD_SEPARATORS.contains(ch) {
        RunClass::Separator
    } else {
        RunClass::Word
    }
}

fn segments(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut iter = text.char_indices();
    let Some((_, first)) = iter.next() else {
        return out;
    };

    let mut run_start = 0;
    let mut run_class = classify(first);
    for (idx, ch) in iter {
        let class = classify(ch);
        if class == run_class {
            continue;
        }
        out.push(Segment {
            start: run_start,
            end: idx,
            is_whitespace: run_class == RunClass::Whitespace,
        });
        run_start = idx;
        run_class = class;
    }
    out.push(Segment {
        start: run_start,
        end: text.len(),
        is_whitespace: run_class == RunClass::Whitespace,
    });
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn previous_word_skips_trailing_whitespace() {
        let text = "alpha beta  ";
        assert_eq!(beginning_of_previous_word(text, text.len()), 6);
        assert_eq!(beginning_of_previous_word(text, 6), 0);
        assert_eq!(beginning_of_previous_word(text, 0), 0);
    }

    #[test]
    fn next_word_skips_leading_whitespace() {
        let text = "  alpha beta";
        assert_eq!(end_of_next_word(text, 0), 7);
        assert_eq!(end_of_next_word(text, 7), 12);
        assert_eq!(end_of_next_word(text, 12), 12);
    }

    #[test]
    fn separators_form_their_own_words() {
        let text = "a--b";
        assert_eq!(end_of_next_word(text, 0), 1);
        assert_eq!(end_of_next_word(text, 1), 3);
        assert_eq!(beginning_of_previous_word(text, 4), 3);
        assert_eq!(beginning_of_previous_word(text, 3), 1);
    }

    #[test]
    fn out_of_range_positions_are_clamped() {
        assert_eq!(beginning_of_previous_word("ab", 100), 0);
        assert_eq!(end_of_next_word("ab", 100), 2);
    }
}
