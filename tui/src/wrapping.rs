//! Width-aware wrapping helpers.
//!
//! Two flavors live here. [`wrap_ranges`] wraps a single logical line and
//! returns byte ranges into the original string; the input block uses it for
//! both display and cursor mapping so the highlighted cell always tracks the
//! logical cursor. [`wrap_styled_text`] wraps whole transcript blocks via
//! `textwrap` where no cursor mapping is needed.

use std::ops::Range;

use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use textwrap::Options;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

/// Greedy word wrap of one logical line (no embedded newlines) to `width`
/// columns. Returns contiguous byte ranges, one per visual row; every byte
/// offset of `text` falls inside exactly one range, so a linear cursor can be
/// mapped to (row, column) by walking the same ranges used for rendering.
///
/// Breaks prefer the position after the last space on the row; a word wider
/// than the whole row is split mid-word. Always returns at least one
/// (possibly empty) range.
pub(crate) fn wrap_ranges(text: &str, width: usize) -> Vec<Range<usize>> {
    let width = width.max(1);
    let mut rows: Vec<Range<usize>> = Vec::new();
    let mut row_start = 0usize;
    let mut row_width = 0usize;
    // Byte offset just past the most recent space on the current row.
    let mut break_at: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        let ch_width = ch.width().unwrap_or(0);
        if row_width + ch_width > width && row_width > 0 {
            // Only break at the space if the carried remainder still fits.
            let split = match break_at {
                Some(at) if at > row_start && text[at..idx].width() + ch_width <= width => at,
                _ => idx,
            };
            rows.push(row_start..split);
            row_start = split;
            row_width = text[row_start..idx].width() + ch_width;
            break_at = None;
        } else {
            row_width += ch_width;
        }
        if ch == ' ' {
            break_at = Some(idx + ch.len_utf8());
        }
    }
    rows.push(row_start..text.len());
    rows
}

/// Locate the visual position of a byte offset within wrapped rows.
/// `cursor` may equal `text.len()`; offsets at a row boundary belong to the
/// start of the following row.
pub(crate) fn locate(rows: &[Range<usize>], text: &str, cursor: usize) -> (usize, usize) {
    for (i, row) in rows.iter().enumerate() {
        let is_last = i + 1 == rows.len();
        if cursor < row.end || (is_last && cursor >= row.end) {
            let col = text[row.start..cursor.min(row.end).max(row.start)].width();
            return (i, col);
        }
    }
    (0, 0)
}

/// Wrap a plain text block (may contain newlines) into uniformly styled
/// lines. Empty logical lines are preserved as empty rows.
pub(crate) fn wrap_styled_text(text: &str, style: Style, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let options = Options::new(width).break_words(true);
    let mut out: Vec<Line<'static>> = Vec::new();
    for logical in text.split('\n') {
        if logical.is_empty() {
            out.push(Line::from(Span::styled(String::new(), style)));
            continue;
        }
        for row in textwrap::wrap(logical, &options) {
            out.push(Line::from(Span::styled(row.into_owned(), style)));
        }
    }
    out
}

/// Prepend `initial` to the first line and `subsequent` to the rest.
pub(crate) fn prefix_lines(
    lines: Vec<Line<'static>>,
    initial: Span<'static>,
    subsequent: Span<'static>,
) -> Vec<Line<'static>> {
    lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let prefix = if i == 0 {
                initial.clone()
            } else {
                subsequent.clone()
            };
            let mut spans = vec![prefix];
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn row_strs<'a>(text: &'a str, rows: &[Range<usize>]) -> Vec<&'a str> {
        rows.iter().map(|r| &text[r.clone()]).collect()
    }

    #[test]
    fn wraps_at_spaces() {
        let text = "alpha beta gamma";
        let rows = wrap_ranges(text, 10);
        assert_eq!(row_strs(text, &rows), vec!["alpha ", "beta gamma"]);
    }

    #[test]
    fn splits_words_wider_than_the_row() {
        let text = "abcdefghij";
        let rows = wrap_ranges(text, 4);
        assert_eq!(row_strs(text, &rows), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn empty_text_yields_one_empty_row() {
        assert_eq!(wrap_ranges("", 8), vec![0..0]);
    }

    #[test]
    fn ranges_are_contiguous_and_cover_the_text() {
        let text = "the quick brown fox jumps over the lazy dog";
        for width in 1..=12 {
            let rows = wrap_ranges(text, width);
            assert_eq!(rows[0].start, 0);
            assert_eq!(rows[rows.len() - 1].end, text.len());
            for pair in rows.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn locate_maps_offsets_to_rows() {
        let text = "alpha beta";
        let rows = wrap_ranges(text, 6);
        assert_eq!(row_strs(text, &rows), vec!["alpha ", "beta"]);
        assert_eq!(locate(&rows, text, 0), (0, 0));
        assert_eq!(locate(&rows, text, 5), (0, 5));
        // Offset at the boundary belongs to the next row.
        assert_eq!(locate(&rows, text, 6), (1, 0));
        assert_eq!(locate(&rows, text, 10), (1, 4));
    }

    #[test]
    fn space_break_is_skipped_when_the_remainder_would_overflow() {
        // Breaking after the leading space would carry "bcd" plus a
        // two-column char onto one row; the row must stay within width.
        let text = " bcd日x";
        let rows = wrap_ranges(text, 4);
        for row in &rows {
            assert!(text[row.clone()].width() <= 4);
        }
        assert_eq!(row_strs(text, &rows), vec![" bcd", "日x"]);
    }

    #[test]
    fn locate_handles_wide_characters() {
        let text = "日本語";
        let rows = wrap_ranges(text, 4);
        assert_eq!(row_strs(text, &rows), vec!["日本", "語"]);
        assert_eq!(locate(&rows, text, 3), (0, 2));
        assert_eq!(locate(&rows, text, 6), (1, 0));
    }

    #[test]
    fn styled_wrap_preserves_empty_lines() {
        let lines = wrap_styled_text("a\n\nb", Style::default(), 10);
        let texts: Vec<String> = lines.iter().map(ToString::to_string).collect();
        assert_eq!(texts, vec!["a", "", "b"]);
    }
}
