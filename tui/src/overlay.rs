//! Builds the pinned bottom region as plain data.
//!
//! `build_overlay` is a pure function from UI state to an [`OverlayModel`]:
//! a list of styled lines plus the cell where the hardware cursor parks.
//! Nothing here touches the terminal, so every layout rule is testable by
//! inspecting lines. Line order, top to bottom: activity (only while a task
//! runs, or the capture prompt), divider, input rows, divider, inline panel,
//! suggestions, meta line, status line, toggle line, key hints.

use std::borrow::Cow;
use std::ops::Range;
use std::time::Duration;

use crossterm::event::KeyCode;
use itertools::Itertools;
use ratatui::style::Style;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::key_hint;
use crate::status::StatusMeta;
use crate::status::ToggleState;
use crate::ui_consts::INPUT_PREFIX_COLS;
use crate::ui_consts::PROMPT_PREFIX;
use crate::ui_consts::SPINNER_FRAMES;
use crate::wrapping::locate;
use crate::wrapping::prefix_lines;
use crate::wrapping::wrap_ranges;

/// Everything the compositor reads. Borrowed from renderer state; the
/// suggestion rows are already rendered by the popup.
pub(crate) struct OverlayParams<'a> {
    pub width: usize,
    pub input_text: &'a str,
    pub input_cursor: usize,
    pub paste_placeholders: Vec<&'a str>,
    pub secret: bool,
    /// Replaces the activity line while an input capture is in progress.
    pub capture_prompt: Option<&'a str>,
    pub streaming_label: Option<&'a str>,
    pub elapsed: Option<Duration>,
    pub suggestion_rows: Vec<Line<'static>>,
    pub panel: &'a [String],
    pub status_line: Option<&'a str>,
    pub meta: &'a StatusMeta,
    pub toggles: ToggleState,
    pub max_input_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OverlayModel {
    pub lines: Vec<Line<'static>>,
    /// Cell the hardware cursor parks at after painting, relative to the
    /// overlay's first line.
    pub cursor_row: usize,
    pub cursor_col: usize,
}

pub(crate) fn build_overlay(params: OverlayParams<'_>) -> OverlayModel {
    let width = params.width.max(4);
    let mut lines: Vec<Line<'static>> = Vec::new();

    if let Some(prompt) = params.capture_prompt {
        lines.push(truncate_line(
            Line::from(Span::from(prompt.to_string()).cyan().bold()),
            width,
        ));
    } else if let Some(label) = params.streaming_label {
        lines.push(truncate_line(activity_line(label, params.elapsed), width));
    }
    lines.push(divider(width));

    // One column stays reserved so the block cursor drawn past the last
    // grapheme never overflows the row.
    let inner_width = width.saturating_sub(INPUT_PREFIX_COLS + 1).max(1);
    let (display_text, display_cursor) = if params.secret {
        mask_input(params.input_text, params.input_cursor)
    } else {
        (Cow::Borrowed(params.input_text), params.input_cursor)
    };
    let placeholder_ranges = if params.secret {
        Vec::new()
    } else {
        placeholder_ranges(&display_text, &params.paste_placeholders)
    };
    let (mut rows, mut cursor_row, cursor_col) = build_input_rows(
        &display_text,
        display_cursor,
        &placeholder_ranges,
        inner_width,
    );

    let max_rows = params.max_input_rows.max(1);
    let offset = cursor_row
        .saturating_sub(max_rows - 1)
        .min(rows.len().saturating_sub(max_rows));
    if offset > 0 || rows.len() > max_rows {
        rows = rows.into_iter().skip(offset).take(max_rows).collect();
        cursor_row -= offset;
    }
    let rows = prefix_lines(
        rows,
        Span::styled(PROMPT_PREFIX, Style::new().cyan()),
        Span::from("  "),
    );

    let input_start = lines.len();
    lines.extend(rows);
    let cursor_row = input_start + cursor_row;
    let cursor_col = cursor_col + INPUT_PREFIX_COLS;

    lines.push(divider(width));

    for entry in params.panel {
        lines.push(truncate_line(Line::from(entry.clone()), width));
    }
    for row in params.suggestion_rows {
        lines.push(truncate_line(row, width));
    }
    if !params.meta.is_empty() {
        let text = params
            .meta
            .entries()
            .iter()
            .map(|(key, value)| format!("{key} {value}"))
            .join(" · ");
        lines.push(truncate_line(Line::from(Span::from(text).dim()), width));
    }
    if let Some(status) = params.status_line {
        lines.push(truncate_line(
            Line::from(Span::from(status.to_string()).dim()),
            width,
        ));
    }
    lines.push(truncate_line(toggle_line(params.toggles), width));
    lines.push(truncate_line(help_line(), width));

    OverlayModel {
        lines,
        cursor_row,
        cursor_col,
    }
}

fn divider(width: usize) -> Line<'static> {
    Line::from(Span::from("─".repeat(width)).dim())
}

fn activity_line(label: &str, elapsed: Option<Duration>) -> Line<'static> {
    let frame = elapsed
        .map(|e| (e.as_millis() / 100) as usize)
        .unwrap_or_default()
        % SPINNER_FRAMES.len();
    let mut spans = vec![
        Span::from(SPINNER_FRAMES[frame]).cyan(),
        Span::from(" "),
        Span::from(label.to_string()).bold(),
    ];
    if let Some(elapsed) = elapsed {
        spans.push(Span::from(format!(" · {}s", elapsed.as_secs())).dim());
    }
    spans.push(Span::from(format!("  {} to interrupt", key_hint::plain(KeyCode::Esc))).dim());
    Line::from(spans)
}

fn toggle_line(toggles: ToggleState) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let on_off = |on: bool| if on { "on" } else { "off" };
    toggle_item(
        &mut spans,
        key_hint::plain(KeyCode::F(2)),
        format!("verify {}", on_off(toggles.verify)),
        toggles.verify,
    );
    toggle_item(
        &mut spans,
        key_hint::plain(KeyCode::F(3)),
        format!("auto-continue {}", on_off(toggles.auto_continue)),
        toggles.auto_continue,
    );
    toggle_item(
        &mut spans,
        key_hint::plain(KeyCode::F(4)),
        format!("approval {}", toggles.approval),
        toggles.approval == crate::status::ApprovalMode::Auto,
    );
    toggle_item(
        &mut spans,
        key_hint::plain(KeyCode::F(5)),
        format!("dual-rl {}", on_off(toggles.dual_rl)),
        toggles.dual_rl,
    );
    if toggles.thinking == crate::status::ThinkingMode::Deep {
        spans.push(Span::from(" · ").dim());
        spans.push(Span::from("deep").cyan());
    }
    if toggles.debug {
        spans.push(Span::from(" · ").dim());
        spans.push(Span::from("debug").cyan());
    }
    Line::from(spans)
}

fn toggle_item(
    spans: &mut Vec<Span<'static>>,
    binding: key_hint::KeyBinding,
    label: String,
    active: bool,
) {
    if !spans.is_empty() {
        spans.push(Span::from(" · ").dim());
    }
    spans.push(Span::from(binding).dim());
    spans.push(Span::from(" "));
    let label = Span::from(label);
    spans.push(if active { label.cyan() } else { label.dim() });
}

fn help_line() -> Line<'static> {
    let text = format!(
        "{} send · {} newline · {} history · {} clear · {} quit",
        key_hint::plain(KeyCode::Enter),
        key_hint::ctrl(KeyCode::Char('j')),
        key_hint::plain(KeyCode::Up),
        key_hint::ctrl(KeyCode::Char('c')),
        key_hint::ctrl(KeyCode::Char('d')),
    );
    Line::from(Span::from(text).dim())
}

/// Replace every input character with `*` (newlines survive so the row
/// structure stays) and translate the cursor into the masked string.
fn mask_input(text: &str, cursor: usize) -> (Cow<'static, str>, usize) {
    let mut masked = String::with_capacity(text.chars().count());
    let mut masked_cursor = masked.len();
    for (at, ch) in text.char_indices() {
        if at == cursor {
            masked_cursor = masked.len();
        }
        masked.push(if ch == '\n' { '\n' } else { '*' });
    }
    if cursor >= text.len() {
        masked_cursor = masked.len();
    }
    (Cow::Owned(masked), masked_cursor)
}

fn placeholder_ranges(text: &str, placeholders: &[&str]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    for placeholder in placeholders {
        if placeholder.is_empty() {
            continue;
        }
        for (at, _) in text.match_indices(placeholder) {
            ranges.push(at..at + placeholder.len());
        }
    }
    ranges
}

/// Wrap the input into visual rows with the cursor cell drawn reverse-video
/// and collapsed-paste placeholders dimmed. Returns unprefixed rows plus the
/// cursor's (row, col) within them.
fn build_input_rows(
    text: &str,
    cursor: usize,
    placeholder_ranges: &[Range<usize>],
    width: usize,
) -> (Vec<Line<'static>>, usize, usize) {
    let mut rows: Vec<Line<'static>> = Vec::new();
    let mut cursor_row = 0usize;
    let mut cursor_col = 0usize;
    let mut cursor_drawn = false;
    let mut line_start = 0usize;

    for line in text.split('\n') {
        let ranges = wrap_ranges(line, width);
        if cursor >= line_start && cursor <= line_start + line.len() {
            let (row, col) = locate(&ranges, line, cursor - line_start);
            cursor_row = rows.len() + row;
            cursor_col = col;
        }
        for range in &ranges {
            let mut spans: Vec<Span<'static>> = Vec::new();
            let mut run = String::new();
            let mut run_style = Style::new();
            for (rel, grapheme) in line[range.clone()].grapheme_indices(true) {
                let at = line_start + range.start + rel;
                let mut style = Style::new();
                if placeholder_ranges.iter().any(|r| r.contains(&at)) {
                    style = style.dim().italic();
                }
                if at == cursor {
                    style = style.reversed();
                    cursor_drawn = true;
                }
                if style != run_style {
                    if !run.is_empty() {
                        spans.push(Span::styled(std::mem::take(&mut run), run_style));
                    }
                    run_style = style;
                }
                run.push_str(grapheme);
            }
            if !run.is_empty() {
                spans.push(Span::styled(run, run_style));
            }
            rows.push(Line::from(spans));
        }
        line_start += line.len() + 1;
    }

    // Cursor past the last grapheme of its row (end of line or end of
    // buffer): draw it as a reversed blank cell.
    if !cursor_drawn && let Some(row) = rows.get_mut(cursor_row) {
        row.spans
            .push(Span::styled(" ".to_string(), Style::new().reversed()));
    }
    (rows, cursor_row, cursor_col)
}

/// Cut a line down to `width` columns, appending `…` in the style of the
/// span it lands in. Truncation happens span by span so styling never leaks
/// past the cut.
pub(crate) fn truncate_line(line: Line<'static>, width: usize) -> Line<'static> {
    if line.width() <= width {
        return line;
    }
    let avail = width.saturating_sub(1);
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;
    for span in line.spans {
        let span_width = span.content.width();
        if used + span_width <= avail {
            used += span_width;
            spans.push(span);
            continue;
        }
        let mut kept = String::new();
        for grapheme in span.content.graphemes(true) {
            let grapheme_width = grapheme.width();
            if used + grapheme_width > avail {
                break;
            }
            used += grapheme_width;
            kept.push_str(grapheme);
        }
        let style = span.style;
        if !kept.is_empty() {
            spans.push(Span::styled(kept, style));
        }
        spans.push(Span::styled("…", style));
        return Line::from(spans);
    }
    spans.push(Span::from("…"));
    Line::from(spans)
}
