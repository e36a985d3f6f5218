//! Transcript events pushed by the host application.
//!
//! Each event becomes one block in scrollback. Rendering returns
//! `Vec<Line<'static>>` so the compositor can write blocks above the overlay
//! without knowing anything about event semantics.

use chrono::DateTime;
use chrono::Utc;
use ratatui::style::Style;
use ratatui::style::Stylize;
use ratatui::text::Line;
use ratatui::text::Span;

use crate::ui_consts::BLOCK_INDENT;
use crate::wrapping::prefix_lines;
use crate::wrapping::wrap_styled_text;

/// Canonical event categories. Host-facing strings map onto these via
/// [`EventKind::parse`]; the original raw string is kept alongside on
/// [`UiEvent`] because some raw forms ("banner", "raw", "error") select a
/// different rendition of the same canonical kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum EventKind {
    Prompt,
    Thought,
    Stream,
    Tool,
    ToolResult,
    Build,
    Test,
    Response,
}

impl EventKind {
    /// Map a host-provided type string to a canonical kind. Unknown strings
    /// fall back to `Response` so a misbehaving host still gets its content
    /// on screen.
    pub fn parse(raw: &str) -> EventKind {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "prompt" => EventKind::Prompt,
            "thought" | "thinking" => EventKind::Thought,
            "stream" | "streaming" => EventKind::Stream,
            "tool" | "tool-call" => EventKind::Tool,
            "tool-result" => EventKind::ToolResult,
            "build" => EventKind::Build,
            "test" => EventKind::Test,
            "response" | "banner" | "raw" | "error" => EventKind::Response,
            other => {
                tracing::debug!("unknown event type {other:?}, treating as response");
                EventKind::Response
            }
        }
    }

    /// Small adjacent chunks of these kinds merge into one block before
    /// rendering.
    pub(crate) fn coalesces(self) -> bool {
        matches!(
            self,
            EventKind::Thought | EventKind::Stream | EventKind::Response
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UiEvent {
    pub kind: EventKind,
    /// The type string as the host sent it, after trimming/lowercasing.
    pub raw_kind: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl UiEvent {
    pub fn new(raw_kind: &str, content: impl Into<String>) -> Self {
        let raw_kind = raw_kind.trim().to_ascii_lowercase();
        Self {
            kind: EventKind::parse(&raw_kind),
            raw_kind,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Merge `other` into this event. Inserts a joining newline only when
    /// neither side already provides one, so chunked streams render as a
    /// single block without blank gaps.
    pub(crate) fn absorb(&mut self, other: &UiEvent) {
        if !self.content.ends_with('\n') && !other.content.starts_with('\n') {
            self.content.push('\n');
        }
        self.content.push_str(&other.content);
    }

    /// Render this event as scrollback lines wrapped to `width`.
    ///
    /// `tool_preview` bounds the number of body lines shown for a tool
    /// result; `None` renders the full result (used by expansion).
    pub(crate) fn display_lines(
        &self,
        width: usize,
        tool_preview: Option<usize>,
        show_timestamp: bool,
    ) -> Vec<Line<'static>> {
        let width = width.max(4);
        let body_width = width.saturating_sub(BLOCK_INDENT.len()).max(1);
        let mut lines = match self.kind {
            EventKind::Prompt => prefix_lines(
                wrap_styled_text(&self.content, Style::new(), body_width),
                "> ".cyan().bold(),
                BLOCK_INDENT.into(),
            ),
            EventKind::Thought => {
                let mut out = vec![Line::from("thinking".italic().dim())];
                out.extend(prefix_lines(
                    wrap_styled_text(
                        &self.content,
                        Style::new().dim(),
                        body_width,
                    ),
                    BLOCK_INDENT.into(),
                    BLOCK_INDENT.into(),
                ));
                out
            }
            EventKind::Stream => {
                wrap_styled_text(&self.content, Style::new(), width)
            }
            EventKind::Tool => prefix_lines(
                wrap_styled_text(
                    &self.content,
                    Style::new().magenta(),
                    body_width,
                ),
                "• ".dim(),
                BLOCK_INDENT.into(),
            ),
            EventKind::ToolResult => self.tool_result_lines(body_width, tool_preview),
            EventKind::Build => {
                let mut out = vec![Line::from("build".bold())];
                out.extend(prefix_lines(
                    wrap_styled_text(
                        &self.content,
                        Style::new().dim(),
                        body_width,
                    ),
                    BLOCK_INDENT.into(),
                    BLOCK_INDENT.into(),
                ));
                out
            }
            EventKind::Test => {
                let mut out = vec![Line::from("test".bold())];
                out.extend(prefix_lines(
                    wrap_styled_text(
                        &self.content,
                        Style::new().dim(),
                        body_width,
                    ),
                    BLOCK_INDENT.into(),
                    BLOCK_INDENT.into(),
                ));
                out
            }
            EventKind::Response => match self.raw_kind.as_str() {
                "banner" => {
                    wrap_styled_text(&self.content, Style::new().bold(), width)
                }
                "raw" => wrap_styled_text(&self.content, Style::new(), width),
                "error" => prefix_lines(
                    wrap_styled_text(&self.content, Style::new().red(), body_width),
                    "error: ".red().bold(),
                    BLOCK_INDENT.into(),
                ),
                _ => prefix_lines(
                    wrap_styled_text(&self.content, Style::new(), body_width),
                    "• ".dim(),
                    BLOCK_INDENT.into(),
                ),
            },
        };

        if show_timestamp && let Some(first) = lines.first_mut() {
            let stamp: Span<'static> = format!("[{}] ", self.timestamp.format("%H:%M:%S")).dim();
            let mut spans = vec![stamp];
            spans.append(&mut first.spans);
            *first = Line::from(spans);
        }
        lines
    }

    fn tool_result_lines(&self, body_width: usize, preview: Option<usize>) -> Vec<Line<'static>> {
        let body = wrap_styled_text(
            &self.content,
            Style::new().dim(),
            body_width,
        );
        let total = body.len();
        let shown = match preview {
            Some(limit) if total > limit => limit,
            _ => total,
        };
        let mut out = prefix_lines(
            body.into_iter().take(shown).collect(),
            BLOCK_INDENT.into(),
            BLOCK_INDENT.into(),
        );
        if shown < total {
            let hidden = total - shown;
            out.push(Line::from(
                format!("{BLOCK_INDENT}… +{hidden} lines (ctrl+o to expand)")
                    .dim()
                    .italic(),
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(EventKind::parse("streaming"), EventKind::Stream);
        assert_eq!(EventKind::parse("tool-call"), EventKind::Tool);
        assert_eq!(EventKind::parse("tool_result"), EventKind::ToolResult);
        assert_eq!(EventKind::parse("BANNER"), EventKind::Response);
        assert_eq!(EventKind::parse("error"), EventKind::Response);
        assert_eq!(EventKind::parse("nonsense"), EventKind::Response);
    }

    #[test]
    fn kind_displays_kebab_case() {
        assert_eq!(EventKind::ToolResult.to_string(), "tool-result");
    }

    #[test]
    fn absorb_joins_with_a_single_newline() {
        let mut a = UiEvent::new("response", "a");
        a.absorb(&UiEvent::new("response", "b"));
        assert_eq!(a.content, "a\nb");

        let mut c = UiEvent::new("response", "c\n");
        c.absorb(&UiEvent::new("response", "d"));
        assert_eq!(c.content, "c\nd");

        let mut e = UiEvent::new("response", "e");
        e.absorb(&UiEvent::new("response", "\nf"));
        assert_eq!(e.content, "e\nf");
    }

    #[test]
    fn prompt_lines_carry_the_glyph() {
        let event = UiEvent::new("prompt", "fix bug");
        let lines = event.display_lines(40, None, false);
        assert_eq!(lines[0].to_string(), "> fix bug");
    }

    #[test]
    fn tool_result_preview_elides_long_output() {
        let content = (1..=8).map(|i| format!("line {i}")).collect::<Vec<_>>();
        let event = UiEvent::new("tool-result", content.join("\n"));
        let lines = event.display_lines(40, Some(5), false);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[5].to_string(), "  … +3 lines (ctrl+o to expand)");

        let full = event.display_lines(40, None, false);
        assert_eq!(full.len(), 8);
    }

    #[test]
    fn error_lines_use_the_error_prefix() {
        let event = UiEvent::new("error", "boom");
        let lines = event.display_lines(40, None, false);
        assert_eq!(lines[0].to_string(), "error: boom");
    }
}
