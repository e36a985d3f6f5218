//! Renderer tuning knobs.
//!
//! Paste-burst timing is empirical: the defaults below were chosen against
//! common terminal emulators and are deliberately configuration, not
//! invariants. Hosts that embed the renderer can override any of them by
//! deserializing a partial JSON object; unspecified fields keep their
//! defaults.

use std::time::Duration;

use serde::Deserialize;

/// All tunable thresholds for input handling and painting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RendererConfig {
    /// Rolling window for the plain-text paste heuristic, in milliseconds.
    /// Characters arriving further apart than this are treated as typing.
    pub paste_window_ms: u64,
    /// Number of characters inside the rolling window that classifies the
    /// burst as a paste.
    pub paste_trigger_chars: usize,
    /// Quiet time after which an in-flight heuristic paste is finalized.
    pub paste_idle_ms: u64,
    /// How long printed characters sit in the pending-insert buffer before
    /// they are committed to the input buffer. Keeps the head of a paste
    /// from flickering into view as ordinary keystrokes.
    pub pending_insert_ms: u64,
    /// Single-line pastes longer than this many characters are collapsed
    /// into a placeholder instead of being inserted inline.
    pub collapse_paste_chars: usize,
    /// Hard cap on accumulated paste bytes. Input beyond the cap is dropped
    /// and the collapsed paste is marked truncated.
    pub paste_cap_bytes: usize,
    /// Minimum interval between overlay repaints (trailing-edge throttle).
    pub frame_interval_ms: u64,
    /// Animation tick for the activity spinner.
    pub spinner_interval_ms: u64,
    /// Maximum visual rows the input block may occupy before it scrolls.
    pub max_input_rows: usize,
    /// Maximum autocomplete suggestions shown below the input.
    pub max_suggestion_rows: usize,
    /// Lines of a tool result shown inline before it is elided.
    pub tool_result_preview_lines: usize,
    /// Force line-at-a-time plain output even on a real terminal.
    pub force_plain: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            paste_window_ms: 60,
            paste_trigger_chars: 24,
            paste_idle_ms: 24,
            pending_insert_ms: 25,
            collapse_paste_chars: 200,
            paste_cap_bytes: 10 * 1024 * 1024,
            frame_interval_ms: 16,
            spinner_interval_ms: 100,
            max_input_rows: 6,
            max_suggestion_rows: 5,
            tool_result_preview_lines: 5,
            force_plain: false,
        }
    }
}

impl RendererConfig {
    pub(crate) fn paste_window(&self) -> Duration {
        Duration::from_millis(self.paste_window_ms)
    }

    pub(crate) fn paste_idle(&self) -> Duration {
        Duration::from_millis(self.paste_idle_ms)
    }

    pub(crate) fn pending_insert_hold(&self) -> Duration {
        Duration::from_millis(self.pending_insert_ms)
    }

    pub(crate) fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub(crate) fn spinner_interval(&self) -> Duration {
        Duration::from_millis(self.spinner_interval_ms)
    }
}
