//! Line editor for the prompt row: a multi-line input buffer, paste
//! detection and collapsing, slash-command completion, and submission
//! history, glued together behind one key-event entry point.
//!
//! The composer never talks to the terminal. It reports whether its visible
//! state changed and what the host should do next; painting is the overlay's
//! job and scheduling is the renderer loop's.

mod buffer;
mod history;
mod paste_burst;
mod popup;
mod word_boundary;

use std::time::Instant;

use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::text::Line;

use crate::composer::buffer::InputBuffer;
use crate::composer::buffer::clamp_to_char_boundary;
use crate::composer::history::SubmissionHistory;
use crate::composer::paste_burst::CharOutcome;
use crate::composer::paste_burst::FlushResult;
use crate::composer::paste_burst::PasteBurst;
use crate::composer::popup::CommandPopup;
pub use crate::composer::popup::CommandSpec;
use crate::config::RendererConfig;

/// A paste that was folded into a one-line placeholder instead of being
/// spliced into the buffer verbatim. The full text is restored on submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedPaste {
    pub text: String,
    pub line_count: usize,
    pub char_count: usize,
    /// True when the paste hit the byte cap and lost its tail.
    pub truncated: bool,
}

impl CollapsedPaste {
    fn placeholder(&self) -> String {
        let count = self.line_count;
        let lines = if count == 1 { "line" } else { "lines" };
        let chars = self.char_count;
        let suffix = if self.truncated { ", truncated" } else { "" };
        format!("[pasted {count} {lines}, {chars} chars{suffix}]")
    }
}

/// What a key event asked the host to do.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InputResult {
    Submitted(String),
    Queued(String),
    /// Enter on an empty buffer while a task is running.
    Resume,
    CtrlC {
        had_buffer: bool,
    },
    CtrlD,
    /// Escape that the composer had no use for.
    Esc,
    None,
}

pub(crate) struct Composer {
    buffer: InputBuffer,
    burst: PasteBurst,
    history: SubmissionHistory,
    popup: CommandPopup,
    popup_open: bool,
    /// Token the user dismissed the popup for; suppresses reopening until
    /// the token changes.
    dismissed_query: Option<String>,
    /// Placeholder text paired with the paste it stands for, in insertion
    /// order.
    pending_pastes: Vec<(String, CollapsedPaste)>,
    secret: bool,
    collapse_chars: usize,
    cap_bytes: usize,
}

impl Composer {
    pub(crate) fn new(config: &RendererConfig) -> Self {
        Self {
            buffer: InputBuffer::default(),
            burst: PasteBurst::new(config),
            history: SubmissionHistory::default(),
            popup: CommandPopup::default(),
            popup_open: false,
            dismissed_query: None,
            pending_pastes: Vec::new(),
            secret: false,
            collapse_chars: config.collapse_paste_chars,
            cap_bytes: config.paste_cap_bytes,
        }
    }

    pub(crate) fn text(&self) -> &str {
        self.buffer.text()
    }

    pub(crate) fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    /// True when there is nothing to submit: no text and no collapsed
    /// pastes.
    pub(crate) fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.pending_pastes.is_empty()
    }

    pub(crate) fn set_text(&mut self, text: String, cursor: Option<usize>) {
        self.buffer.set_text(text, cursor);
        self.retain_intact_placeholders();
        self.sync_popup();
    }

    pub(crate) fn set_cursor(&mut self, cursor: usize) {
        self.buffer.set_cursor(cursor);
        self.sync_popup();
    }

    pub(crate) fn set_secret(&mut self, secret: bool) {
        self.secret = secret;
    }

    pub(crate) fn is_secret(&self) -> bool {
        self.secret
    }

    pub(crate) fn set_commands(&mut self, commands: Vec<CommandSpec>) {
        self.popup.set_commands(commands);
        self.sync_popup();
    }

    /// Placeholders currently standing in for collapsed pastes, for the
    /// overlay to restyle.
    pub(crate) fn paste_placeholders(&self) -> Vec<&str> {
        self.pending_pastes
            .iter()
            .map(|(placeholder, _)| placeholder.as_str())
            .collect()
    }

    /// Rendered popup rows, empty when the popup is closed or nothing
    /// matches.
    pub(crate) fn suggestion_rows(&self, max_rows: usize) -> Vec<Line<'static>> {
        if self.popup_open {
            self.popup.rows(max_rows)
        } else {
            Vec::new()
        }
    }

    pub(crate) fn is_capturing_paste(&self) -> bool {
        self.burst.is_capturing()
    }

    /// Earliest instant at which [`Composer::flush_if_due`] could do work.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.burst.next_deadline()
    }

    /// Timer-driven flush of the paste heuristic. Returns true when the
    /// visible state changed.
    pub(crate) fn flush_if_due(&mut self, now: Instant) -> bool {
        let flushed = self.burst.flush_if_due(now);
        self.apply_flush(flushed)
    }

    /// Reset everything except the loaded command list and submission
    /// history.
    pub(crate) fn clear(&mut self) {
        self.buffer.take();
        self.pending_pastes.clear();
        self.burst.clear();
        self.history.reset_navigation();
        self.sync_popup();
    }

    /// Bracketed paste from the terminal. Any bytes the burst heuristic had
    /// accumulated belong in front of the bracketed content.
    pub(crate) fn handle_paste(&mut self, pasted: String) -> bool {
        let combined = match self.burst.take_bracketed_interrupt() {
            Some(mut head) => {
                head.push_str(&pasted);
                head
            }
            None => pasted,
        };
        self.accept_paste_text(combined, false)
    }

    /// Returns the host-facing result and whether a repaint is needed.
    pub(crate) fn handle_key_event(
        &mut self,
        key_event: KeyEvent,
        now: Instant,
        task_running: bool,
    ) -> (InputResult, bool) {
        if key_event.kind == KeyEventKind::Release {
            return (InputResult::None, false);
        }
        match key_event {
            KeyEvent {
                code: KeyCode::Enter,
                modifiers,
                ..
            } if modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) => {
                (InputResult::None, self.insert_newline())
            }
            KeyEvent {
                code: KeyCode::Char('j'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => (InputResult::None, self.insert_newline()),
            KeyEvent {
                code: KeyCode::Enter,
                ..
            } => self.on_enter(now, task_running),
            KeyEvent {
                code: KeyCode::Char('c'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => {
                let had_buffer = !self.is_empty()
                    || self.burst.is_capturing()
                    || self.burst.has_pending();
                self.clear();
                (InputResult::CtrlC { had_buffer }, had_buffer)
            }
            KeyEvent {
                code: KeyCode::Char('d'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => {
                let changed = self.flush_for_edit();
                if self.is_empty() {
                    (InputResult::CtrlD, changed)
                } else {
                    (InputResult::None, self.delete_forward() || changed)
                }
            }
            KeyEvent {
                code: KeyCode::Char('u'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => (InputResult::None, self.kill(InputBuffer::kill_to_line_start)),
            KeyEvent {
                code: KeyCode::Char('k'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => (InputResult::None, self.kill(InputBuffer::kill_to_line_end)),
            KeyEvent {
                code: KeyCode::Char('w'),
                modifiers: KeyModifiers::CONTROL,
                ..
            }
            | KeyEvent {
                code: KeyCode::Backspace,
                modifiers: KeyModifiers::ALT,
                ..
            } => (InputResult::None, self.kill(InputBuffer::delete_word_back)),
            KeyEvent {
                code: KeyCode::Char('a'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => (InputResult::None, self.movement(InputBuffer::move_home)),
            KeyEvent {
                code: KeyCode::Char('e'),
                modifiers: KeyModifiers::CONTROL,
                ..
            } => (InputResult::None, self.movement(InputBuffer::move_end)),
            KeyEvent {
                code: KeyCode::Char(ch),
                modifiers,
                ..
            } if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                (InputResult::None, self.on_printed_char(ch, now))
            }
            KeyEvent {
                code: KeyCode::Backspace,
                ..
            } => {
                let changed = self.flush_for_edit();
                (InputResult::None, self.backspace() || changed)
            }
            KeyEvent {
                code: KeyCode::Delete,
                ..
            } => {
                let changed = self.flush_for_edit();
                (InputResult::None, self.delete_forward() || changed)
            }
            KeyEvent {
                code: KeyCode::Left,
                modifiers,
                ..
            } if modifiers.intersects(KeyModifiers::ALT | KeyModifiers::CONTROL) => {
                (InputResult::None, self.movement(InputBuffer::move_word_left))
            }
            KeyEvent {
                code: KeyCode::Right,
                modifiers,
                ..
            } if modifiers.intersects(KeyModifiers::ALT | KeyModifiers::CONTROL) => {
                (InputResult::None, self.movement(InputBuffer::move_word_right))
            }
            KeyEvent {
                code: KeyCode::Left,
                ..
            } => (InputResult::None, self.movement(InputBuffer::move_left)),
            KeyEvent {
                code: KeyCode::Right,
                ..
            } => (InputResult::None, self.movement(InputBuffer::move_right)),
            KeyEvent {
                code: KeyCode::Home,
                ..
            } => (InputResult::None, self.movement(InputBuffer::move_home)),
            KeyEvent {
                code: KeyCode::End, ..
            } => (InputResult::None, self.movement(InputBuffer::move_end)),
            KeyEvent {
                code: KeyCode::Up, ..
            } => (InputResult::None, self.on_up()),
            KeyEvent {
                code: KeyCode::Down,
                ..
            } => (InputResult::None, self.on_down()),
            KeyEvent {
                code: KeyCode::Tab, ..
            } => {
                if self.popup_open && self.popup.has_matches() {
                    self.complete_selected();
                    (InputResult::None, true)
                } else {
                    (InputResult::None, false)
                }
            }
            KeyEvent {
                code: KeyCode::Esc, ..
            } => {
                if self.popup_open {
                    self.dismissed_query = self.active_command_token();
                    self.popup_open = false;
                    (InputResult::None, true)
                } else {
                    (InputResult::Esc, false)
                }
            }
            _ => (InputResult::None, false),
        }
    }

    fn on_enter(&mut self, now: Instant, task_running: bool) -> (InputResult, bool) {
        // Enter arriving mid-burst is pasted content, not a submit.
        if self.burst.on_newline(now) {
            return (InputResult::None, false);
        }
        let changed = self.flush_for_edit();
        // A pending collapsed paste outranks a highlighted suggestion:
        // Enter expands and submits it rather than completing the command.
        if self.popup_open && self.popup.has_matches() && self.pending_pastes.is_empty() {
            self.complete_selected();
            return (InputResult::None, true);
        }
        if self.buffer.text().trim().is_empty() && self.pending_pastes.is_empty() {
            if task_running {
                return (InputResult::Resume, changed);
            }
            return (InputResult::None, changed);
        }
        let text = self.assemble_submission();
        if !self.secret {
            self.history.record(&text);
        }
        self.history.reset_navigation();
        self.sync_popup();
        if task_running {
            (InputResult::Queued(text), true)
        } else {
            (InputResult::Submitted(text), true)
        }
    }

    fn on_printed_char(&mut self, ch: char, now: Instant) -> bool {
        match self.burst.on_char(ch, now) {
            CharOutcome::Captured | CharOutcome::Held => false,
            CharOutcome::CommittedPending(text) => {
                self.buffer.insert_str(&text);
                self.sync_popup();
                true
            }
        }
    }

    fn on_up(&mut self) -> bool {
        if self.popup_open && self.popup.has_matches() {
            self.popup.move_up();
            return true;
        }
        let changed = self.flush_for_edit();
        if self
            .history
            .should_handle_navigation(self.buffer.text(), self.buffer.cursor())
        {
            let current = self.buffer.text().to_string();
            if let Some(text) = self.history.navigate_up(&current) {
                self.buffer.set_text(text, Some(0));
                self.sync_popup();
                return true;
            }
            return changed;
        }
        self.buffer.move_up() || changed
    }

    fn on_down(&mut self) -> bool {
        if self.popup_open && self.popup.has_matches() {
            self.popup.move_down();
            return true;
        }
        let changed = self.flush_for_edit();
        if self
            .history
            .should_handle_navigation(self.buffer.text(), self.buffer.cursor())
        {
            let current = self.buffer.text().to_string();
            if let Some(text) = self.history.navigate_down(&current) {
                self.buffer.set_text(text, Some(0));
                self.sync_popup();
                return true;
            }
            return changed;
        }
        self.buffer.move_down() || changed
    }

    fn insert_newline(&mut self) -> bool {
        self.flush_for_edit();
        self.buffer.insert_str("\n");
        self.sync_popup();
        true
    }

    fn kill(&mut self, op: fn(&mut InputBuffer) -> bool) -> bool {
        let changed = self.flush_for_edit();
        let killed = op(&mut self.buffer);
        if killed {
            self.retain_intact_placeholders();
            self.sync_popup();
        }
        killed || changed
    }

    fn movement(&mut self, op: fn(&mut InputBuffer)) -> bool {
        self.flush_for_edit();
        op(&mut self.buffer);
        self.sync_popup();
        true
    }

    /// Backspace with one special case: when the cursor sits at the end of a
    /// collapsed-paste placeholder, the whole placeholder goes at once and
    /// the paste is discarded.
    fn backspace(&mut self) -> bool {
        let cursor = self.buffer.cursor();
        let hit = self.pending_pastes.iter().position(|(placeholder, _)| {
            self.buffer.text()[..cursor].ends_with(placeholder.as_str())
        });
        if let Some(idx) = hit {
            let start = cursor - self.pending_pastes[idx].0.len();
            self.buffer.remove_range(start, cursor);
            self.pending_pastes.remove(idx);
            self.sync_popup();
            return true;
        }
        let changed = self.buffer.backspace();
        if changed {
            self.retain_intact_placeholders();
            self.sync_popup();
        }
        changed
    }

    fn delete_forward(&mut self) -> bool {
        let cursor = self.buffer.cursor();
        let hit = self.pending_pastes.iter().position(|(placeholder, _)| {
            self.buffer.text()[cursor..].starts_with(placeholder.as_str())
        });
        if let Some(idx) = hit {
            let end = cursor + self.pending_pastes[idx].0.len();
            self.buffer.remove_range(cursor, end);
            self.pending_pastes.remove(idx);
            self.sync_popup();
            return true;
        }
        let changed = self.buffer.delete_forward();
        if changed {
            self.retain_intact_placeholders();
            self.sync_popup();
        }
        changed
    }

    /// Commit or finalize whatever the paste heuristic holds before an edit
    /// that must observe the final buffer.
    fn flush_for_edit(&mut self) -> bool {
        let flushed = self.burst.flush_before_edit();
        self.apply_flush(flushed)
    }

    fn apply_flush(&mut self, flushed: Option<FlushResult>) -> bool {
        match flushed {
            Some(FlushResult::Typed(text)) => {
                self.buffer.insert_str(&text);
                self.sync_popup();
                true
            }
            Some(FlushResult::Paste(chunk)) => self.accept_paste_text(chunk.text, chunk.overflow),
            None => false,
        }
    }

    /// Sanitize, cap, and either splice the paste inline or collapse it into
    /// a placeholder.
    fn accept_paste_text(&mut self, raw: String, overflow: bool) -> bool {
        let mut text = sanitize_pasted(&raw);
        let mut truncated = overflow;
        if text.len() > self.cap_bytes {
            let end = clamp_to_char_boundary(&text, self.cap_bytes);
            text.truncate(end);
            truncated = true;
        }
        if text.is_empty() {
            return false;
        }
        let line_count = text.lines().count().max(1);
        let char_count = text.chars().count();
        if line_count > 1 || char_count > self.collapse_chars {
            let paste = CollapsedPaste {
                text,
                line_count,
                char_count,
                truncated,
            };
            let placeholder = paste.placeholder();
            self.buffer.insert_str(&placeholder);
            self.pending_pastes.push((placeholder, paste));
        } else {
            self.buffer.insert_str(&text);
        }
        self.sync_popup();
        true
    }

    /// Drop paste mappings whose placeholder text no longer survives intact
    /// in the buffer.
    fn retain_intact_placeholders(&mut self) {
        let text = self.buffer.text();
        self.pending_pastes
            .retain(|(placeholder, _)| text.contains(placeholder.as_str()));
    }

    fn assemble_submission(&mut self) -> String {
        let mut text = self.buffer.take();
        for (placeholder, paste) in self.pending_pastes.drain(..) {
            if let Some(at) = text.find(&placeholder) {
                text.replace_range(at..at + placeholder.len(), &paste.text);
            }
        }
        text
    }

    fn complete_selected(&mut self) {
        if let Some(command) = self.popup.selected_command() {
            let name = command.name.clone();
            let text = self.buffer.text();
            let token_end = text[1..]
                .find(char::is_whitespace)
                .map_or(text.len(), |at| at + 1);
            let rest = text[token_end..].to_string();
            let mut new_text = format!("/{name}");
            let cursor = new_text.len();
            if rest.is_empty() {
                new_text.push(' ');
                self.buffer.set_text(new_text, None);
            } else {
                new_text.push_str(&rest);
                self.buffer.set_text(new_text, Some(cursor));
            }
            self.dismissed_query = Some(name);
        }
        self.sync_popup();
    }

    /// The slash-command token under the cursor, if the buffer starts with a
    /// slash and the cursor has not left the token yet.
    fn active_command_token(&self) -> Option<String> {
        let text = self.buffer.text();
        let cursor = self.buffer.cursor();
        let rest = text.strip_prefix('/')?;
        if cursor == 0 {
            return None;
        }
        let token_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        if cursor > 1 + token_len {
            return None;
        }
        Some(rest[..token_len].to_string())
    }

    fn sync_popup(&mut self) {
        match self.active_command_token() {
            Some(token) if self.popup.has_commands() => {
                if self.dismissed_query.as_deref() == Some(token.as_str()) {
                    self.popup_open = false;
                } else {
                    self.dismissed_query = None;
                    self.popup.set_query(&token);
                    self.popup_open = true;
                }
            }
            _ => {
                self.popup_open = false;
                self.dismissed_query = None;
            }
        }
    }
}

/// Normalize line endings and strip escape sequences and stray control
/// bytes from pasted text. Newlines and tabs survive.
fn sanitize_pasted(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\x1b' => skip_escape_sequence(&mut chars),
            '\n' | '\t' => out.push(ch),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn skip_escape_sequence(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    match chars.next() {
        // CSI: parameter and intermediate bytes, then one final byte.
        Some('[') => {
            for c in chars.by_ref() {
                if ('\u{40}'..='\u{7e}').contains(&c) {
                    break;
                }
            }
        }
        // OSC: runs until BEL or ST.
        Some(']') => {
            while let Some(c) = chars.next() {
                if c == '\u{7}' {
                    break;
                }
                if c == '\x1b' {
                    if chars.peek() == Some(&'\\') {
                        chars.next();
                    }
                    break;
                }
            }
        }
        _ => {}
    }
}
