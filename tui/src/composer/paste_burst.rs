//! Heuristic detection of pasted input on terminals without bracketed paste.
//!
//! Printed characters are never inserted straight into the buffer: they sit
//! in a short pending hold first. If arrival timing classifies the burst as
//! a paste, the held characters are reclaimed into the paste capture instead
//! of leaking into the visible buffer; otherwise the hold expires and they
//! commit as ordinary typing. All methods take an explicit `now` so the
//! timing rules are testable without real sleeps.
//!
//! Classification rules, checked per character:
//! - a capture already in progress absorbs everything,
//! - crossing the trigger count within the rolling window starts a capture,
//! - a newline while a smaller-but-nonzero burst is live starts a capture
//!   (short pasted first lines would otherwise submit).
//!
//! A capture is finalized after a quiet gap, or immediately when a
//! non-character key interrupts the stream. Bracketed paste markers arriving
//! mid-capture cancel the heuristic and hand its bytes to the caller so the
//! two capture paths never overlap or double-count.

use std::time::Duration;
use std::time::Instant;

use crate::config::RendererConfig;

/// What became of one printed character.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CharOutcome {
    /// Absorbed into an active or newly started paste capture.
    Captured,
    /// Sitting in the pending hold; commit after the hold elapses.
    Held,
    /// A stale pending hold was overdue (its timer lost the race to this
    /// keypress): commit the returned text as typed input, the new
    /// character is now held.
    CommittedPending(String),
}

/// A finished flush, either typed input or a finalized paste.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FlushResult {
    Typed(String),
    Paste(PasteChunk),
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct PasteChunk {
    pub text: String,
    pub overflow: bool,
}

#[derive(Debug)]
struct Capture {
    text: String,
    last_at: Instant,
    overflow: bool,
}

#[derive(Debug)]
pub(crate) struct PasteBurst {
    window: Duration,
    trigger_chars: usize,
    idle: Duration,
    hold: Duration,
    cap_bytes: usize,

    pending: String,
    pending_last: Option<Instant>,
    capture: Option<Capture>,

    /// Characters seen with inter-arrival gaps inside the window.
    burst_len: usize,
    last_char_at: Option<Instant>,
}

impl PasteBurst {
    pub(crate) fn new(config: &RendererConfig) -> Self {
        Self {
            window: config.paste_window(),
            trigger_chars: config.paste_trigger_chars,
            idle: config.paste_idle(),
            hold: config.pending_insert_hold(),
            cap_bytes: config.paste_cap_bytes,
            pending: String::new(),
            pending_last: None,
            capture: None,
            burst_len: 0,
            last_char_at: None,
        }
    }

    pub(crate) fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Feed one printed character.
    pub(crate) fn on_char(&mut self, ch: char, now: Instant) -> CharOutcome {
        self.note_arrival(now);

        if let Some(capture) = &mut self.capture {
            append_capped(capture, ch, self.cap_bytes, now);
            return CharOutcome::Captured;
        }

        let overdue = self
            .pending_last
            .is_some_and(|last| now.saturating_duration_since(last) >= self.hold);
        let committed = if overdue { self.take_pending() } else { None };

        self.pending.push(ch);
        self.pending_last = Some(now);

        if self.burst_len >= self.trigger_chars {
            self.begin_capture(now);
            return CharOutcome::Captured;
        }

        match committed {
            Some(text) => CharOutcome::CommittedPending(text),
            None => CharOutcome::Held,
        }
    }

    /// Feed a newline (Enter in the key stream). Returns true when it was
    /// absorbed as paste content; false means the caller should treat the
    /// key as a submit.
    pub(crate) fn on_newline(&mut self, now: Instant) -> bool {
        if self.capture.is_some() {
            self.note_arrival(now);
        }
        if let Some(capture) = &mut self.capture {
            append_capped(capture, '\n', self.cap_bytes, now);
            return true;
        }
        let burst_live = self
            .last_char_at
            .is_some_and(|last| now.saturating_duration_since(last) <= self.window);
        if !self.pending.is_empty() && burst_live {
            self.note_arrival(now);
            self.begin_capture(now);
            if let Some(capture) = &mut self.capture {
                append_capped(capture, '\n', self.cap_bytes, now);
            }
            return true;
        }
        false
    }

    /// Commit or finalize whatever is in flight because a non-character key
    /// is about to edit the buffer.
    pub(crate) fn flush_before_edit(&mut self) -> Option<FlushResult> {
        if let Some(capture) = self.capture.take() {
            self.reset_window();
            return Some(FlushResult::Paste(PasteChunk {
                text: capture.text,
                overflow: capture.overflow,
            }));
        }
        self.take_pending().map(FlushResult::Typed)
    }

    /// Timer-driven flush: pending holds commit after `hold`, captures
    /// finalize after `idle` without input.
    pub(crate) fn flush_if_due(&mut self, now: Instant) -> Option<FlushResult> {
        if let Some(capture) = &self.capture {
            if now.saturating_duration_since(capture.last_at) >= self.idle {
                let capture = self.capture.take();
                self.reset_window();
                return capture.map(|c| {
                    FlushResult::Paste(PasteChunk {
                        text: c.text,
                        overflow: c.overflow,
                    })
                });
            }
            return None;
        }
        if self
            .pending_last
            .is_some_and(|last| now.saturating_duration_since(last) >= self.hold)
        {
            return self.take_pending().map(FlushResult::Typed);
        }
        None
    }

    /// Earliest instant at which [`PasteBurst::flush_if_due`] could do work.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        if let Some(capture) = &self.capture {
            return Some(capture.last_at + self.idle);
        }
        self.pending_last.map(|last| last + self.hold)
    }

    /// A bracketed paste marker arrived: cancel the heuristic and return
    /// every byte it had accumulated so the caller can prepend them to the
    /// bracketed content. Nothing is lost, nothing is double-counted.
    pub(crate) fn take_bracketed_interrupt(&mut self) -> Option<String> {
        let mut head = std::mem::take(&mut self.pending);
        self.pending_last = None;
        if let Some(capture) = self.capture.take() {
            // Capture consumes pending when it starts, so at most one of the
            // two is non-empty; capture content precedes any stray pending.
            head = if head.is_empty() {
                capture.text
            } else {
                let mut text = capture.text;
                text.push_str(&head);
                text
            };
        }
        self.reset_window();
        if head.is_empty() { None } else { Some(head) }
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.pending_last = None;
        self.capture = None;
        self.reset_window();
    }

    fn begin_capture(&mut self, now: Instant) {
        let reclaimed = std::mem::take(&mut self.pending);
        self.pending_last = None;
        let mut capture = Capture {
            text: String::new(),
            last_at: now,
            overflow: false,
        };
        for ch in reclaimed.chars() {
            append_capped(&mut capture, ch, self.cap_bytes, now);
        }
        self.capture = Some(capture);
    }

    fn take_pending(&mut self) -> Option<String> {
        self.pending_last = None;
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    fn note_arrival(&mut self, now: Instant) {
        let in_window = self
            .last_char_at
            .is_some_and(|last| now.saturating_duration_since(last) <= self.window);
        self.burst_len = if in_window { self.burst_len + 1 } else { 1 };
        self.last_char_at = Some(now);
    }

    fn reset_window(&mut self) {
        self.burst_len = 0;
        self.last_char_at = None;
    }
}

fn append_capped(capture: &mut Capture, ch: char, cap_bytes: usize, now: Instant) {
    capture.last_at = now;
    if capture.text.len() + ch.len_utf8() <= cap_bytes {
        capture.text.push(ch);
    } else {
        capture.overflow = true;
    }
}
