//! Ordered queue of host events awaiting a scrollback write.
//!
//! Ordering is strict FIFO with one exception: prompt events are spliced
//! ahead of queued non-prompt events so the user's own input is always
//! visible before any async output that was already waiting. Coalescing
//! happens at enqueue time, merging chunked streams into a single block
//! before anything is rendered.

use std::collections::VecDeque;

use crate::event::EventKind;
use crate::event::UiEvent;

#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    queued: VecDeque<UiEvent>,
}

impl EventQueue {
    /// Enqueue one event, applying prompt splicing and chunk coalescing.
    pub(crate) fn push(&mut self, event: UiEvent) {
        if event.kind == EventKind::Prompt {
            // Prompts form a prefix of the queue: insert after any prompts
            // already waiting, before the first non-prompt event.
            let at = self
                .queued
                .iter()
                .position(|queued| queued.kind != EventKind::Prompt)
                .unwrap_or(self.queued.len());
            self.queued.insert(at, event);
            return;
        }

        if let Some(back) = self.queued.back_mut()
            && back.kind.coalesces()
            && back.kind == event.kind
            && back.raw_kind == event.raw_kind
        {
            back.absorb(&event);
            return;
        }
        self.queued.push_back(event);
    }

    /// Pop the next event to render.
    pub(crate) fn pop(&mut self) -> Option<UiEvent> {
        self.queued.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Drop everything without rendering. Used on disposal.
    pub(crate) fn clear(&mut self) {
        self.queued.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(queue: &mut EventQueue) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Some(event) = queue.pop() {
            out.push(event.kind);
        }
        out
    }

    #[test]
    fn prompts_jump_ahead_of_queued_output() {
        let mut queue = EventQueue::default();
        queue.push(UiEvent::new("tool", "ls"));
        queue.push(UiEvent::new("prompt", "fix bug"));
        queue.push(UiEvent::new("tool", "cat"));

        assert_eq!(
            kinds(&mut queue),
            vec![EventKind::Prompt, EventKind::Tool, EventKind::Tool]
        );
    }

    #[test]
    fn prompts_stay_stable_relative_to_each_other() {
        let mut queue = EventQueue::default();
        queue.push(UiEvent::new("tool", "ls"));
        queue.push(UiEvent::new("prompt", "first"));
        queue.push(UiEvent::new("prompt", "second"));

        let first = queue.pop().expect("first prompt");
        let second = queue.pop().expect("second prompt");
        assert_eq!(first.content, "first");
        assert_eq!(second.content, "second");
        assert_eq!(queue.pop().map(|e| e.kind), Some(EventKind::Tool));
    }

    #[test]
    fn adjacent_response_chunks_merge() {
        let mut queue = EventQueue::default();
        queue.push(UiEvent::new("response", "a"));
        queue.push(UiEvent::new("response", "b"));

        let merged = queue.pop().expect("merged event");
        assert_eq!(merged.content, "a\nb");
        assert!(queue.is_empty());
    }

    #[test]
    fn different_raw_kinds_do_not_merge() {
        let mut queue = EventQueue::default();
        queue.push(UiEvent::new("response", "a"));
        queue.push(UiEvent::new("banner", "b"));

        assert_eq!(queue.pop().map(|e| e.content), Some("a".to_string()));
        assert_eq!(queue.pop().map(|e| e.content), Some("b".to_string()));
    }

    #[test]
    fn tool_events_never_merge() {
        let mut queue = EventQueue::default();
        queue.push(UiEvent::new("tool", "ls"));
        queue.push(UiEvent::new("tool", "cat"));

        assert_eq!(kinds(&mut queue), vec![EventKind::Tool, EventKind::Tool]);
    }

    #[test]
    fn a_prompt_between_chunks_still_lands_in_front() {
        let mut queue = EventQueue::default();
        queue.push(UiEvent::new("stream", "a"));
        queue.push(UiEvent::new("prompt", "go"));
        queue.push(UiEvent::new("stream", "b"));

        let prompt = queue.pop().expect("prompt");
        assert_eq!(prompt.kind, EventKind::Prompt);
        let merged = queue.pop().expect("stream");
        assert_eq!(merged.content, "a\nb");
    }

    #[test]
    fn clear_drops_everything() {
        let mut queue = EventQueue::default();
        queue.push(UiEvent::new("tool", "ls"));
        queue.clear();
        assert!(queue.is_empty());
    }
}
