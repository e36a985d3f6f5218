//! Deadline bookkeeping for the renderer task.
//!
//! The renderer sleeps on a single `tokio::time::sleep_until` armed from the
//! earliest deadline tracked here. Timers are one-shot and keyed by purpose,
//! so re-arming a key replaces its previous deadline. Every entry point takes
//! the current time explicitly, which keeps expiry logic testable without
//! sleeping.

use std::time::Duration;
use std::time::Instant;

/// One-shot timer purposes. At most one deadline is armed per key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TimerKey {
    /// The held first character of a suspected burst is due to commit as a
    /// typed character.
    PendingInsert,
    /// No burst input arrived recently; finalize the captured paste.
    PasteIdle,
    /// A coalesced repaint is due.
    Frame,
    /// Pop the next queued display event after yielding one loop tick.
    QueueYield,
}

#[derive(Debug, Default)]
pub(crate) struct Timers {
    armed: Vec<(TimerKey, Instant)>,
}

impl Timers {
    pub(crate) fn arm(&mut self, key: TimerKey, at: Instant) {
        self.clear(key);
        self.armed.push((key, at));
    }

    pub(crate) fn clear(&mut self, key: TimerKey) {
        self.armed.retain(|(armed, _)| *armed != key);
    }

    pub(crate) fn clear_all(&mut self) {
        self.armed.clear();
    }

    pub(crate) fn is_armed(&self, key: TimerKey) -> bool {
        self.armed.iter().any(|(armed, _)| *armed == key)
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.armed.iter().map(|(_, at)| *at).min()
    }

    /// Removes and returns every key whose deadline has passed, earliest
    /// deadline first.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<TimerKey> {
        let mut due: Vec<(TimerKey, Instant)> = Vec::new();
        self.armed.retain(|(key, at)| {
            if *at <= now {
                due.push((*key, *at));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(_, at)| *at);
        due.into_iter().map(|(key, _)| key).collect()
    }
}

/// Trailing-edge repaint throttle.
///
/// The first request after a paint schedules a frame one interval after that
/// paint, or immediately when the interval already elapsed. Further requests
/// before the deadline coalesce into it instead of pushing it out, so a
/// steady stream of dirty state still paints at the frame rate.
#[derive(Debug)]
pub(crate) struct FrameScheduler {
    interval: Duration,
    last_paint: Option<Instant>,
    deadline: Option<Instant>,
}

impl FrameScheduler {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_paint: None,
            deadline: None,
        }
    }

    /// Requests a repaint and returns the deadline the caller should arm.
    pub(crate) fn request(&mut self, now: Instant) -> Instant {
        if let Some(deadline) = self.deadline {
            return deadline;
        }
        let at = match self.last_paint {
            Some(painted) => (painted + self.interval).max(now),
            None => now,
        };
        self.deadline = Some(at);
        at
    }

    pub(crate) fn pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Marks a frame painted; the next request starts a fresh interval.
    pub(crate) fn mark_painted(&mut self, now: Instant) {
        self.last_paint = Some(now);
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn rearming_a_key_replaces_its_deadline() {
        let now = Instant::now();
        let mut timers = Timers::default();
        timers.arm(TimerKey::Frame, now + Duration::from_millis(16));
        timers.arm(TimerKey::Frame, now + Duration::from_millis(40));
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_millis(40)));
        assert!(timers.take_due(now + Duration::from_millis(20)).is_empty());
    }

    #[test]
    fn take_due_pops_expired_keys_earliest_first() {
        let now = Instant::now();
        let mut timers = Timers::default();
        timers.arm(TimerKey::PasteIdle, now + Duration::from_millis(24));
        timers.arm(TimerKey::PendingInsert, now + Duration::from_millis(10));
        timers.arm(TimerKey::Frame, now + Duration::from_millis(100));

        let due = timers.take_due(now + Duration::from_millis(30));
        assert_eq!(due, vec![TimerKey::PendingInsert, TimerKey::PasteIdle]);
        assert_eq!(timers.next_deadline(), Some(now + Duration::from_millis(100)));
    }

    #[test]
    fn clear_all_disarms_everything() {
        let now = Instant::now();
        let mut timers = Timers::default();
        timers.arm(TimerKey::QueueYield, now);
        timers.arm(TimerKey::Frame, now);
        timers.clear_all();
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn first_request_is_immediate() {
        let now = Instant::now();
        let mut frames = FrameScheduler::new(Duration::from_millis(16));
        assert_eq!(frames.request(now), now);
    }

    #[test]
    fn requests_inside_the_interval_coalesce() {
        let now = Instant::now();
        let mut frames = FrameScheduler::new(Duration::from_millis(16));
        frames.mark_painted(now);

        let deadline = frames.request(now + Duration::from_millis(5));
        assert_eq!(deadline, now + Duration::from_millis(16));
        assert_eq!(frames.request(now + Duration::from_millis(10)), deadline);
        assert!(frames.pending());

        frames.mark_painted(deadline);
        assert!(!frames.pending());
    }

    #[test]
    fn request_after_a_quiet_period_is_immediate() {
        let now = Instant::now();
        let mut frames = FrameScheduler::new(Duration::from_millis(16));
        frames.mark_painted(now);
        let later = now + Duration::from_millis(100);
        assert_eq!(frames.request(later), later);
    }
}
