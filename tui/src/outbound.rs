//! Events the renderer emits back to the host application.
//!
//! The host decides policy for all of these; the renderer only reports what
//! the user did. Ctrl+C and Ctrl+D in particular are surfaced as signals
//! rather than acted on, so pause-versus-exit stays a host decision.

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::status::ApprovalMode;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundEvent {
    /// The user submitted the input buffer while the host was idle.
    Submit { text: String },
    /// The user submitted while a long-running operation was in flight; the
    /// host should run this once the current operation completes.
    Queue { text: String },
    /// Esc pressed while an operation was in flight.
    Interrupt,
    /// Ctrl+C. `had_buffer` tells the host whether the renderer consumed the
    /// press to clear a non-empty input buffer first.
    Ctrlc { had_buffer: bool },
    /// Ctrl+D on an empty buffer.
    Ctrld,
    /// Input buffer or cursor changed.
    Change { text: String, cursor: usize },
    /// Enter on an empty buffer while an operation was in flight.
    Resume,
    /// Ctrl+O; the most recent tool result was expanded in scrollback.
    ExpandToolResult,
    ToggleVerify { enabled: bool },
    ToggleAutoContinue { enabled: bool },
    ToggleCriticalApproval { mode: ApprovalMode },
    ToggleDualRl { enabled: bool },
}

/// Cloneable sender half handed to every component that needs to report
/// back to the host. Send failures mean the host dropped its receiver, so
/// they are logged and otherwise ignored.
#[derive(Clone, Debug)]
pub(crate) struct OutboundSender {
    tx: UnboundedSender<OutboundEvent>,
}

impl OutboundSender {
    pub(crate) fn new(tx: UnboundedSender<OutboundEvent>) -> Self {
        Self { tx }
    }

    pub(crate) fn send(&self, event: OutboundEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::error!("failed to send outbound event: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn serializes_with_kebab_case_tags() {
        let json = serde_json::to_value(OutboundEvent::ToggleDualRl { enabled: true })
            .expect("event should serialize");
        assert_eq!(json["type"], "toggle-dual-rl");

        let json = serde_json::to_value(OutboundEvent::Ctrlc { had_buffer: false })
            .expect("event should serialize");
        assert_eq!(json["type"], "ctrlc");
    }

    #[test]
    fn change_carries_buffer_and_cursor() {
        let json = serde_json::to_value(OutboundEvent::Change {
            text: "hi".to_string(),
            cursor: 2,
        })
        .expect("event should serialize");
        assert_eq!(json["text"], "hi");
        assert_eq!(json["cursor"], 2);
    }
}
