//! Host-facing control surface.
//!
//! `RendererHandle` is the cloneable half the embedding application keeps.
//! Every method translates to one `HostCommand` on the renderer task's
//! channel; the task owns all state, so the handle itself holds none. Once
//! the renderer is disposed the channel closes and every method quietly
//! becomes a no-op, which keeps host shutdown paths from racing the task.

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

use crate::composer::CommandSpec;
use crate::status::StatusPatch;
use crate::status::TogglePatch;

/// Options for a one-off input capture that bypasses submit routing.
#[derive(Clone, Debug, Default)]
pub struct CaptureOptions {
    /// Shown in place of the activity line while the capture is active.
    pub prompt: Option<String>,
    /// Mask typed characters and keep the line out of history.
    pub secret: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    /// The renderer task is gone; queries can no longer be answered.
    #[error("renderer has been disposed")]
    Disposed,
}

#[derive(Debug)]
pub(crate) enum HostCommand {
    AddEvent {
        raw: String,
        content: String,
    },
    UpdateStatus(StatusPatch),
    UpdateMeta(Vec<(String, Option<String>)>),
    UpdateToggles(TogglePatch),
    SetCommands(Vec<CommandSpec>),
    SetPanel(Vec<String>),
    ClearPanel,
    SetBuffer {
        text: String,
        cursor: Option<usize>,
    },
    GetBuffer(oneshot::Sender<(String, usize)>),
    SetSecret(bool),
    CaptureInput {
        options: CaptureOptions,
        reply: oneshot::Sender<String>,
    },
    Suspend,
    Resume,
    Dispose(oneshot::Sender<()>),
}

#[derive(Clone, Debug)]
pub struct RendererHandle {
    tx: UnboundedSender<HostCommand>,
}

impl RendererHandle {
    pub(crate) fn new(tx: UnboundedSender<HostCommand>) -> Self {
        Self { tx }
    }

    fn send(&self, command: HostCommand) {
        if self.tx.send(command).is_err() {
            tracing::trace!("renderer disposed; host command dropped");
        }
    }

    /// Queues a display event. `raw` is the host's event type string and is
    /// mapped to a canonical kind, with unknown types treated as responses.
    pub fn add_event(&self, raw: String, content: String) {
        self.send(HostCommand::AddEvent { raw, content });
    }

    /// Applies a sparse status update. Fields left `None` keep their value.
    pub fn update_status(&self, patch: StatusPatch) {
        self.send(HostCommand::UpdateStatus(patch));
    }

    /// Merges key/value pairs into the meta line. A `None` value removes the
    /// key.
    pub fn update_status_meta(&self, entries: Vec<(String, Option<String>)>) {
        self.send(HostCommand::UpdateMeta(entries));
    }

    pub fn update_toggles(&self, patch: TogglePatch) {
        self.send(HostCommand::UpdateToggles(patch));
    }

    /// Replaces the set of slash commands the suggestion popup offers.
    pub fn set_available_commands(&self, commands: Vec<CommandSpec>) {
        self.send(HostCommand::SetCommands(commands));
    }

    /// Pins free-form lines between the input and the status area.
    pub fn set_inline_panel(&self, lines: Vec<String>) {
        self.send(HostCommand::SetPanel(lines));
    }

    pub fn clear_inline_panel(&self) {
        self.send(HostCommand::ClearPanel);
    }

    /// Replaces the input buffer. `cursor` is a byte offset clamped to a
    /// character boundary; `None` places the cursor at the end.
    pub fn set_buffer(&self, text: String, cursor: Option<usize>) {
        self.send(HostCommand::SetBuffer { text, cursor });
    }

    /// Current buffer text and cursor, as the renderer task sees them.
    pub async fn buffer(&self) -> Result<(String, usize), RendererError> {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::GetBuffer(reply));
        rx.await.map_err(|_| RendererError::Disposed)
    }

    pub async fn cursor(&self) -> Result<usize, RendererError> {
        Ok(self.buffer().await?.1)
    }

    pub fn set_secret_mode(&self, secret: bool) {
        self.send(HostCommand::SetSecret(secret));
    }

    /// Takes over the input line until the user presses Enter and resolves
    /// with the entered text. The line is not routed through submit/queue
    /// events and, with `secret`, is masked and kept out of history.
    pub async fn capture_input(&self, options: CaptureOptions) -> Result<String, RendererError> {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::CaptureInput { options, reply });
        rx.await.map_err(|_| RendererError::Disposed)
    }

    /// Releases the terminal (overlay erased, raw mode left) so another
    /// program can use it. Input is ignored until `resume_ui`.
    pub fn suspend(&self) {
        self.send(HostCommand::Suspend);
    }

    pub fn resume_ui(&self) {
        self.send(HostCommand::Resume);
    }

    /// Tears the renderer down and restores the terminal. Resolves once the
    /// task has cleaned up; disposing twice is harmless.
    pub async fn dispose(&self) {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::Dispose(reply));
        let _ = rx.await;
    }
}
