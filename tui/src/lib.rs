// Forbid accidental stdout/stderr writes in the library portion of the TUI.
// Everything we emit has to go through `Screen`, which owns the single
// writer and keeps the overlay bookkeeping consistent.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod app;
mod composer;
mod config;
mod event;
mod event_queue;
mod frame;
mod handle;
mod key_hint;
mod outbound;
mod overlay;
mod screen;
mod status;
mod terminal;
mod ui_consts;
mod version;
mod wrapping;

pub use app::Renderer;
pub use composer::CollapsedPaste;
pub use composer::CommandSpec;
pub use config::RendererConfig;
pub use event::EventKind;
pub use event::UiEvent;
pub use handle::CaptureOptions;
pub use handle::RendererError;
pub use handle::RendererHandle;
pub use outbound::OutboundEvent;
pub use status::ApprovalMode;
pub use status::StatusBundle;
pub use status::StatusPatch;
pub use status::ThinkingMode;
pub use status::TogglePatch;
pub use status::ToggleState;
pub use version::STITCH_TUI_VERSION;
