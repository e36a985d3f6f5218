//! The renderer task.
//!
//! One tokio task owns every piece of UI state: composer, event queue,
//! status, toggles, timers, and the screen. The host talks to it over the
//! [`HostCommand`] channel and hears back over the [`OutboundEvent`] channel,
//! so nothing here is shared or locked. The loop has exactly three wake
//! sources: terminal input, host commands, and the earliest armed deadline.

use std::io;
use std::io::Write;
use std::time::Instant;

use anyhow::Context;
use crossterm::event::Event;
use crossterm::event::EventStream;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use ratatui::style::Stylize;
use ratatui::text::Line;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tokio_stream::StreamExt;

use crate::composer::Composer;
use crate::composer::InputResult;
use crate::config::RendererConfig;
use crate::event::EventKind;
use crate::event::UiEvent;
use crate::event_queue::EventQueue;
use crate::frame::FrameScheduler;
use crate::frame::TimerKey;
use crate::frame::Timers;
use crate::handle::CaptureOptions;
use crate::handle::HostCommand;
use crate::handle::RendererHandle;
use crate::outbound::OutboundEvent;
use crate::outbound::OutboundSender;
use crate::overlay::OverlayParams;
use crate::overlay::build_overlay;
use crate::screen::Screen;
use crate::screen::ScreenMode;
use crate::status::StatusBundle;
use crate::status::StatusMeta;
use crate::status::ToggleState;
use crate::terminal;
use crate::version::STITCH_TUI_VERSION;

/// A started renderer: the control handle plus the stream of events the
/// user produces. Dropping `events` does not stop the renderer; call
/// [`RendererHandle::dispose`] for that.
pub struct Renderer {
    pub handle: RendererHandle,
    pub events: UnboundedReceiver<OutboundEvent>,
}

impl Renderer {
    /// Takes over the terminal and spawns the renderer task. Falls back to
    /// plain newline output when stdout is not a terminal or the config
    /// forces it.
    pub fn start(config: RendererConfig) -> anyhow::Result<Renderer> {
        let plain = config.force_plain || !terminal::is_interactive();
        let mode = if plain {
            ScreenMode::Plain
        } else {
            ScreenMode::Ansi
        };
        if mode.is_ansi() {
            terminal::enter().context("failed to enter raw mode")?;
        }
        let width = if mode.is_ansi() {
            crossterm::terminal::size()
                .map(|(cols, _)| usize::from(cols))
                .unwrap_or(80)
        } else {
            80
        };
        tracing::debug!(?mode, width, version = STITCH_TUI_VERSION, "starting renderer");

        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let app = App::new(
            Screen::new(io::stdout(), mode),
            config,
            OutboundSender::new(outbound_tx),
            width,
        );
        tokio::spawn(async move {
            if let Err(error) = app.run(host_rx).await {
                tracing::error!("renderer task exited with error: {error:#}");
            }
            terminal::restore();
        });

        Ok(Renderer {
            handle: RendererHandle::new(host_tx),
            events: outbound_rx,
        })
    }
}

/// An in-flight [`RendererHandle::capture_input`] request, with the state to
/// put back once it resolves.
struct CaptureState {
    options: CaptureOptions,
    reply: oneshot::Sender<String>,
    saved_text: String,
    saved_cursor: usize,
    saved_secret: bool,
}

/// What the run loop must do after a host command.
enum CommandOutcome {
    Continue,
    Suspend,
    Resume,
    Exit,
}

struct App<W: Write> {
    screen: Screen<W>,
    config: RendererConfig,
    composer: Composer,
    queue: EventQueue,
    timers: Timers,
    frames: FrameScheduler,
    status: StatusBundle,
    meta: StatusMeta,
    toggles: ToggleState,
    panel: Vec<String>,
    outbound: OutboundSender,
    width: usize,
    streaming_since: Option<Instant>,
    last_tool_result: Option<UiEvent>,
    capture: Option<CaptureState>,
    suspended: bool,
    disposed: bool,
}

impl<W: Write> App<W> {
    fn new(
        screen: Screen<W>,
        config: RendererConfig,
        outbound: OutboundSender,
        width: usize,
    ) -> Self {
        let composer = Composer::new(&config);
        let frames = FrameScheduler::new(config.frame_interval());
        Self {
            screen,
            config,
            composer,
            queue: EventQueue::default(),
            timers: Timers::default(),
            frames,
            status: StatusBundle::default(),
            meta: StatusMeta::default(),
            toggles: ToggleState::default(),
            panel: Vec::new(),
            outbound,
            width,
            streaming_since: None,
            last_tool_result: None,
            capture: None,
            suspended: false,
            disposed: false,
        }
    }

    async fn run(mut self, mut host_rx: UnboundedReceiver<HostCommand>) -> anyhow::Result<()> {
        let mut input = if self.screen.mode().is_ansi() {
            Some(EventStream::new())
        } else {
            None
        };
        self.request_frame(Instant::now());

        loop {
            let deadline = self.timers.next_deadline();
            tokio::select! {
                maybe_event = next_terminal_event(&mut input) => {
                    match maybe_event {
                        Some(Ok(event)) => self.on_terminal_event(event, Instant::now())?,
                        Some(Err(error)) => tracing::warn!("terminal input error: {error}"),
                        None => input = None,
                    }
                }
                maybe_command = host_rx.recv() => {
                    let Some(command) = maybe_command else {
                        break;
                    };
                    match self.on_host_command(command, Instant::now())? {
                        CommandOutcome::Continue => {}
                        CommandOutcome::Suspend => input = None,
                        CommandOutcome::Resume => {
                            if input.is_none() && self.screen.mode().is_ansi() {
                                input = Some(EventStream::new());
                            }
                        }
                        CommandOutcome::Exit => break,
                    }
                }
                () = sleep_until_deadline(deadline) => {
                    self.on_deadline(Instant::now())?;
                }
            }
        }

        self.shut_down();
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.status.is_streaming()
    }

    /// Arm the frame timer through the trailing-edge throttle.
    fn request_frame(&mut self, now: Instant) {
        let at = self.frames.request(now);
        self.timers.arm(TimerKey::Frame, at);
    }

    fn on_deadline(&mut self, now: Instant) -> anyhow::Result<()> {
        for key in self.timers.take_due(now) {
            match key {
                TimerKey::PendingInsert | TimerKey::PasteIdle => {
                    let changed = self.track_change(|app| app.composer.flush_if_due(now));
                    if changed {
                        self.request_frame(now);
                    }
                    self.sync_input_timers();
                }
                TimerKey::Frame => self.paint(now)?,
                TimerKey::QueueYield => self.drain_queue(now)?,
            }
        }
        Ok(())
    }

    /// Keep the burst timers in step with the composer after every input.
    /// The composer exposes one deadline; whether it means "commit the held
    /// character" or "finalize the capture" depends on its mode.
    fn sync_input_timers(&mut self) {
        self.timers.clear(TimerKey::PendingInsert);
        self.timers.clear(TimerKey::PasteIdle);
        if let Some(at) = self.composer.next_deadline() {
            let key = if self.composer.is_capturing_paste() {
                TimerKey::PasteIdle
            } else {
                TimerKey::PendingInsert
            };
            self.timers.arm(key, at);
        }
    }

    /// Run `f` and report a `Change` event if it moved the buffer or cursor.
    /// Suppressed during captures, which bypass normal routing.
    fn track_change<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let before_text = self.composer.text().to_string();
        let before_cursor = self.composer.cursor();
        let result = f(self);
        if self.capture.is_none()
            && (self.composer.text() != before_text || self.composer.cursor() != before_cursor)
        {
            self.outbound.send(OutboundEvent::Change {
                text: self.composer.text().to_string(),
                cursor: self.composer.cursor(),
            });
        }
        result
    }

    fn on_terminal_event(&mut self, event: Event, now: Instant) -> anyhow::Result<()> {
        if self.suspended || self.disposed {
            return Ok(());
        }
        match event {
            Event::Key(key) => self.on_key(key, now)?,
            Event::Paste(pasted) => {
                let changed = self.track_change(|app| app.composer.handle_paste(pasted));
                if changed {
                    self.request_frame(now);
                }
                self.sync_input_timers();
            }
            Event::Resize(cols, _) => {
                self.width = usize::from(cols);
                self.screen.reset_after_resize()?;
                self.request_frame(now);
            }
            _ => {}
        }
        Ok(())
    }

    fn on_key(&mut self, key: KeyEvent, now: Instant) -> anyhow::Result<()> {
        if self.handle_app_chord(key, now)? {
            return Ok(());
        }

        let task_running = self.capture.is_none() && self.is_streaming();
        let (result, redraw) =
            self.track_change(|app| app.composer.handle_key_event(key, now, task_running));
        if redraw {
            self.request_frame(now);
        }
        self.sync_input_timers();

        match result {
            InputResult::Submitted(text) => {
                if let Some(capture) = self.capture.take() {
                    self.finish_capture(capture, text);
                } else {
                    self.outbound.send(OutboundEvent::Submit { text });
                }
                self.request_frame(now);
            }
            InputResult::Queued(text) => {
                self.outbound.send(OutboundEvent::Queue { text });
                self.request_frame(now);
            }
            InputResult::Resume => self.outbound.send(OutboundEvent::Resume),
            InputResult::CtrlC { had_buffer } => {
                if self.capture.is_some() {
                    // Inside a capture the first press clears the line; on an
                    // already-empty line it cancels the capture.
                    if !had_buffer && let Some(capture) = self.capture.take() {
                        self.finish_capture(capture, String::new());
                    }
                } else {
                    self.outbound.send(OutboundEvent::Ctrlc { had_buffer });
                }
                self.request_frame(now);
            }
            InputResult::CtrlD => {
                if let Some(capture) = self.capture.take() {
                    self.finish_capture(capture, String::new());
                    self.request_frame(now);
                } else {
                    self.outbound.send(OutboundEvent::Ctrld);
                }
            }
            InputResult::Esc => {
                if let Some(capture) = self.capture.take() {
                    self.finish_capture(capture, String::new());
                    self.request_frame(now);
                } else if self.is_streaming() {
                    self.outbound.send(OutboundEvent::Interrupt);
                }
            }
            InputResult::None => {}
        }
        Ok(())
    }

    /// Keys the renderer handles itself, before the composer sees them.
    fn handle_app_chord(&mut self, key: KeyEvent, now: Instant) -> anyhow::Result<bool> {
        if key.kind != KeyEventKind::Press {
            return Ok(false);
        }
        match key.code {
            KeyCode::F(2) => {
                self.toggles.verify = !self.toggles.verify;
                self.outbound.send(OutboundEvent::ToggleVerify {
                    enabled: self.toggles.verify,
                });
            }
            KeyCode::F(3) => {
                self.toggles.auto_continue = !self.toggles.auto_continue;
                self.outbound.send(OutboundEvent::ToggleAutoContinue {
                    enabled: self.toggles.auto_continue,
                });
            }
            KeyCode::F(4) => {
                self.toggles.approval = self.toggles.approval.toggled();
                self.outbound.send(OutboundEvent::ToggleCriticalApproval {
                    mode: self.toggles.approval,
                });
            }
            KeyCode::F(5) => {
                self.toggles.dual_rl = !self.toggles.dual_rl;
                self.outbound.send(OutboundEvent::ToggleDualRl {
                    enabled: self.toggles.dual_rl,
                });
            }
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                // Clean repaint: drop the snapshot so the next frame rewrites
                // every row.
                self.screen.erase_overlay()?;
            }
            KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.expand_tool_result(now);
                return Ok(true);
            }
            _ => return Ok(false),
        }
        self.request_frame(now);
        Ok(true)
    }

    fn expand_tool_result(&mut self, now: Instant) {
        let Some(event) = self.last_tool_result.clone() else {
            return;
        };
        let lines = event.display_lines(self.width, None, self.toggles.debug);
        if let Err(error) = self.screen.insert_block(&lines) {
            tracing::warn!("failed to expand tool result: {error}");
        }
        self.outbound.send(OutboundEvent::ExpandToolResult);
        self.request_frame(now);
    }

    fn on_host_command(
        &mut self,
        command: HostCommand,
        now: Instant,
    ) -> anyhow::Result<CommandOutcome> {
        match command {
            HostCommand::AddEvent { raw, content } => {
                self.queue.push(UiEvent::new(&raw, content));
                if !self.timers.is_armed(TimerKey::QueueYield) {
                    self.drain_queue(now)?;
                }
            }
            HostCommand::UpdateStatus(patch) => {
                let before = self.status.clone();
                self.status.apply(patch);
                if before != self.status {
                    if self.status.is_streaming() {
                        if self.streaming_since.is_none() {
                            self.streaming_since = Some(now);
                        }
                    } else {
                        self.streaming_since = None;
                    }
                    self.request_frame(now);
                }
            }
            HostCommand::UpdateMeta(entries) => {
                let before = self.meta.clone();
                self.meta.apply(entries);
                if before != self.meta {
                    self.request_frame(now);
                }
            }
            HostCommand::UpdateToggles(patch) => {
                let before = self.toggles;
                self.toggles.apply(patch);
                if before != self.toggles {
                    self.request_frame(now);
                }
            }
            HostCommand::SetCommands(commands) => {
                self.composer.set_commands(commands);
                self.request_frame(now);
            }
            HostCommand::SetPanel(lines) => {
                self.panel = lines;
                self.request_frame(now);
            }
            HostCommand::ClearPanel => {
                if !self.panel.is_empty() {
                    self.panel.clear();
                    self.request_frame(now);
                }
            }
            HostCommand::SetBuffer { text, cursor } => {
                self.composer.set_text(text, cursor);
                self.request_frame(now);
            }
            HostCommand::GetBuffer(reply) => {
                let _ = reply.send((self.composer.text().to_string(), self.composer.cursor()));
            }
            HostCommand::SetSecret(secret) => {
                self.composer.set_secret(secret);
                self.request_frame(now);
            }
            HostCommand::CaptureInput { options, reply } => {
                self.start_capture(options, reply, now);
            }
            HostCommand::Suspend => {
                self.suspend();
                return Ok(CommandOutcome::Suspend);
            }
            HostCommand::Resume => {
                self.resume(now)?;
                return Ok(CommandOutcome::Resume);
            }
            HostCommand::Dispose(ack) => {
                self.shut_down();
                let _ = ack.send(());
                return Ok(CommandOutcome::Exit);
            }
        }
        Ok(CommandOutcome::Continue)
    }

    fn start_capture(
        &mut self,
        options: CaptureOptions,
        reply: oneshot::Sender<String>,
        now: Instant,
    ) {
        if let Some(previous) = self.capture.take() {
            self.finish_capture(previous, String::new());
        }
        tracing::trace!(secret = options.secret, "starting input capture");
        let saved_text = self.composer.text().to_string();
        let saved_cursor = self.composer.cursor();
        let saved_secret = self.composer.is_secret();
        self.composer.clear();
        self.composer.set_secret(options.secret);
        self.capture = Some(CaptureState {
            options,
            reply,
            saved_text,
            saved_cursor,
            saved_secret,
        });
        self.request_frame(now);
    }

    /// Resolve a capture and put the composer back the way it was.
    fn finish_capture(&mut self, capture: CaptureState, text: String) {
        let _ = capture.reply.send(text);
        self.composer.set_secret(capture.saved_secret);
        self.composer
            .set_text(capture.saved_text, Some(capture.saved_cursor));
    }

    fn drain_queue(&mut self, now: Instant) -> anyhow::Result<()> {
        self.timers.clear(TimerKey::QueueYield);
        if self.suspended || self.disposed {
            return Ok(());
        }
        while let Some(event) = self.queue.pop() {
            self.render_event(&event);
            let kind = event.kind;
            if kind == EventKind::ToolResult {
                self.last_tool_result = Some(event);
            }
            // Prompts render back to back; everything else yields one loop
            // tick so input and timers stay responsive mid-burst.
            if kind != EventKind::Prompt && !self.queue.is_empty() {
                self.timers.arm(TimerKey::QueueYield, now);
                break;
            }
        }
        self.request_frame(now);
        Ok(())
    }

    /// Write one event to scrollback. Failures become a diagnostic line and
    /// the queue moves on; a bad event must never stall the pipeline.
    fn render_event(&mut self, event: &UiEvent) {
        let preview =
            (event.kind == EventKind::ToolResult).then_some(self.config.tool_result_preview_lines);
        let lines = event.display_lines(self.width, preview, self.toggles.debug);
        if let Err(error) = self.screen.insert_block(&lines) {
            tracing::warn!("failed to render {} event: {error}", event.kind);
            let diagnostic = Line::from(format!("[render error: {error}]").dim().italic());
            let _ = self.screen.insert_block(&[diagnostic]);
        }
    }

    fn paint(&mut self, now: Instant) -> io::Result<()> {
        self.frames.mark_painted(now);
        if self.suspended || self.disposed || self.screen.mode().is_plain() {
            return Ok(());
        }
        let model = build_overlay(self.overlay_params(now));
        self.screen.paint(&model)?;
        if self.is_streaming() && self.capture.is_none() {
            // Keep the spinner moving even when nothing else changes.
            self.timers
                .arm(TimerKey::Frame, now + self.config.spinner_interval());
        }
        Ok(())
    }

    fn overlay_params(&self, now: Instant) -> OverlayParams<'_> {
        let capturing = self.capture.is_some();
        OverlayParams {
            width: self.width,
            input_text: self.composer.text(),
            input_cursor: self.composer.cursor(),
            paste_placeholders: self.composer.paste_placeholders(),
            secret: self.composer.is_secret(),
            capture_prompt: self
                .capture
                .as_ref()
                .and_then(|capture| capture.options.prompt.as_deref()),
            streaming_label: if capturing {
                None
            } else {
                self.status.streaming.as_deref().filter(|s| !s.is_empty())
            },
            elapsed: self
                .streaming_since
                .map(|since| now.saturating_duration_since(since)),
            suggestion_rows: self.composer.suggestion_rows(self.config.max_suggestion_rows),
            panel: &self.panel,
            status_line: self.status.effective(),
            meta: &self.meta,
            toggles: self.toggles,
            max_input_rows: self.config.max_input_rows,
        }
    }

    /// Hand the terminal to someone else: erase our overlay, restore modes,
    /// and stop reading input until resumed. Queued events wait.
    fn suspend(&mut self) {
        if self.suspended {
            return;
        }
        self.suspended = true;
        let _ = self.screen.erase_overlay();
        terminal::restore();
        tracing::debug!("renderer suspended");
    }

    fn resume(&mut self, now: Instant) -> anyhow::Result<()> {
        if !self.suspended {
            return Ok(());
        }
        self.suspended = false;
        if self.screen.mode().is_ansi() {
            terminal::enter().context("failed to re-enter raw mode")?;
            if let Ok((cols, _)) = crossterm::terminal::size() {
                self.width = usize::from(cols);
            }
        }
        tracing::debug!("renderer resumed");
        if !self.queue.is_empty() {
            self.drain_queue(now)?;
        }
        self.request_frame(now);
        Ok(())
    }

    /// Idempotent teardown: cancel timers, drop queued events, erase the
    /// overlay, and give the terminal back. Errors are swallowed so disposal
    /// always completes.
    fn shut_down(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.timers.clear_all();
        self.queue.clear();
        self.capture = None;
        let _ = self.screen.erase_overlay();
        terminal::restore();
        tracing::debug!("renderer disposed");
    }
}

async fn next_terminal_event(input: &mut Option<EventStream>) -> Option<io::Result<Event>> {
    match input {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::status::StatusPatch;

    fn test_app(mode: ScreenMode) -> (App<Vec<u8>>, UnboundedReceiver<OutboundEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(
            Screen::new(Vec::new(), mode),
            RendererConfig::default(),
            OutboundSender::new(tx),
            40,
        );
        (app, rx)
    }

    fn screen_rows(app: &App<Vec<u8>>) -> Vec<String> {
        let mut parser = vt100::Parser::new(24, 40, 0);
        parser.process(app.screen.writer());
        let screen = parser.screen();
        (0..24)
            .map(|row| {
                (0..40)
                    .map(|col| {
                        screen
                            .cell(row, col)
                            .map(|cell| cell.contents())
                            .unwrap_or_default()
                    })
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn add(app: &mut App<Vec<u8>>, raw: &str, content: &str, now: Instant) {
        app.on_host_command(
            HostCommand::AddEvent {
                raw: raw.to_string(),
                content: content.to_string(),
            },
            now,
        )
        .unwrap();
    }

    #[test]
    fn prompt_then_response_render_as_two_blocks_with_one_overlay() {
        let (mut app, mut rx) = test_app(ScreenMode::Ansi);
        let now = Instant::now();

        add(&mut app, "prompt", "fix bug", now);
        add(&mut app, "response", "done", now);
        app.on_deadline(now + Duration::from_millis(20)).unwrap();

        let rows = screen_rows(&app);
        assert_eq!(rows[0], "> fix bug");
        assert_eq!(rows[1], "");
        assert_eq!(rows[2], "• done");

        let divider = "─".repeat(40);
        let dividers = rows.iter().filter(|row| **row == divider).count();
        assert_eq!(dividers, 2, "exactly one overlay on screen");
        assert_eq!(rows[3], divider);
        assert_eq!(rows[4], ">");
        assert_eq!(rows[5], divider);
        assert!(rows[6].contains("verify"));
        assert!(rows[7].contains("send"));

        assert!(rx.try_recv().is_err(), "display events emit nothing");
    }

    #[test]
    fn plain_mode_prints_blocks_without_escape_bytes() {
        let (mut app, _rx) = test_app(ScreenMode::Plain);
        let now = Instant::now();

        add(&mut app, "prompt", "fix bug", now);
        add(&mut app, "response", "done", now);
        app.on_deadline(now + Duration::from_millis(20)).unwrap();

        let bytes = app.screen.writer().clone();
        assert!(!bytes.contains(&0x1b));
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "> fix bug\n\n• done\n"
        );
    }

    #[test]
    fn pasted_text_reports_change_then_submit() {
        let (mut app, mut rx) = test_app(ScreenMode::Ansi);
        let now = Instant::now();

        app.on_terminal_event(Event::Paste("hi".to_string()), now)
            .unwrap();
        app.on_terminal_event(key(KeyCode::Enter), now).unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundEvent::Change {
                text: "hi".to_string(),
                cursor: 2,
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundEvent::Change {
                text: String::new(),
                cursor: 0,
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundEvent::Submit {
                text: "hi".to_string(),
            }
        );
    }

    #[test]
    fn held_keystroke_commits_through_the_timer() {
        let (mut app, mut rx) = test_app(ScreenMode::Ansi);
        let now = Instant::now();

        app.on_terminal_event(key(KeyCode::Char('h')), now).unwrap();
        // Held for reclassification; nothing visible yet.
        assert!(rx.try_recv().is_err());
        assert!(app.timers.is_armed(TimerKey::PendingInsert));

        app.on_deadline(now + app.config.pending_insert_hold() + Duration::from_millis(1))
            .unwrap();
        assert_eq!(app.composer.text(), "h");
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundEvent::Change {
                text: "h".to_string(),
                cursor: 1,
            }
        );
    }

    #[test]
    fn esc_interrupts_only_while_streaming() {
        let (mut app, mut rx) = test_app(ScreenMode::Ansi);
        let now = Instant::now();

        app.on_terminal_event(key(KeyCode::Esc), now).unwrap();
        assert!(rx.try_recv().is_err());

        app.on_host_command(
            HostCommand::UpdateStatus(StatusPatch {
                streaming: Some(Some("thinking".to_string())),
                ..Default::default()
            }),
            now,
        )
        .unwrap();
        assert!(app.streaming_since.is_some());

        app.on_terminal_event(key(KeyCode::Esc), now).unwrap();
        assert_eq!(rx.try_recv().unwrap(), OutboundEvent::Interrupt);
    }

    #[test]
    fn function_keys_flip_toggles_and_report() {
        let (mut app, mut rx) = test_app(ScreenMode::Ansi);
        let now = Instant::now();

        app.on_terminal_event(key(KeyCode::F(4)), now).unwrap();
        assert_eq!(app.toggles.approval, crate::status::ApprovalMode::Auto);
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundEvent::ToggleCriticalApproval {
                mode: crate::status::ApprovalMode::Auto,
            }
        );

        app.on_terminal_event(key(KeyCode::F(2)), now).unwrap();
        assert!(app.toggles.verify);
        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundEvent::ToggleVerify { enabled: true }
        );
    }

    #[test]
    fn capture_bypasses_submit_routing_and_restores_the_draft() {
        let (mut app, mut rx) = test_app(ScreenMode::Ansi);
        let now = Instant::now();

        app.on_host_command(
            HostCommand::SetBuffer {
                text: "draft".to_string(),
                cursor: None,
            },
            now,
        )
        .unwrap();

        let (reply, mut captured) = oneshot::channel();
        app.on_host_command(
            HostCommand::CaptureInput {
                options: CaptureOptions {
                    prompt: Some("token:".to_string()),
                    secret: true,
                },
                reply,
            },
            now,
        )
        .unwrap();
        assert!(app.composer.is_secret());
        assert_eq!(app.composer.text(), "");

        app.on_terminal_event(Event::Paste("s3cret".to_string()), now)
            .unwrap();
        app.on_terminal_event(key(KeyCode::Enter), now).unwrap();

        assert_eq!(captured.try_recv().unwrap(), "s3cret");
        assert_eq!(app.composer.text(), "draft");
        assert!(!app.composer.is_secret());
        assert!(rx.try_recv().is_err(), "capture emits no outbound events");
    }

    #[test]
    fn esc_cancels_a_capture_with_an_empty_line() {
        let (mut app, _rx) = test_app(ScreenMode::Ansi);
        let now = Instant::now();

        let (reply, mut captured) = oneshot::channel();
        app.on_host_command(
            HostCommand::CaptureInput {
                options: CaptureOptions::default(),
                reply,
            },
            now,
        )
        .unwrap();
        app.on_terminal_event(key(KeyCode::Esc), now).unwrap();

        assert_eq!(captured.try_recv().unwrap(), "");
        assert!(app.capture.is_none());
    }

    #[test]
    fn suspended_renderer_holds_events_until_resume() {
        let (mut app, _rx) = test_app(ScreenMode::Plain);
        let now = Instant::now();

        app.suspend();
        add(&mut app, "tool", "ls", now);
        assert!(app.screen.writer().is_empty());
        assert!(!app.queue.is_empty());

        app.resume(now).unwrap();
        assert!(app.queue.is_empty());
        let text = String::from_utf8(app.screen.writer().clone()).unwrap();
        assert!(text.contains("ls"));
    }

    #[test]
    fn dispose_is_idempotent_and_clears_pending_work() {
        let (mut app, _rx) = test_app(ScreenMode::Ansi);
        let now = Instant::now();

        add(&mut app, "tool", "ls", now);
        add(&mut app, "tool", "cat", now);
        assert!(app.timers.is_armed(TimerKey::QueueYield) || app.queue.is_empty());

        app.shut_down();
        assert!(app.disposed);
        assert!(app.queue.is_empty());
        assert_eq!(app.timers.next_deadline(), None);

        let len = app.screen.writer().len();
        app.shut_down();
        app.on_deadline(now + Duration::from_secs(1)).unwrap();
        assert_eq!(app.screen.writer().len(), len);
    }

    #[test]
    fn a_failing_sink_does_not_stall_the_queue() {
        struct FlakyWriter {
            fail_writes: usize,
        }
        impl Write for FlakyWriter {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                if self.fail_writes > 0 {
                    self.fail_writes -= 1;
                    return Err(io::Error::other("sink closed"));
                }
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            Screen::new(FlakyWriter { fail_writes: 1 }, ScreenMode::Ansi),
            RendererConfig::default(),
            OutboundSender::new(tx),
            40,
        );
        let now = Instant::now();

        app.on_host_command(
            HostCommand::AddEvent {
                raw: "tool".to_string(),
                content: "ls".to_string(),
            },
            now,
        )
        .unwrap();
        app.on_host_command(
            HostCommand::AddEvent {
                raw: "tool".to_string(),
                content: "cat".to_string(),
            },
            now,
        )
        .unwrap();
        app.on_deadline(now + Duration::from_millis(1)).unwrap();
        assert!(app.queue.is_empty());
        assert!(!app.disposed);
    }

    #[test]
    fn tool_results_are_retained_for_expansion() {
        let (mut app, mut rx) = test_app(ScreenMode::Ansi);
        let now = Instant::now();

        let body = (1..=8)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        add(&mut app, "tool-result", &body, now);
        assert!(app.last_tool_result.is_some());

        app.on_terminal_event(ctrl('o'), now).unwrap();
        assert_eq!(rx.try_recv().unwrap(), OutboundEvent::ExpandToolResult);

        let rows = screen_rows(&app);
        assert!(rows.iter().any(|row| row.contains("line 8")));
    }

    #[test]
    fn resize_updates_the_width_and_repaints() {
        let (mut app, _rx) = test_app(ScreenMode::Ansi);
        let now = Instant::now();

        app.on_deadline(now).unwrap();
        app.on_terminal_event(Event::Resize(50, 20), now).unwrap();
        assert_eq!(app.width, 50);
        assert!(app.timers.is_armed(TimerKey::Frame));
    }
}
