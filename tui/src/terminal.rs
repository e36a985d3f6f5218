//! Raw-mode lifecycle.
//!
//! The renderer owns stdout for its whole life, so mode changes are applied
//! once at startup and undone exactly once no matter how the process leaves:
//! normal disposal, suspend for an external editor, or a panic. `restore` is
//! idempotent and callable from the panic hook.

use std::io;
use std::io::IsTerminal;
use std::panic;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crossterm::cursor;
use crossterm::event::DisableBracketedPaste;
use crossterm::event::EnableBracketedPaste;
use crossterm::execute;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;

static MODES_ACTIVE: AtomicBool = AtomicBool::new(false);
static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Whether stdout is attached to a terminal. When it is not, the renderer
/// runs in plain mode and never touches terminal modes.
pub(crate) fn is_interactive() -> bool {
    io::stdout().is_terminal()
}

/// Enters raw mode, enables bracketed paste, and hides the hardware cursor.
/// The overlay draws its own cursor as a reversed cell, so the hardware one
/// would double up. Also installs a panic hook that restores the terminal
/// before the default hook prints.
pub(crate) fn enter() -> io::Result<()> {
    enable_raw_mode()?;
    MODES_ACTIVE.store(true, Ordering::SeqCst);
    execute!(io::stdout(), EnableBracketedPaste, cursor::Hide)?;
    install_panic_restore();
    Ok(())
}

/// Undoes `enter`. Safe to call repeatedly and from the panic hook; only the
/// first call after `enter` writes anything.
pub(crate) fn restore() {
    if !MODES_ACTIVE.swap(false, Ordering::SeqCst) {
        return;
    }
    let _ = execute!(io::stdout(), DisableBracketedPaste, cursor::Show);
    let _ = disable_raw_mode();
}

fn install_panic_restore() {
    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        restore();
        previous(info);
    }));
}
