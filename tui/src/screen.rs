//! The only module that writes terminal bytes.
//!
//! Everything the renderer shows goes through here as either a scrollback
//! block (written once, never touched again) or the overlay (repainted in
//! place above the scrollback). The writer is generic so tests capture the
//! byte stream and replay it through a terminal emulator.
//!
//! Overlay painting is relative: the cursor parks at the prompt cell after
//! every paint, so the next paint can find the region top by moving up
//! `cursor_row` rows, clear exactly the previously painted height, and lay
//! down the new rows. No absolute screen coordinates are tracked.

use std::io;
use std::io::Write;

use crossterm::cursor::MoveDown;
use crossterm::cursor::MoveToColumn;
use crossterm::cursor::MoveUp;
use crossterm::queue;
use crossterm::style::Attribute;
use crossterm::style::Print;
use crossterm::style::SetAttribute;
use crossterm::style::SetBackgroundColor;
use crossterm::style::SetForegroundColor;
use crossterm::terminal::Clear;
use crossterm::terminal::ClearType;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;

use crate::overlay::OverlayModel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::IsVariant)]
pub(crate) enum ScreenMode {
    /// Full overlay painting with cursor control.
    Ansi,
    /// Not a terminal: newline-terminated text, no escape bytes at all.
    Plain,
}

pub(crate) struct Screen<W: Write> {
    writer: W,
    mode: ScreenMode,
    snapshot: Option<OverlayModel>,
    wrote_block: bool,
}

impl<W: Write> Screen<W> {
    pub(crate) fn new(writer: W, mode: ScreenMode) -> Self {
        Self {
            writer,
            mode,
            snapshot: None,
            wrote_block: false,
        }
    }

    pub(crate) fn mode(&self) -> ScreenMode {
        self.mode
    }

    #[cfg(test)]
    pub(crate) fn writer(&self) -> &W {
        &self.writer
    }

    /// Repaint the overlay in place. Clears exactly the rows of the previous
    /// paint, pads with newlines when the overlay grew, writes the new rows,
    /// and parks the cursor at the prompt cell. Identical models are not
    /// repainted.
    pub(crate) fn paint(&mut self, model: &OverlayModel) -> io::Result<()> {
        if self.mode.is_plain() {
            return Ok(());
        }
        if self.snapshot.as_ref() == Some(model) {
            return Ok(());
        }
        let new_height = model.lines.len();
        if let Some(prev) = self.snapshot.take() {
            let old_height = prev.lines.len().max(1);
            queue!(self.writer, MoveToColumn(0))?;
            move_up(&mut self.writer, prev.cursor_row)?;
            for row in 0..old_height {
                queue!(self.writer, Clear(ClearType::CurrentLine))?;
                if row + 1 < old_height {
                    queue!(self.writer, MoveDown(1))?;
                }
            }
            // The region grows downward; newlines at the viewport bottom
            // scroll everything above into scrollback.
            for _ in old_height..new_height {
                queue!(self.writer, Print("\r\n"))?;
            }
            move_up(&mut self.writer, new_height.max(old_height).saturating_sub(1))?;
            queue!(self.writer, MoveToColumn(0))?;
        } else {
            queue!(self.writer, MoveToColumn(0))?;
        }
        for (row, line) in model.lines.iter().enumerate() {
            write_spans(&mut self.writer, line)?;
            if row + 1 < new_height {
                queue!(self.writer, Print("\r\n"))?;
            }
        }
        move_up(
            &mut self.writer,
            new_height.saturating_sub(1).saturating_sub(model.cursor_row),
        )?;
        queue!(self.writer, MoveToColumn(model.cursor_col as u16))?;
        self.writer.flush()?;
        self.snapshot = Some(model.clone());
        Ok(())
    }

    /// Remove the overlay from the screen, leaving scrollback untouched.
    pub(crate) fn erase_overlay(&mut self) -> io::Result<()> {
        if self.mode.is_plain() {
            return Ok(());
        }
        let Some(prev) = self.snapshot.take() else {
            return Ok(());
        };
        queue!(self.writer, MoveToColumn(0))?;
        move_up(&mut self.writer, prev.cursor_row)?;
        queue!(self.writer, Clear(ClearType::FromCursorDown))?;
        self.writer.flush()
    }

    /// Append one block to the scrollback. The overlay (if painted) is
    /// erased first so the block lands above it; the caller repaints
    /// afterwards. Blocks are separated by one blank line.
    pub(crate) fn insert_block(&mut self, lines: &[Line<'static>]) -> io::Result<()> {
        if self.mode.is_plain() {
            if self.wrote_block {
                writeln!(self.writer)?;
            }
            for line in lines {
                writeln!(self.writer, "{line}")?;
            }
            self.wrote_block = true;
            return self.writer.flush();
        }
        self.erase_overlay()?;
        if self.wrote_block {
            queue!(self.writer, Print("\r\n"))?;
        }
        for line in lines {
            write_spans(&mut self.writer, line)?;
            queue!(self.writer, Print("\r\n"))?;
        }
        self.wrote_block = true;
        self.writer.flush()
    }

    /// Drop overlay bookkeeping after a resize: the terminal reflowed our
    /// rows, so relative movement against the old snapshot is meaningless.
    /// Clears downward from the cursor as a best effort and repaints fresh.
    pub(crate) fn reset_after_resize(&mut self) -> io::Result<()> {
        self.snapshot = None;
        if self.mode.is_plain() {
            return Ok(());
        }
        queue!(self.writer, MoveToColumn(0), Clear(ClearType::FromCursorDown))?;
        self.writer.flush()
    }
}

/// `MoveUp(0)` is interpreted as `MoveUp(1)` by most terminals, so relative
/// moves are guarded here.
fn move_up<W: Write>(writer: &mut W, rows: usize) -> io::Result<()> {
    if rows > 0 {
        queue!(writer, MoveUp(rows as u16))?;
    }
    Ok(())
}

fn write_spans<W: Write>(writer: &mut W, line: &Line<'_>) -> io::Result<()> {
    for span in &line.spans {
        if span.content.is_empty() {
            continue;
        }
        let styled = span.style != Style::default();
        if styled {
            apply_style(writer, span.style)?;
        }
        queue!(writer, Print(span.content.as_ref()))?;
        if styled {
            queue!(writer, SetAttribute(Attribute::Reset))?;
        }
    }
    Ok(())
}

fn apply_style<W: Write>(writer: &mut W, style: Style) -> io::Result<()> {
    if let Some(color) = style.fg {
        queue!(writer, SetForegroundColor(convert_color(color)))?;
    }
    if let Some(color) = style.bg {
        queue!(writer, SetBackgroundColor(convert_color(color)))?;
    }
    const ATTRIBUTES: [(Modifier, Attribute); 7] = [
        (Modifier::BOLD, Attribute::Bold),
        (Modifier::DIM, Attribute::Dim),
        (Modifier::ITALIC, Attribute::Italic),
        (Modifier::UNDERLINED, Attribute::Underlined),
        (Modifier::REVERSED, Attribute::Reverse),
        (Modifier::CROSSED_OUT, Attribute::CrossedOut),
        (Modifier::HIDDEN, Attribute::Hidden),
    ];
    for (modifier, attribute) in ATTRIBUTES {
        if style.add_modifier.contains(modifier) {
            queue!(writer, SetAttribute(attribute))?;
        }
    }
    Ok(())
}

fn convert_color(color: ratatui::style::Color) -> crossterm::style::Color {
    use crossterm::style::Color as C;
    use ratatui::style::Color as R;
    match color {
        R::Reset => C::Reset,
        R::Black => C::Black,
        R::Red => C::DarkRed,
        R::Green => C::DarkGreen,
        R::Yellow => C::DarkYellow,
        R::Blue => C::DarkBlue,
        R::Magenta => C::DarkMagenta,
        R::Cyan => C::DarkCyan,
        R::Gray => C::Grey,
        R::DarkGray => C::DarkGrey,
        R::LightRed => C::Red,
        R::LightGreen => C::Green,
        R::LightYellow => C::Yellow,
        R::LightBlue => C::Blue,
        R::LightMagenta => C::Magenta,
        R::LightCyan => C::Cyan,
        R::White => C::White,
        R::Rgb(r, g, b) => C::Rgb { r, g, b },
        R::Indexed(i) => C::AnsiValue(i),
    }
}
