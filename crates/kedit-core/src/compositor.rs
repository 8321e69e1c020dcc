//! Frame compositor: turns editor state into one escape-coded frame.
//!
//! A frame is, in order: hide cursor, home, one line per text-area row,
//! the status bar, the message bar, cursor placement, show cursor. Every
//! text line ends with erase-to-end-of-line so nothing from the previous
//! frame survives, which means the screen is never cleared as a whole.
//!
//! Colour changes are coalesced. Inside a row the compositor remembers the
//! colour it last emitted and only writes a new SGR code when the
//! classification's colour differs; a run of normal text costs one
//! default-foreground code. Control bytes are drawn as an inverse-video
//! caret glyph (`@` + code, or `?` past 26) and the active colour is
//! re-emitted after them, since `ESC[m` resets it.

use std::io::{self, Write};

use kedit_term::ansi;

use crate::document::Document;
use crate::highlight::Highlight;
use crate::row::Row;
use crate::viewport::Viewport;

/// Longest file name shown in the status bar.
const STATUS_NAME_WIDTH: usize = 20;

/// Borrowed view of everything one frame shows.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub document: &'a Document,
    pub viewport: &'a Viewport,
    /// Cursor render column.
    pub rx: usize,
    /// Cursor row.
    pub cy: usize,
    /// Message bar text, or `None` once it has expired.
    pub message: Option<&'a str>,
}

impl Frame<'_> {
    /// Write the whole frame to `out`.
    ///
    /// # Errors
    ///
    /// Only fails if `out` does.
    pub fn render(&self, out: &mut impl Write) -> io::Result<()> {
        ansi::cursor_hide(out)?;
        ansi::cursor_home(out)?;

        self.draw_rows(out)?;
        self.draw_status_bar(out)?;
        self.draw_message_bar(out)?;

        let (x, y) = self.viewport.to_screen(self.rx, self.cy);
        ansi::cursor_to(out, x, y)?;
        ansi::cursor_show(out)
    }

    /// Text area: document rows, or `~` past the end.
    pub fn draw_rows(&self, out: &mut impl Write) -> io::Result<()> {
        let view = self.viewport;
        for y in 0..view.screen_rows {
            match self.document.row(y + view.row_offset) {
                Some(row) => draw_row(out, row, view.col_offset, view.screen_cols)?,
                None => out.write_all(b"~")?,
            }
            ansi::clear_line(out)?;
            out.write_all(b"\r\n")?;
        }
        Ok(())
    }

    /// Inverse-video bar: name, line count, dirty marker on the left;
    /// filetype and cursor line on the right.
    pub fn draw_status_bar(&self, out: &mut impl Write) -> io::Result<()> {
        let doc = self.document;
        let cols = self.viewport.screen_cols;

        let name = doc
            .path()
            .map_or_else(|| "[No Name]".to_owned(), |p| p.display().to_string());
        let left = format!(
            "{:.width$} - {} lines {}",
            name,
            doc.len(),
            if doc.is_dirty() { "(modified)" } else { "" },
            width = STATUS_NAME_WIDTH,
        );
        let right = format!(
            "{} | {}/{}",
            doc.syntax().map_or("no ft", |s| s.filetype),
            self.cy + 1,
            doc.len(),
        );

        ansi::inverse(out)?;
        let left = &left.as_bytes()[..left.len().min(cols)];
        out.write_all(left)?;

        let mut len = left.len();
        while len < cols {
            if cols - len == right.len() {
                out.write_all(right.as_bytes())?;
                break;
            }
            out.write_all(b" ")?;
            len += 1;
        }

        ansi::attrs_off(out)?;
        out.write_all(b"\r\n")
    }

    /// Bottom line: the current message, clipped to the screen width.
    pub fn draw_message_bar(&self, out: &mut impl Write) -> io::Result<()> {
        ansi::clear_line(out)?;
        if let Some(msg) = self.message {
            out.write_all(clip_to_width(msg, self.viewport.screen_cols).as_bytes())?;
        }
        Ok(())
    }
}

/// Longest prefix of `msg` that fits in `width` bytes without splitting a
/// character.
fn clip_to_width(msg: &str, width: usize) -> &str {
    let limit = width.min(msg.len());
    let end = (0..=limit).rev().find(|&i| msg.is_char_boundary(i)).unwrap_or(0);
    &msg[..end]
}

/// One document row, horizontally scrolled and clipped.
fn draw_row(out: &mut impl Write, row: &Row, col_offset: usize, width: usize) -> io::Result<()> {
    let render = row.render();
    let start = col_offset.min(render.len());
    let end = col_offset.saturating_add(width).min(render.len());

    let mut current: Option<u8> = None;
    for (&c, &hl) in render[start..end].iter().zip(&row.highlight()[start..end]) {
        if c.is_ascii_control() {
            let glyph = if c <= 26 { b'@' + c } else { b'?' };
            ansi::inverse(out)?;
            out.write_all(&[glyph])?;
            ansi::attrs_off(out)?;
            if let Some(color) = current {
                ansi::fg(out, color)?;
            }
        } else if hl == Highlight::Normal {
            if current.take().is_some() {
                ansi::fg_default(out)?;
            }
            out.write_all(&[c])?;
        } else {
            let color = hl.color();
            if current != Some(color) {
                current = Some(color);
                ansi::fg(out, color)?;
            }
            out.write_all(&[c])?;
        }
    }
    ansi::fg_default(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
