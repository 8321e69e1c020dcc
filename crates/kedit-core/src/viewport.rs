//! Viewport: the visible window onto the document.
//!
//! Offsets are in document rows and render columns. The terminal's last two
//! lines belong to the status and message bars, so the text area is two
//! rows shorter than the terminal.

/// Lines reserved below the text area (status bar + message bar).
pub const RESERVED_ROWS: usize = 2;

/// Scroll offsets and text-area dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// First visible document row.
    pub row_offset: usize,
    /// First visible render column.
    pub col_offset: usize,
    /// Height of the text area.
    pub screen_rows: usize,
    /// Width of the text area.
    pub screen_cols: usize,
}

impl Viewport {
    /// A viewport for a terminal of `term_rows` x `term_cols`.
    #[must_use]
    pub const fn new(term_rows: usize, term_cols: usize) -> Self {
        Self {
            row_offset: 0,
            col_offset: 0,
            screen_rows: term_rows.saturating_sub(RESERVED_ROWS),
            screen_cols: term_cols,
        }
    }

    /// Move the offsets the least amount needed to show `(rx, cy)`.
    pub const fn scroll(&mut self, rx: usize, cy: usize) {
        if self.screen_rows > 0 {
            if cy < self.row_offset {
                self.row_offset = cy;
            }
            if cy >= self.row_offset + self.screen_rows {
                self.row_offset = cy + 1 - self.screen_rows;
            }
        }

        if self.screen_cols > 0 {
            if rx < self.col_offset {
                self.col_offset = rx;
            }
            if rx >= self.col_offset + self.screen_cols {
                self.col_offset = rx + 1 - self.screen_cols;
            }
        }
    }

    /// Screen position of `(rx, cy)` relative to the text area's top-left.
    #[must_use]
    pub const fn to_screen(&self, rx: usize, cy: usize) -> (usize, usize) {
        (
            rx.saturating_sub(self.col_offset),
            cy.saturating_sub(self.row_offset),
        )
    }
}
