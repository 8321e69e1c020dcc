//! A single document row and its derived render form.
//!
//! A [`Row`] stores the raw bytes of one line (`chars`, no trailing
//! newline) and two derived arrays kept in lock-step with it:
//!
//! - `render`: `chars` with every tab expanded to spaces up to the next
//!   multiple of [`TAB_STOP`]. Screen placement works in render columns.
//! - `highlight`: one [`Highlight`] per render byte.
//!
//! Every mutation regenerates `render` and resets `highlight` to the same
//! length, so the two can never be read out of step with `chars`. The
//! classification itself needs the neighbouring rows (block comments span
//! lines), so it is filled in by the owning
//! [`Document`](crate::document::Document) right after each mutation.

use crate::highlight::Highlight;

/// Render columns per tab stop.
pub const TAB_STOP: usize = 8;

/// One line of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub(crate) index: usize,
    chars: Vec<u8>,
    render: Vec<u8>,
    pub(crate) highlight: Vec<Highlight>,
    pub(crate) open_comment: bool,
}

impl Row {
    /// Build a row at position `index` from raw bytes.
    ///
    /// The highlight array starts out all-normal; the document classifies
    /// it once the row is in place.
    #[must_use]
    pub fn new(index: usize, chars: &[u8]) -> Self {
        let mut row = Self {
            index,
            chars: chars.to_vec(),
            ..Self::default()
        };
        row.update_render();
        row
    }

    // -- Accessors ----------------------------------------------------------

    /// Position of this row in its document.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Raw content bytes.
    #[inline]
    #[must_use]
    pub fn chars(&self) -> &[u8] {
        &self.chars
    }

    /// Tab-expanded content.
    #[inline]
    #[must_use]
    pub fn render(&self) -> &[u8] {
        &self.render
    }

    /// Classification of each render byte.
    #[inline]
    #[must_use]
    pub fn highlight(&self) -> &[Highlight] {
        &self.highlight
    }

    /// Whether a block comment is still open at the end of this row.
    #[inline]
    #[must_use]
    pub const fn open_comment(&self) -> bool {
        self.open_comment
    }

    /// Number of raw bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// True when the row has no content.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    // -- Coordinate mapping -------------------------------------------------

    /// Render column of char index `cx`.
    ///
    /// `cx` past the end is treated as the end of the row.
    #[must_use]
    pub fn cx_to_rx(&self, cx: usize) -> usize {
        self.chars
            .iter()
            .take(cx)
            .fold(0, |rx, &c| if c == b'\t' { next_tab_stop(rx) } else { rx + 1 })
    }

    /// Char index whose render span covers column `rx`.
    ///
    /// A column in the middle of a tab maps to that tab. Columns past the
    /// end map to `len()`.
    #[must_use]
    pub fn rx_to_cx(&self, rx: usize) -> usize {
        let mut cur = 0;
        for (cx, &c) in self.chars.iter().enumerate() {
            cur = if c == b'\t' { next_tab_stop(cur) } else { cur + 1 };
            if cur > rx {
                return cx;
            }
        }
        self.chars.len()
    }

    // -- Mutation (document-internal) ---------------------------------------

    /// Insert `byte` at `at`, clamped to the end of the row.
    pub(crate) fn insert_byte(&mut self, at: usize, byte: u8) {
        let at = at.min(self.chars.len());
        self.chars.insert(at, byte);
        self.update_render();
    }

    /// Remove the byte at `at`. Returns `false` if `at` is out of range.
    pub(crate) fn delete_byte(&mut self, at: usize) -> bool {
        if at >= self.chars.len() {
            return false;
        }
        self.chars.remove(at);
        self.update_render();
        true
    }

    /// Append bytes to the end of the row.
    pub(crate) fn append(&mut self, bytes: &[u8]) {
        self.chars.extend_from_slice(bytes);
        self.update_render();
    }

    /// Cut the row at `at`, returning everything from `at` on.
    pub(crate) fn split_off(&mut self, at: usize) -> Vec<u8> {
        let at = at.min(self.chars.len());
        let tail = self.chars.split_off(at);
        self.update_render();
        tail
    }

    /// Regenerate `render` from `chars` and reset `highlight` to match.
    fn update_render(&mut self) {
        let tabs = self.chars.iter().filter(|&&c| c == b'\t').count();
        let mut render = Vec::with_capacity(self.chars.len() + tabs * (TAB_STOP - 1));

        for &c in &self.chars {
            if c == b'\t' {
                render.push(b' ');
                while render.len() % TAB_STOP != 0 {
                    render.push(b' ');
                }
            } else {
                render.push(c);
            }
        }

        self.highlight.clear();
        self.highlight.resize(render.len(), Highlight::Normal);
        self.render = render;
    }
}

/// The column a tab at `rx` advances to.
#[inline]
const fn next_tab_stop(rx: usize) -> usize {
    rx + (TAB_STOP - 1) - (rx % TAB_STOP) + 1
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
