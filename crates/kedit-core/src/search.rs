//! Search: incremental, direction-aware search over rendered rows.
//!
//! # Search flow
//!
//! 1. Ctrl-F opens a prompt with a [`SearchSession`] as its handler and
//!    remembers the cursor and scroll offsets
//! 2. Every keystroke re-runs the search: typing starts over from the top,
//!    arrows step to the next (Right/Down) or previous (Left/Up) match
//! 3. Enter keeps the cursor on the current match
//! 4. Escape puts the cursor and scroll offsets back
//!
//! Matching is a literal byte search on each row's render form, so a match
//! offset is a render column and is converted back to a char index before
//! the cursor moves. The match is painted by overwriting the row's
//! highlight with [`Highlight::Match`]; the original array is kept and put
//! back on the next keystroke.

use kedit_term::input::Key;
use tracing::debug;

use crate::document::Document;
use crate::editor::{Cursor, EditorState};
use crate::highlight::Highlight;
use crate::prompt::PromptHandler;

/// Prompt template for Ctrl-F.
pub const SEARCH_PROMPT: &str = "Search: {} (Use ESC/Enter/Arrows)";

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Search direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

// ---------------------------------------------------------------------------
// Row scan
// ---------------------------------------------------------------------------

/// Find the next row containing `query`, starting one step past `last`
/// and wrapping around. `None` for `last` starts at the top.
///
/// Returns `(row, render_offset)`. An empty query matches at offset 0.
#[must_use]
pub fn find_next(
    doc: &Document,
    query: &[u8],
    last: Option<usize>,
    direction: SearchDirection,
) -> Option<(usize, usize)> {
    let n = doc.len();
    let mut current = last;

    for _ in 0..n {
        let row = match (current, direction) {
            (None, SearchDirection::Forward) => 0,
            (None, SearchDirection::Backward) => n - 1,
            (Some(i), SearchDirection::Forward) => (i + 1) % n,
            (Some(i), SearchDirection::Backward) => i.checked_sub(1).unwrap_or(n - 1),
        };
        current = Some(row);

        if let Some(offset) = doc.row(row).and_then(|r| find_bytes(r.render(), query)) {
            return Some((row, offset));
        }
    }
    None
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ---------------------------------------------------------------------------
// SearchSession
// ---------------------------------------------------------------------------

/// Prompt handler for one Ctrl-F session.
#[derive(Debug)]
pub struct SearchSession {
    saved_cursor: Cursor,
    saved_row_offset: usize,
    saved_col_offset: usize,
    last_match: Option<usize>,
    direction: SearchDirection,
    /// Row whose highlight is overlaid, with its original highlight.
    painted: Option<(usize, Vec<Highlight>)>,
}

impl SearchSession {
    /// Remember where the cursor is so a cancel can return to it.
    #[must_use]
    pub fn new(state: &EditorState) -> Self {
        Self {
            saved_cursor: state.cursor,
            saved_row_offset: state.viewport.row_offset,
            saved_col_offset: state.viewport.col_offset,
            last_match: None,
            direction: SearchDirection::Forward,
            painted: None,
        }
    }

    fn unpaint(&mut self, doc: &mut Document) {
        if let Some((row, saved)) = self.painted.take() {
            doc.restore_highlight(row, saved);
        }
    }
}

impl PromptHandler<EditorState> for SearchSession {
    fn on_key(&mut self, ctx: &mut EditorState, input: &str, key: Key) {
        self.unpaint(&mut ctx.document);

        match key {
            Key::ENTER | Key::ESCAPE => {
                self.last_match = None;
                self.direction = SearchDirection::Forward;
                return;
            }
            Key::ArrowRight | Key::ArrowDown => self.direction = SearchDirection::Forward,
            Key::ArrowLeft | Key::ArrowUp => self.direction = SearchDirection::Backward,
            _ => {
                self.last_match = None;
                self.direction = SearchDirection::Forward;
            }
        }
        if self.last_match.is_none() {
            self.direction = SearchDirection::Forward;
        }

        let query = input.as_bytes();
        let Some((row, offset)) =
            find_next(&ctx.document, query, self.last_match, self.direction)
        else {
            return;
        };

        self.last_match = Some(row);
        ctx.cursor.cy = row;
        ctx.cursor.cx = ctx.document.row(row).map_or(0, |r| r.rx_to_cx(offset));
        // Bring the match to the top of the screen.
        ctx.viewport.row_offset = row;

        if let Some(r) = ctx.document.row(row) {
            self.painted = Some((row, r.highlight().to_vec()));
        }
        ctx.document.mark_match(row, offset, query.len());
    }

    fn on_submit(self: Box<Self>, ctx: &mut EditorState, input: String) {
        debug!(target: "search", query = %input, row = ctx.cursor.cy, "search confirmed");
    }

    fn on_cancel(self: Box<Self>, ctx: &mut EditorState) {
        ctx.cursor = self.saved_cursor;
        ctx.viewport.row_offset = self.saved_row_offset;
        ctx.viewport.col_offset = self.saved_col_offset;
        debug!(target: "search", "search cancelled");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
