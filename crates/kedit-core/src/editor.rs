//! Editor: owns all editing state and turns keys into edits and frames.
//!
//! [`Editor`] is the single context object for a session: the document,
//! the cursor, the viewport and the message bar live in [`EditorState`],
//! and an optional [`PromptSession`] captures keys while Ctrl-S (save as)
//! or Ctrl-F (search) is asking for input.
//!
//! One event-loop turn is [`Editor::step`]: draw a frame, read one key,
//! dispatch it. Tests call [`Editor::process_key`] and
//! [`Editor::refresh_screen`] directly and never need a terminal.

use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use kedit_term::input::{InputDecoder, Key};
use kedit_term::output::OutputBuffer;
use kedit_term::reader::ByteSource;
use tracing::{debug, trace, warn};

use crate::compositor::Frame;
use crate::document::Document;
use crate::error::EditorResult;
use crate::options::EditorOptions;
use crate::prompt::{PromptHandler, PromptSession, StatusLine};
use crate::search::{SearchSession, SEARCH_PROMPT};
use crate::viewport::Viewport;

const CTRL_F: Key = Key::ctrl(b'f');
const CTRL_L: Key = Key::ctrl(b'l');
const CTRL_N: Key = Key::ctrl(b'n');
const CTRL_P: Key = Key::ctrl(b'p');
const CTRL_Q: Key = Key::ctrl(b'q');
const CTRL_S: Key = Key::ctrl(b's');

const SAVE_AS_PROMPT: &str = "Save as: {} (ESC to cancel)";

/// What the event loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

// ---------------------------------------------------------------------------
// Cursor / status message
// ---------------------------------------------------------------------------

/// Cursor position.
///
/// `cx` indexes the row's chars and `cy` the rows; `cy == len` is the
/// virtual line below the last row. `rx` is the render column of `cx`,
/// recomputed before every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub cx: usize,
    pub cy: usize,
    pub rx: usize,
}

/// Message bar text and when it was set.
#[derive(Debug, Clone, Default)]
struct StatusMessage {
    text: String,
    set_at: Option<Instant>,
}

impl StatusMessage {
    fn visible(&self, now: Instant, timeout: Duration) -> Option<&str> {
        let set_at = self.set_at?;
        (!self.text.is_empty() && now.saturating_duration_since(set_at) < timeout)
            .then_some(self.text.as_str())
    }
}

// ---------------------------------------------------------------------------
// EditorState
// ---------------------------------------------------------------------------

/// Everything a key handler may change.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub document: Document,
    pub cursor: Cursor,
    pub viewport: Viewport,
    status: StatusMessage,
}

impl EditorState {
    #[must_use]
    pub fn new(document: Document, viewport: Viewport) -> Self {
        Self {
            document,
            viewport,
            ..Self::default()
        }
    }

    /// Current message bar text, expired or not.
    #[must_use]
    pub fn status(&self) -> &str {
        &self.status.text
    }

    /// Save the document, reporting the outcome on the message bar.
    pub fn save_document(&mut self) {
        match self.document.save() {
            Ok(bytes) => self.set_status(format!("{bytes} bytes written to disk")),
            Err(err) => {
                warn!(target: "io", error = %err, "save failed");
                self.set_status(format!("Can't save! I/O error: {err}"));
            }
        }
    }

    fn current_row_len(&self) -> Option<usize> {
        self.document.row(self.cursor.cy).map(crate::row::Row::len)
    }
}

impl StatusLine for EditorState {
    fn set_status(&mut self, text: String) {
        self.status = StatusMessage {
            text,
            set_at: Some(Instant::now()),
        };
    }
}

// ---------------------------------------------------------------------------
// Save as
// ---------------------------------------------------------------------------

/// Names an unnamed document, then saves it.
struct SaveAs;

impl PromptHandler<EditorState> for SaveAs {
    fn on_submit(self: Box<Self>, ctx: &mut EditorState, input: String) {
        ctx.document.set_path(input);
        ctx.save_document();
    }

    fn on_cancel(self: Box<Self>, ctx: &mut EditorState) {
        ctx.set_status("Save aborted".to_owned());
    }
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// The top-level controller.
#[derive(Debug)]
pub struct Editor {
    state: EditorState,
    prompt: Option<PromptSession<EditorState>>,
    options: EditorOptions,
    quit_times: u32,
    frame: OutputBuffer,
}

impl Editor {
    /// An editor with an empty document for a terminal of the given size.
    #[must_use]
    pub fn new(term_rows: usize, term_cols: usize, options: EditorOptions) -> Self {
        Self {
            state: EditorState::new(Document::new(), Viewport::new(term_rows, term_cols)),
            prompt: None,
            quit_times: options.quit_times,
            options,
            frame: OutputBuffer::new(),
        }
    }

    /// Replace the document with the contents of `path`.
    pub fn open(&mut self, path: impl AsRef<Path>) -> EditorResult<()> {
        self.state.document = Document::open(path)?;
        self.state.cursor = Cursor::default();
        self.state.viewport.row_offset = 0;
        self.state.viewport.col_offset = 0;
        Ok(())
    }

    #[must_use]
    pub const fn state(&self) -> &EditorState {
        &self.state
    }

    /// Whether a prompt is capturing keys.
    #[must_use]
    pub const fn is_prompting(&self) -> bool {
        self.prompt.is_some()
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.state.set_status(text.into());
    }

    /// Show the key-binding reminder.
    pub fn show_help(&mut self) {
        self.state.set_status(self.options.help_message.clone());
    }

    // -- Event loop ---------------------------------------------------------

    /// Draw a frame to `out`, then read and handle one key.
    ///
    /// # Errors
    ///
    /// Fails if the frame cannot be written or the input stream breaks.
    pub fn step<S: ByteSource>(
        &mut self,
        input: &mut InputDecoder<S>,
        out: &mut impl Write,
    ) -> EditorResult<Flow> {
        self.frame.clear();
        self.scroll();
        self.compose_frame()?;
        self.frame.flush_to(out)?;

        let key = input.read_key()?;
        Ok(self.process_key(key))
    }

    fn compose_frame(&mut self) -> io::Result<()> {
        frame_of(&self.state, &self.options).render(&mut self.frame)
    }

    /// Refresh `rx` and move the viewport so the cursor is on screen.
    pub fn scroll(&mut self) {
        let st = &mut self.state;
        st.cursor.rx = st
            .document
            .row(st.cursor.cy)
            .map_or(0, |row| row.cx_to_rx(st.cursor.cx));
        st.viewport.scroll(st.cursor.rx, st.cursor.cy);
    }

    // -- Dispatch -----------------------------------------------------------

    /// Handle one key.
    pub fn process_key(&mut self, key: Key) -> Flow {
        if let Some(prompt) = self.prompt.take() {
            self.prompt = prompt.feed(&mut self.state, key);
            return Flow::Continue;
        }
        trace!(target: "input", ?key, "dispatch");

        match key {
            Key::ENTER => self.insert_newline(),
            CTRL_Q => {
                if self.state.document.is_dirty() && self.quit_times > 0 {
                    self.set_status(format!(
                        "Warning! Unsaved changes. Press Ctrl-Q {} more times to quit.",
                        self.quit_times
                    ));
                    self.quit_times -= 1;
                    return Flow::Continue;
                }
                debug!(target: "editor", "quit");
                return Flow::Quit;
            }
            CTRL_S => self.save(),
            Key::Home => self.state.cursor.cx = 0,
            Key::End => {
                if let Some(len) = self.state.current_row_len() {
                    self.state.cursor.cx = len;
                }
            }
            CTRL_F => self.find(),
            Key::BACKSPACE => self.delete_char(),
            Key::Delete => {
                self.move_cursor(Key::ArrowRight);
                self.delete_char();
            }
            Key::PageUp => {
                self.state.cursor.cy = self.state.viewport.row_offset;
                for _ in 0..self.state.viewport.screen_rows {
                    self.move_cursor(Key::ArrowUp);
                }
            }
            Key::PageDown => {
                let view = self.state.viewport;
                self.state.cursor.cy = (view.row_offset + view.screen_rows)
                    .saturating_sub(1)
                    .min(self.state.document.len());
                for _ in 0..view.screen_rows {
                    self.move_cursor(Key::ArrowDown);
                }
            }
            CTRL_P => self.move_cursor(Key::ArrowUp),
            CTRL_N => self.move_cursor(Key::ArrowDown),
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight => {
                self.move_cursor(key);
            }
            CTRL_L | Key::ESCAPE => {}
            Key::Byte(byte) => self.insert_char(byte),
        }

        self.quit_times = self.options.quit_times;
        Flow::Continue
    }

    fn start_prompt(&mut self, template: &str, handler: Box<dyn PromptHandler<EditorState>>) {
        self.prompt = Some(PromptSession::start(&mut self.state, template, handler));
    }

    fn save(&mut self) {
        if self.state.document.path().is_none() {
            self.start_prompt(SAVE_AS_PROMPT, Box::new(SaveAs));
        } else {
            self.state.save_document();
        }
    }

    fn find(&mut self) {
        let session = SearchSession::new(&self.state);
        self.start_prompt(SEARCH_PROMPT, Box::new(session));
    }

    // -- Cursor -------------------------------------------------------------

    fn move_cursor(&mut self, key: Key) {
        let st = &mut self.state;
        let row_len = st.current_row_len();

        match key {
            Key::ArrowLeft => {
                if st.cursor.cx > 0 {
                    st.cursor.cx -= 1;
                } else if st.cursor.cy > 0 {
                    st.cursor.cy -= 1;
                    st.cursor.cx = st.current_row_len().unwrap_or(0);
                }
            }
            Key::ArrowRight => match row_len {
                Some(len) if st.cursor.cx < len => st.cursor.cx += 1,
                Some(len) if st.cursor.cx == len => {
                    st.cursor.cy += 1;
                    st.cursor.cx = 0;
                }
                _ => {}
            },
            Key::ArrowUp => st.cursor.cy = st.cursor.cy.saturating_sub(1),
            Key::ArrowDown => {
                if st.cursor.cy < st.document.len() {
                    st.cursor.cy += 1;
                }
            }
            _ => {}
        }

        let len = st.current_row_len().unwrap_or(0);
        st.cursor.cx = st.cursor.cx.min(len);
    }

    // -- Editing ------------------------------------------------------------

    fn insert_char(&mut self, byte: u8) {
        let st = &mut self.state;
        if st.cursor.cy == st.document.len() {
            st.document.insert_row(st.cursor.cy, b"");
        }
        st.document.insert_char(st.cursor.cy, st.cursor.cx, byte);
        st.cursor.cx += 1;
    }

    fn insert_newline(&mut self) {
        let st = &mut self.state;
        if st.cursor.cx == 0 {
            st.document.insert_row(st.cursor.cy, b"");
        } else {
            st.document.split_row(st.cursor.cy, st.cursor.cx);
        }
        st.cursor.cy += 1;
        st.cursor.cx = 0;
    }

    fn delete_char(&mut self) {
        let st = &mut self.state;
        if let Some((cy, cx)) = st.document.delete_char(st.cursor.cy, st.cursor.cx) {
            st.cursor.cy = cy;
            st.cursor.cx = cx;
        }
    }
}

fn frame_of<'a>(state: &'a EditorState, options: &EditorOptions) -> Frame<'a> {
    Frame {
        document: &state.document,
        viewport: &state.viewport,
        rx: state.cursor.rx,
        cy: state.cursor.cy,
        message: state.status.visible(Instant::now(), options.message_timeout),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;

    fn editor(lines: &[&str]) -> Editor {
        let mut ed = Editor::new(12, 40, EditorOptions::default());
        ed.state.document.load(lines.iter().map(|l| l.as_bytes()));
        ed
    }

    fn keys(ed: &mut Editor, keys: &[Key]) -> Flow {
        let mut flow = Flow::Continue;
        for &k in keys {
            flow = ed.process_key(k);
        }
        flow
    }

    fn type_str(ed: &mut Editor, s: &str) {
        for b in s.bytes() {
            ed.process_key(Key::Byte(b));
        }
    }

    fn text(ed: &Editor) -> String {
        String::from_utf8(ed.state.document.serialize()).unwrap()
    }

    fn pos(ed: &Editor) -> (usize, usize) {
        (ed.state.cursor.cx, ed.state.cursor.cy)
    }

    // -- Editing --

    #[test]
    fn typing_into_empty_document() {
        let mut ed = editor(&[]);
        type_str(&mut ed, "hi");
        assert_eq!(text(&ed), "hi\n");
        assert_eq!(pos(&ed), (2, 0));
        assert!(ed.state.document.is_dirty());
    }

    #[test]
    fn enter_splits_and_opens_rows() {
        let mut ed = editor(&["abcd"]);
        ed.state.cursor.cx = 2;
        keys(&mut ed, &[Key::ENTER]);
        assert_eq!(text(&ed), "ab\ncd\n");
        assert_eq!(pos(&ed), (0, 1));

        keys(&mut ed, &[Key::ENTER]);
        assert_eq!(text(&ed), "ab\n\ncd\n");
        assert_eq!(pos(&ed), (0, 2));
    }

    #[test]
    fn backspace_joins_rows() {
        let mut ed = editor(&["ab", "cd"]);
        ed.state.cursor = Cursor { cx: 0, cy: 1, rx: 0 };
        keys(&mut ed, &[Key::BACKSPACE]);
        assert_eq!(text(&ed), "abcd\n");
        assert_eq!(pos(&ed), (2, 0));
    }

    #[test]
    fn delete_removes_under_cursor() {
        let mut ed = editor(&["abc"]);
        ed.state.cursor.cx = 1;
        keys(&mut ed, &[Key::Delete]);
        assert_eq!(text(&ed), "ac\n");
        assert_eq!(pos(&ed), (1, 0));
    }

    #[test]
    fn delete_at_row_end_joins_next() {
        let mut ed = editor(&["ab", "cd"]);
        ed.state.cursor.cx = 2;
        keys(&mut ed, &[Key::Delete]);
        assert_eq!(text(&ed), "abcd\n");
        assert_eq!(pos(&ed), (2, 0));
    }

    #[test]
    fn typing_on_virtual_row_appends_row() {
        let mut ed = editor(&["a"]);
        ed.state.cursor.cy = 1;
        type_str(&mut ed, "b");
        assert_eq!(text(&ed), "a\nb\n");
    }

    #[test]
    fn refresh_and_escape_are_ignored() {
        let mut ed = editor(&["abc", "de"]);
        ed.state.cursor = Cursor { cx: 1, cy: 1, rx: 0 };
        assert_eq!(keys(&mut ed, &[CTRL_L, Key::ESCAPE, CTRL_L]), Flow::Continue);
        assert_eq!(text(&ed), "abc\nde\n");
        assert_eq!(pos(&ed), (1, 1));
        assert!(!ed.state.document.is_dirty());
        assert!(!ed.is_prompting());
    }

    // -- Motion --

    #[test]
    fn left_and_right_wrap_rows() {
        let mut ed = editor(&["ab", "c"]);
        ed.state.cursor.cx = 2;
        keys(&mut ed, &[Key::ArrowRight]);
        assert_eq!(pos(&ed), (0, 1));
        keys(&mut ed, &[Key::ArrowLeft]);
        assert_eq!(pos(&ed), (2, 0));
    }

    #[test]
    fn vertical_motion_clamps() {
        let mut ed = editor(&["long line", "x"]);
        ed.state.cursor.cx = 9;
        keys(&mut ed, &[Key::ArrowDown]);
        assert_eq!(pos(&ed), (1, 1));
        keys(&mut ed, &[Key::ArrowDown, Key::ArrowDown, Key::ArrowDown]);
        assert_eq!(pos(&ed), (0, 2));
        keys(&mut ed, &[CTRL_P, CTRL_P, CTRL_P, CTRL_P]);
        assert_eq!(pos(&ed), (0, 0));
        keys(&mut ed, &[CTRL_N]);
        assert_eq!(pos(&ed), (0, 1));
    }

    #[test]
    fn home_and_end() {
        let mut ed = editor(&["hello"]);
        keys(&mut ed, &[Key::End]);
        assert_eq!(pos(&ed), (5, 0));
        keys(&mut ed, &[Key::Home]);
        assert_eq!(pos(&ed), (0, 0));
    }

    #[test]
    fn page_down_and_up() {
        let lines: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut ed = editor(&refs);
        let page = ed.state.viewport.screen_rows;
        assert_eq!(page, 10);

        keys(&mut ed, &[Key::PageDown]);
        assert_eq!(ed.state.cursor.cy, 19);
        ed.scroll();
        assert_eq!(ed.state.viewport.row_offset, 10);

        keys(&mut ed, &[Key::PageUp]);
        assert_eq!(ed.state.cursor.cy, 0);
    }

    #[test]
    fn scroll_follows_cursor() {
        let lines = vec!["x"; 100];
        let mut ed = Editor::new(22, 40, EditorOptions::default());
        ed.state.document.load(lines);
        ed.state.cursor.cy = 99;
        ed.scroll();
        assert_eq!(ed.state.viewport.row_offset, 80);
        ed.state.cursor.cy = 0;
        ed.scroll();
        assert_eq!(ed.state.viewport.row_offset, 0);
    }

    // -- Quit --

    #[test]
    fn clean_document_quits_at_once() {
        let mut ed = editor(&["a"]);
        assert_eq!(keys(&mut ed, &[CTRL_Q]), Flow::Quit);
    }

    #[test]
    fn dirty_document_needs_confirmation() {
        let mut ed = editor(&[]);
        type_str(&mut ed, "x");

        assert_eq!(keys(&mut ed, &[CTRL_Q]), Flow::Continue);
        assert_eq!(
            ed.state.status(),
            "Warning! Unsaved changes. Press Ctrl-Q 3 more times to quit."
        );
        assert_eq!(keys(&mut ed, &[CTRL_Q, CTRL_Q]), Flow::Continue);
        assert!(ed.state.status().contains("Ctrl-Q 1 more"));
        assert_eq!(keys(&mut ed, &[CTRL_Q]), Flow::Quit);
    }

    #[test]
    fn other_key_resets_quit_counter() {
        let mut ed = editor(&[]);
        type_str(&mut ed, "x");
        keys(&mut ed, &[CTRL_Q, CTRL_Q, Key::ArrowLeft, CTRL_Q]);
        assert!(ed.state.status().contains("Ctrl-Q 3 more"));
    }

    // -- Search --

    #[test]
    fn search_cancel_restores_position() {
        let mut ed = editor(&["one", "two", "three", "two"]);
        ed.state.cursor = Cursor { cx: 3, cy: 1, rx: 0 };
        ed.scroll();
        let (row_off, col_off) = (ed.state.viewport.row_offset, ed.state.viewport.col_offset);

        keys(&mut ed, &[CTRL_F]);
        assert!(ed.is_prompting());
        assert_eq!(ed.state.status(), "Search:  (Use ESC/Enter/Arrows)");

        type_str(&mut ed, "thr");
        assert_eq!(pos(&ed), (0, 2));
        assert_eq!(ed.state.status(), "Search: thr (Use ESC/Enter/Arrows)");

        keys(&mut ed, &[Key::ESCAPE]);
        assert!(!ed.is_prompting());
        assert_eq!(pos(&ed), (3, 1));
        assert_eq!(ed.state.viewport.row_offset, row_off);
        assert_eq!(ed.state.viewport.col_offset, col_off);
        assert_eq!(ed.state.status(), "");
    }

    #[test]
    fn search_confirm_keeps_match() {
        let mut ed = editor(&["one", "two", "three", "two"]);
        keys(&mut ed, &[CTRL_F]);
        type_str(&mut ed, "two");
        assert_eq!(pos(&ed), (0, 1));
        keys(&mut ed, &[Key::ArrowDown, Key::ENTER]);
        assert_eq!(pos(&ed), (0, 3));
        assert!(!ed.is_prompting());
        assert!(ed
            .state
            .document
            .rows()
            .iter()
            .all(|r| r.highlight().iter().all(|&h| h != crate::highlight::Highlight::Match)));
    }

    #[test]
    fn prompt_swallows_editing_keys() {
        let mut ed = editor(&["abc"]);
        keys(&mut ed, &[CTRL_F, CTRL_Q, Key::ENTER]);
        assert!(ed.is_prompting());
        assert_eq!(text(&ed), "abc\n");
    }

    // -- Save --

    #[test]
    fn save_as_names_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.c");

        let mut ed = editor(&[]);
        type_str(&mut ed, "int x;");
        keys(&mut ed, &[CTRL_S]);
        assert!(ed.is_prompting());
        assert_eq!(ed.state.status(), "Save as:  (ESC to cancel)");

        type_str(&mut ed, path.to_str().unwrap());
        keys(&mut ed, &[Key::ENTER]);

        assert!(!ed.is_prompting());
        assert_eq!(ed.state.status(), "7 bytes written to disk");
        assert!(!ed.state.document.is_dirty());
        assert_eq!(ed.state.document.syntax().unwrap().filetype, "c");
        assert_eq!(std::fs::read(&path).unwrap(), b"int x;\n");
    }

    #[test]
    fn save_as_cancel() {
        let mut ed = editor(&[]);
        type_str(&mut ed, "x");
        keys(&mut ed, &[CTRL_S, Key::Byte(b'f'), Key::ESCAPE]);
        assert_eq!(ed.state.status(), "Save aborted");
        assert!(ed.state.document.path().is_none());
        assert!(ed.state.document.is_dirty());
    }

    #[test]
    fn save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut ed = editor(&["x"]);
        ed.state.document.set_path(dir.path().join("missing/dir/f"));
        keys(&mut ed, &[CTRL_S]);
        assert!(ed.state.status().starts_with("Can't save! I/O error: "));
        assert!(ed.state.document.is_dirty());
    }

    #[test]
    fn save_named_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "old\n").unwrap();

        let mut ed = editor(&[]);
        ed.open(&path).unwrap();
        type_str(&mut ed, "n");
        keys(&mut ed, &[CTRL_S]);
        assert_eq!(ed.state.status(), "5 bytes written to disk");
        assert_eq!(std::fs::read(&path).unwrap(), b"nold\n");
    }

    // -- Frames --

    /// Run one `step` that consumes `script` and return the drawn frame.
    fn drawn(ed: &mut Editor, script: &[u8]) -> String {
        let mut input = InputDecoder::new(script.iter().copied().collect::<VecDeque<u8>>());
        let mut out = Vec::new();
        ed.step(&mut input, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn frame_shows_fresh_message() {
        let mut ed = editor(&["a"]);
        ed.show_help();
        assert!(drawn(&mut ed, b"\x0c").contains("HELP: Ctrl-Q = quit"));
    }

    #[test]
    fn expired_message_is_hidden() {
        let options = EditorOptions {
            message_timeout: Duration::ZERO,
            ..EditorOptions::default()
        };
        let mut ed = Editor::new(12, 40, options);
        ed.show_help();
        assert!(!drawn(&mut ed, b"\x0c").contains("HELP"));
    }

    #[test]
    fn step_draws_then_handles_one_key() {
        let mut ed = editor(&[]);
        let script: VecDeque<u8> = b"\x1b[Cz".iter().copied().collect();
        let mut input = InputDecoder::new(script);
        let mut out = Vec::new();

        assert_eq!(ed.step(&mut input, &mut out).unwrap(), Flow::Continue);
        assert!(out.starts_with(b"\x1b[?25l\x1b[H"));
        assert_eq!(text(&ed), "");

        assert_eq!(ed.step(&mut input, &mut out).unwrap(), Flow::Continue);
        assert_eq!(text(&ed), "z\n");
    }
}
