//! Document: the ordered rows of one file plus its metadata.
//!
//! The [`Document`] owns every [`Row`] and is the only place rows are
//! mutated. Each edit keeps three things consistent before returning:
//!
//! - row indices are contiguous (`rows[i].index() == i`)
//! - the touched rows' render and highlight arrays are re-derived
//! - the dirty flag is set
//!
//! Highlighting depends on the row above (an open block comment carries
//! over), so an edit can change the colours of rows far below it. After
//! re-deriving a row, [`Document::update_syntax`] keeps walking down while
//! the row's `open_comment` flag flips, and stops at the first row whose
//! flag is unchanged. The walk is a loop, not recursion, so a file with one
//! enormous unterminated comment costs time but no stack.
//!
//! # File format
//!
//! Plain newline-delimited bytes. On load every trailing `\r` and `\n` is
//! stripped from each line; on save each row is written followed by a
//! single `\n`. CRLF files therefore come back as LF.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{EditorError, EditorResult};
use crate::highlight::{highlight_row, Highlight};
use crate::row::Row;
use crate::syntax::{self, SyntaxProfile};

/// An in-memory file.
#[derive(Debug, Clone, Default)]
pub struct Document {
    rows: Vec<Row>,
    dirty: bool,
    path: Option<PathBuf>,
    syntax: Option<&'static SyntaxProfile>,
}

impl Document {
    /// An empty, unnamed, clean document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `path` into a new document.
    ///
    /// The syntax profile is chosen from the file name. A missing or
    /// unreadable file is an error; there is no "new file" fallback.
    pub fn open(path: impl AsRef<Path>) -> EditorResult<Self> {
        let path = path.as_ref();
        let open_err = |source| EditorError::Open {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(open_err)?;
        let lines = BufReader::new(file)
            .split(b'\n')
            .collect::<io::Result<Vec<_>>>()
            .map_err(open_err)?;

        let mut doc = Self::new();
        doc.path = Some(path.to_path_buf());
        doc.select_syntax();
        doc.load(lines);

        debug!(target: "io", path = %path.display(), rows = doc.len(), "opened");
        Ok(doc)
    }

    /// Replace the contents with one row per line, stripping trailing CR/LF.
    ///
    /// Leaves the document clean.
    pub fn load<I, L>(&mut self, lines: I)
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        self.rows = lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| Row::new(i, trim_line_end(line.as_ref())))
            .collect();
        self.rehighlight_all();
        self.dirty = false;
    }

    // -- Accessors ----------------------------------------------------------

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn row(&self, at: usize) -> Option<&Row> {
        self.rows.get(at)
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// True if the document differs from what was last loaded or saved.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Adopt a new file name. Re-selects the syntax profile and re-derives
    /// every row's highlight. The document becomes dirty until saved.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
        self.select_syntax();
        self.rehighlight_all();
        self.dirty = true;
    }

    /// The active syntax profile, if the file name matched one.
    #[must_use]
    pub const fn syntax(&self) -> Option<&'static SyntaxProfile> {
        self.syntax
    }

    fn select_syntax(&mut self) {
        self.syntax = self
            .path
            .as_deref()
            .and_then(Path::to_str)
            .and_then(syntax::select);
    }

    // -- Editing ------------------------------------------------------------

    /// Insert a row holding `chars` at position `at` (`0..=len`).
    pub fn insert_row(&mut self, at: usize, chars: &[u8]) {
        if at > self.rows.len() {
            return;
        }
        self.rows.insert(at, Row::new(at, chars));
        self.renumber_from(at + 1);

        self.update_syntax(at);
        // The row pushed down was classified under the old seed.
        if at + 1 < self.rows.len() {
            self.update_syntax(at + 1);
        }
        self.dirty = true;
    }

    /// Remove row `at`.
    pub fn delete_row(&mut self, at: usize) {
        if at >= self.rows.len() {
            return;
        }
        self.rows.remove(at);
        self.renumber_from(at);
        if at < self.rows.len() {
            self.update_syntax(at);
        }
        self.dirty = true;
    }

    /// Insert `byte` into row `row` at `at` (clamped to the row length).
    pub fn insert_char(&mut self, row: usize, at: usize, byte: u8) {
        let Some(r) = self.rows.get_mut(row) else {
            return;
        };
        r.insert_byte(at, byte);
        self.update_syntax(row);
        self.dirty = true;
    }

    /// Delete the byte before `at` in row `row`.
    ///
    /// At the start of a row (other than the first) the row is joined onto
    /// the end of the previous one. Returns the cursor position `(row, col)`
    /// after the edit, or `None` if nothing changed.
    pub fn delete_char(&mut self, row: usize, at: usize) -> Option<(usize, usize)> {
        if row >= self.rows.len() {
            return None;
        }

        if at > 0 {
            if !self.rows[row].delete_byte(at - 1) {
                return None;
            }
            self.update_syntax(row);
            self.dirty = true;
            return Some((row, at - 1));
        }

        if row == 0 {
            return None;
        }
        let joint = self.rows[row - 1].len();
        let tail = self.rows[row].chars().to_vec();
        self.rows[row - 1].append(&tail);
        self.update_syntax(row - 1);
        self.delete_row(row);
        Some((row - 1, joint))
    }

    /// Break row `row` at `at`, moving the tail to a new row below it.
    pub fn split_row(&mut self, row: usize, at: usize) {
        let Some(r) = self.rows.get_mut(row) else {
            return;
        };
        let tail = r.split_off(at);
        self.update_syntax(row);
        self.insert_row(row + 1, &tail);
    }

    // -- Highlight overlay --------------------------------------------------

    /// Paint `len` render bytes of row `row` from `start` as a search match.
    pub(crate) fn mark_match(&mut self, row: usize, start: usize, len: usize) {
        if let Some(r) = self.rows.get_mut(row) {
            let end = start.saturating_add(len).min(r.highlight.len());
            if start < end {
                r.highlight[start..end].fill(Highlight::Match);
            }
        }
    }

    /// Put back a highlight array saved before [`mark_match`](Self::mark_match).
    ///
    /// Ignored if the row's render length no longer matches.
    pub(crate) fn restore_highlight(&mut self, row: usize, saved: Vec<Highlight>) {
        if let Some(r) = self.rows.get_mut(row) {
            if r.highlight.len() == saved.len() {
                r.highlight = saved;
            }
        }
    }

    // -- Persistence --------------------------------------------------------

    /// Every row followed by `\n`.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let total = self.rows.iter().map(|r| r.len() + 1).sum();
        let mut buf = Vec::with_capacity(total);
        for row in &self.rows {
            buf.extend_from_slice(row.chars());
            buf.push(b'\n');
        }
        buf
    }

    /// Write the document to its path. Returns the number of bytes written.
    ///
    /// The file is opened in place (created with mode 0644 if missing),
    /// truncated to the new length, and written. On failure the document
    /// stays dirty.
    pub fn save(&mut self) -> EditorResult<usize> {
        let path = self.path.clone().ok_or(EditorError::Unnamed)?;
        let buf = self.serialize();

        write_in_place(&path, &buf).map_err(|source| EditorError::Save {
            path: path.clone(),
            source,
        })?;

        self.dirty = false;
        debug!(target: "io", path = %path.display(), bytes = buf.len(), "saved");
        Ok(buf.len())
    }

    // -- Internals ----------------------------------------------------------

    fn renumber_from(&mut self, from: usize) {
        for (i, row) in self.rows.iter_mut().enumerate().skip(from) {
            row.index = i;
        }
    }

    /// Re-derive row `at`, then each following row while the previous
    /// row's `open_comment` flag changed.
    fn update_syntax(&mut self, at: usize) {
        let mut at = at;
        while at < self.rows.len() {
            let seed = at > 0 && self.rows[at - 1].open_comment;
            if !highlight_row(&mut self.rows[at], self.syntax, seed) {
                break;
            }
            at += 1;
        }
    }

    fn rehighlight_all(&mut self) {
        let mut seed = false;
        for row in &mut self.rows {
            highlight_row(row, self.syntax, seed);
            seed = row.open_comment;
        }
    }
}

fn trim_line_end(mut line: &[u8]) -> &[u8] {
    while let [rest @ .., b'\n' | b'\r'] = line {
        line = rest;
    }
    line
}

fn write_in_place(path: &Path, buf: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }

    let mut file = options.open(path)?;
    file.set_len(buf.len() as u64)?;
    file.write_all(buf)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(lines: &[&str]) -> Document {
        let mut d = Document::new();
        d.load(lines.iter().map(|l| l.as_bytes()));
        d
    }

    fn c_doc(lines: &[&str]) -> Document {
        let mut d = doc(lines);
        d.set_path("main.c");
        d
    }

    fn text(d: &Document) -> Vec<String> {
        d.rows()
            .iter()
            .map(|r| String::from_utf8_lossy(r.chars()).into_owned())
            .collect()
    }

    fn assert_indices(d: &Document) {
        for (i, row) in d.rows().iter().enumerate() {
            assert_eq!(row.index(), i);
        }
    }

    fn all(d: &Document, row: usize, hl: Highlight) -> bool {
        d.row(row).unwrap().highlight().iter().all(|&h| h == hl)
    }

    // -- Load / serialize --

    #[test]
    fn new_document_is_empty_and_clean() {
        let d = Document::new();
        assert!(d.is_empty());
        assert!(!d.is_dirty());
        assert!(d.path().is_none());
        assert!(d.syntax().is_none());
    }

    #[test]
    fn load_strips_line_endings() {
        let mut d = Document::new();
        d.load(["ab\r\n", "cd\n"]);
        assert_eq!(text(&d), vec!["ab", "cd"]);
        assert_eq!(d.serialize(), b"ab\ncd\n");
        assert!(!d.is_dirty());
    }

    #[test]
    fn load_keeps_inner_carriage_returns() {
        let d = doc(&["a\rb\r\r"]);
        assert_eq!(d.row(0).unwrap().chars(), b"a\rb");
    }

    #[test]
    fn serialize_empty_document() {
        assert!(Document::new().serialize().is_empty());
    }

    #[test]
    fn serialize_keeps_blank_rows() {
        let d = doc(&["", "x", ""]);
        assert_eq!(d.serialize(), b"\nx\n\n");
    }

    // -- Rows --

    #[test]
    fn insert_row_renumbers() {
        let mut d = doc(&["a", "c"]);
        d.insert_row(1, b"b");
        assert_eq!(text(&d), vec!["a", "b", "c"]);
        assert_indices(&d);
        assert!(d.is_dirty());
    }

    #[test]
    fn insert_row_at_end_and_past_end() {
        let mut d = doc(&["a"]);
        d.insert_row(1, b"b");
        d.insert_row(5, b"z");
        assert_eq!(text(&d), vec!["a", "b"]);
    }

    #[test]
    fn delete_row_renumbers() {
        let mut d = doc(&["a", "b", "c"]);
        d.delete_row(0);
        assert_eq!(text(&d), vec!["b", "c"]);
        assert_indices(&d);
        assert!(d.is_dirty());
    }

    #[test]
    fn delete_row_out_of_range_is_noop() {
        let mut d = doc(&["a"]);
        d.delete_row(1);
        assert_eq!(text(&d), vec!["a"]);
        assert!(!d.is_dirty());
    }

    // -- Characters --

    #[test]
    fn insert_then_delete_restores_row() {
        let mut d = doc(&["hello"]);
        d.insert_char(0, 2, b'X');
        assert_eq!(text(&d), vec!["heXllo"]);
        assert_eq!(d.delete_char(0, 3), Some((0, 2)));
        assert_eq!(text(&d), vec!["hello"]);
        assert!(d.is_dirty());
    }

    #[test]
    fn insert_char_clamps_position() {
        let mut d = doc(&["ab"]);
        d.insert_char(0, 99, b'c');
        assert_eq!(text(&d), vec!["abc"]);
    }

    #[test]
    fn insert_char_on_missing_row_is_noop() {
        let mut d = doc(&["ab"]);
        d.insert_char(1, 0, b'c');
        assert_eq!(text(&d), vec!["ab"]);
        assert!(!d.is_dirty());
    }

    #[test]
    fn delete_at_document_start_is_noop() {
        let mut d = doc(&["ab"]);
        assert_eq!(d.delete_char(0, 0), None);
        assert!(!d.is_dirty());
    }

    #[test]
    fn delete_on_virtual_row_is_noop() {
        let mut d = doc(&["ab"]);
        assert_eq!(d.delete_char(1, 0), None);
    }

    #[test]
    fn delete_at_row_start_merges() {
        let mut d = doc(&["ab", "cd", "ef"]);
        assert_eq!(d.delete_char(1, 0), Some((0, 2)));
        assert_eq!(text(&d), vec!["abcd", "ef"]);
        assert_indices(&d);
    }

    #[test]
    fn split_then_merge_restores_row() {
        let mut d = doc(&["hello world"]);
        d.split_row(0, 5);
        assert_eq!(text(&d), vec!["hello", " world"]);
        assert_indices(&d);

        assert_eq!(d.delete_char(1, 0), Some((0, 5)));
        assert_eq!(text(&d), vec!["hello world"]);
        assert_eq!(d.len(), 1);
        assert!(d.is_dirty());
    }

    #[test]
    fn split_at_ends() {
        let mut d = doc(&["ab"]);
        d.split_row(0, 2);
        d.split_row(0, 0);
        assert_eq!(text(&d), vec!["", "ab", ""]);
    }

    // -- Highlight propagation --

    #[test]
    fn comment_spans_rows() {
        let d = c_doc(&["/* start", "middle", "end */ code"]);

        assert!(all(&d, 0, Highlight::MlComment));
        assert!(all(&d, 1, Highlight::MlComment));
        let last = d.row(2).unwrap();
        assert!(last.highlight()[..6].iter().all(|&h| h == Highlight::MlComment));
        assert!(last.highlight()[6..].iter().all(|&h| !h.is_comment()));

        assert!(d.row(0).unwrap().open_comment());
        assert!(d.row(1).unwrap().open_comment());
        assert!(!last.open_comment());
    }

    #[test]
    fn opening_a_comment_recolors_rows_below() {
        let mut d = c_doc(&["x", "int a;", "int b;"]);
        assert!(!all(&d, 2, Highlight::MlComment));

        d.insert_char(0, 0, b'*');
        d.insert_char(0, 0, b'/');
        assert!(all(&d, 1, Highlight::MlComment));
        assert!(all(&d, 2, Highlight::MlComment));

        assert_eq!(d.delete_char(0, 1), Some((0, 0)));
        assert_eq!(d.row(1).unwrap().highlight()[0], Highlight::Keyword2);
        assert_eq!(d.row(2).unwrap().highlight()[0], Highlight::Keyword2);
    }

    #[test]
    fn closing_row_inserted_inside_comment() {
        let mut d = c_doc(&["/*", "a", "b"]);
        d.insert_row(1, b"*/");
        assert!(!d.row(1).unwrap().open_comment());
        assert!(all(&d, 2, Highlight::Normal));
        assert!(all(&d, 3, Highlight::Normal));
    }

    #[test]
    fn plain_row_inserted_below_opener_stays_commented() {
        let mut d = c_doc(&["/*", "a */ int"]);
        d.insert_row(1, b"mid");
        assert!(all(&d, 1, Highlight::MlComment));
        assert_eq!(d.row(2).unwrap().highlight()[5], Highlight::Keyword2);
    }

    #[test]
    fn deleting_opener_row_uncomments_below() {
        let mut d = c_doc(&["/*", "int"]);
        d.delete_row(0);
        assert!(all(&d, 0, Highlight::Keyword2));
    }

    #[test]
    fn long_unterminated_comment_does_not_recurse() {
        let lines = vec!["x"; 50_000];
        let mut d = c_doc(&lines);
        d.insert_row(0, b"/*");
        assert!(all(&d, 50_000, Highlight::MlComment));
    }

    // -- Path / syntax --

    #[test]
    fn set_path_selects_syntax_and_rehighlights() {
        let mut d = doc(&["int x;"]);
        assert!(all(&d, 0, Highlight::Normal));
        d.set_path("a.c");
        assert_eq!(d.syntax().unwrap().filetype, "c");
        assert_eq!(d.row(0).unwrap().highlight()[0], Highlight::Keyword2);
        assert!(d.is_dirty());
    }

    #[test]
    fn unknown_extension_has_no_syntax() {
        let mut d = doc(&["x"]);
        d.set_path("notes.txt");
        assert!(d.syntax().is_none());
    }

    // -- Disk --

    #[test]
    fn save_without_path_is_unnamed() {
        let mut d = doc(&["x"]);
        assert!(matches!(d.save(), Err(EditorError::Unnamed)));
    }

    #[test]
    fn save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.c");

        let mut d = doc(&["int main() {", "\treturn 0;", "}"]);
        d.set_path(&path);
        let n = d.save().unwrap();
        assert!(!d.is_dirty());
        assert_eq!(n, d.serialize().len());

        let back = Document::open(&path).unwrap();
        assert_eq!(text(&back), text(&d));
        assert!(!back.is_dirty());
        assert_eq!(back.syntax().unwrap().filetype, "c");
    }

    #[cfg(unix)]
    #[test]
    fn save_creates_file_readable_by_all_writable_by_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.txt");
        let mut d = doc(&["x"]);
        d.set_path(&path);
        d.save().unwrap();

        // 0644 narrowed by the process umask.
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & !0o644, 0, "mode {mode:o}");
        assert_eq!(mode & 0o600, 0o600, "mode {mode:o}");
    }

    #[test]
    fn save_truncates_longer_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "a much longer previous body\n").unwrap();

        let mut d = Document::open(&path).unwrap();
        d.delete_row(0);
        d.insert_row(0, b"hi");
        d.save().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hi\n");
    }

    #[test]
    fn open_crlf_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dos.txt");
        std::fs::write(&path, "one\r\ntwo\r\n").unwrap();

        let d = Document::open(&path).unwrap();
        assert_eq!(text(&d), vec!["one", "two"]);
        assert_eq!(d.serialize(), b"one\ntwo\n");
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Document::open(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, EditorError::Open { .. }));
    }

    #[test]
    fn save_into_missing_directory_fails_and_stays_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let mut d = doc(&["x"]);
        d.set_path(dir.path().join("no/such/dir/f"));
        assert!(matches!(d.save(), Err(EditorError::Save { .. })));
        assert!(d.is_dirty());
    }
}
