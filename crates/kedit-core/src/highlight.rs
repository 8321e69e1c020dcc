//! Syntax highlighting: per-byte classification of a row's render form.
//!
//! [`highlight_row`] scans one row left to right under a
//! [`SyntaxProfile`], tracking three bits of local state: whether the
//! previous byte was a separator, which quote (if any) opened the current
//! string, and whether a block comment is open. The block-comment state is
//! seeded from the previous row and written back to the row as
//! `open_comment`; the function reports whether that flag changed so the
//! document can walk forward re-deriving rows until the state settles.
//!
//! Decision order per byte:
//!
//! 1. line comment marker (outside strings and block comments): rest of
//!    the row is a comment
//! 2. inside a block comment: comment byte, or the closing marker
//! 3. block comment opening marker
//! 4. string literals (backslash swallows the next byte unchecked)
//! 5. numbers: a digit after a separator or another number byte, or a `.`
//!    directly after a number byte
//! 6. keywords, only at a separator boundary and only when followed by a
//!    separator or the end of the row
//! 7. anything else stays normal

use crate::row::Row;
use crate::syntax::{SyntaxFlags, SyntaxProfile};

/// Classification of a single render byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Highlight {
    #[default]
    Normal,
    /// Line comment.
    Comment,
    /// Block comment, including its markers.
    MlComment,
    /// Primary keyword (control flow, declarations).
    Keyword1,
    /// Secondary keyword (types).
    Keyword2,
    String,
    Number,
    /// Current search match.
    Match,
}

impl Highlight {
    /// SGR foreground code for this classification.
    #[must_use]
    pub const fn color(self) -> u8 {
        match self {
            Self::Comment | Self::MlComment => 36,
            Self::Keyword1 => 33,
            Self::Keyword2 => 32,
            Self::String => 35,
            Self::Number => 31,
            Self::Match => 34,
            Self::Normal => 39,
        }
    }

    /// Either kind of comment.
    #[inline]
    #[must_use]
    pub const fn is_comment(self) -> bool {
        matches!(self, Self::Comment | Self::MlComment)
    }
}

/// Whitespace, NUL, or one of `,.()+-/*=~%<>[];`.
#[must_use]
pub fn is_separator(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C | 0)
        || b",.()+-/*=~%<>[];".contains(&c)
}

/// Re-derive `row.highlight` from `row.render`.
///
/// `starts_in_comment` is the previous row's `open_comment` (false for the
/// first row). Returns `true` when the row's own `open_comment` changed,
/// meaning the next row was classified under a stale seed.
///
/// With no profile the whole row is normal and no comment stays open.
pub fn highlight_row(row: &mut Row, syntax: Option<&SyntaxProfile>, starts_in_comment: bool) -> bool {
    let mut hl = vec![Highlight::Normal; row.render().len()];

    let in_comment = match syntax {
        Some(syntax) => classify(row.render(), &mut hl, syntax, starts_in_comment),
        None => false,
    };

    row.highlight = hl;
    let changed = row.open_comment != in_comment;
    row.open_comment = in_comment;
    changed
}

/// Fill `hl` for `render`; returns whether a block comment is open at the end.
fn classify(
    render: &[u8],
    hl: &mut [Highlight],
    syntax: &SyntaxProfile,
    starts_in_comment: bool,
) -> bool {
    let line_comment = syntax
        .singleline_comment
        .map(str::as_bytes)
        .filter(|m| !m.is_empty());
    let block_comment = syntax
        .multiline_comment
        .map(|(start, end)| (start.as_bytes(), end.as_bytes()))
        .filter(|(start, end)| !start.is_empty() && !end.is_empty());
    let strings = syntax.flags.contains(SyntaxFlags::STRINGS);
    let numbers = syntax.flags.contains(SyntaxFlags::NUMBERS);

    let mut prev_sep = true;
    let mut in_string: Option<u8> = None;
    let mut in_comment = starts_in_comment && block_comment.is_some();

    let mut i = 0;
    while i < render.len() {
        let c = render[i];
        let rest = &render[i..];
        let prev_hl = if i > 0 { hl[i - 1] } else { Highlight::Normal };

        if let Some(marker) = line_comment {
            if in_string.is_none() && !in_comment && rest.starts_with(marker) {
                hl[i..].fill(Highlight::Comment);
                break;
            }
        }

        if let Some((start, end)) = block_comment {
            if in_string.is_none() {
                if in_comment {
                    if rest.starts_with(end) {
                        hl[i..i + end.len()].fill(Highlight::MlComment);
                        i += end.len();
                        in_comment = false;
                        prev_sep = true;
                    } else {
                        hl[i] = Highlight::MlComment;
                        i += 1;
                    }
                    continue;
                } else if rest.starts_with(start) {
                    hl[i..i + start.len()].fill(Highlight::MlComment);
                    i += start.len();
                    in_comment = true;
                    continue;
                }
            }
        }

        if strings {
            if let Some(quote) = in_string {
                hl[i] = Highlight::String;
                if c == b'\\' && i + 1 < render.len() {
                    hl[i + 1] = Highlight::String;
                    i += 2;
                    continue;
                }
                if c == quote {
                    in_string = None;
                }
                i += 1;
                prev_sep = true;
                continue;
            } else if c == b'"' || c == b'\'' {
                in_string = Some(c);
                hl[i] = Highlight::String;
                i += 1;
                continue;
            }
        }

        if numbers
            && ((c.is_ascii_digit() && (prev_sep || prev_hl == Highlight::Number))
                || (c == b'.' && prev_hl == Highlight::Number))
        {
            hl[i] = Highlight::Number;
            i += 1;
            prev_sep = false;
            continue;
        }

        if prev_sep {
            if let Some((len, class)) = match_keyword(syntax, rest) {
                hl[i..i + len].fill(class);
                i += len;
                prev_sep = false;
                continue;
            }
        }

        prev_sep = is_separator(c);
        i += 1;
    }

    in_comment
}

/// First keyword that `rest` starts with and that ends at a separator.
fn match_keyword(syntax: &SyntaxProfile, rest: &[u8]) -> Option<(usize, Highlight)> {
    syntax.keyword_classes().find_map(|(word, class)| {
        let bounded = rest.get(word.len()).is_none_or(|&next| is_separator(next));
        (!word.is_empty() && rest.starts_with(word) && bounded).then_some((word.len(), class))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
