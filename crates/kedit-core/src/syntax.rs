//! Syntax profiles: what the highlighter knows about each language.
//!
//! A [`SyntaxProfile`] names a filetype, the filename patterns that select
//! it, its keywords, and its comment markers. Profiles live in a static
//! [`REGISTRY`]; a document picks one when it is opened or renamed via
//! [`select`], and the choice never changes until the next rename.
//!
//! Keywords come in two priority classes. Secondary keywords (usually type
//! names) carry a trailing `|` in the table;
//! [`SyntaxProfile::keyword_classes`] strips it and reports the class.

use bitflags::bitflags;

use crate::highlight::Highlight;

bitflags! {
    /// Which literal kinds a profile highlights.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct SyntaxFlags: u8 {
        const NUMBERS = 0b0000_0001;
        const STRINGS = 0b0000_0010;
    }
}

/// Everything the highlighter needs to classify one language.
#[derive(Debug, PartialEq, Eq)]
pub struct SyntaxProfile {
    /// Short name shown in the status bar.
    pub filetype: &'static str,
    /// Patterns matched against the filename. Entries starting with `.` are
    /// compared with the extension; anything else is a substring match.
    pub filematch: &'static [&'static str],
    /// Keywords; a trailing `|` marks the secondary class.
    pub keywords: &'static [&'static str],
    pub singleline_comment: Option<&'static str>,
    /// Block comment `(start, end)` markers.
    pub multiline_comment: Option<(&'static str, &'static str)>,
    pub flags: SyntaxFlags,
}

impl SyntaxProfile {
    /// Whether this profile applies to `filename`.
    #[must_use]
    pub fn matches(&self, filename: &str) -> bool {
        let ext = filename.rfind('.').map(|dot| &filename[dot..]);
        self.filematch.iter().any(|pattern| {
            if pattern.starts_with('.') {
                ext == Some(*pattern)
            } else {
                filename.contains(pattern)
            }
        })
    }

    /// Keywords in priority order, with their classification.
    pub fn keyword_classes(&self) -> impl Iterator<Item = (&'static [u8], Highlight)> + '_ {
        self.keywords.iter().map(|&kw| match kw.strip_suffix('|') {
            Some(word) => (word.as_bytes(), Highlight::Keyword2),
            None => (kw.as_bytes(), Highlight::Keyword1),
        })
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

const LITERALS: SyntaxFlags = SyntaxFlags::NUMBERS.union(SyntaxFlags::STRINGS);

/// Every profile the editor knows, in match priority order.
pub static REGISTRY: &[SyntaxProfile] = &[
    SyntaxProfile {
        filetype: "c",
        filematch: &[".c", ".h", ".cpp"],
        keywords: &[
            "switch", "if", "while", "for", "break", "continue", "return", "else",
            "struct", "union", "typedef", "static", "enum", "class", "case",
            "int|", "long|", "double|", "float|", "char|", "unsigned|", "signed|",
            "void|",
        ],
        singleline_comment: Some("//"),
        multiline_comment: Some(("/*", "*/")),
        flags: LITERALS,
    },
    SyntaxProfile {
        filetype: "rust",
        filematch: &[".rs"],
        keywords: &[
            "fn", "let", "mut", "if", "else", "match", "while", "loop", "for", "in",
            "return", "break", "continue", "struct", "enum", "impl", "trait", "pub",
            "use", "mod", "const", "static", "where", "unsafe", "move", "ref",
            "i8|", "i16|", "i32|", "i64|", "u8|", "u16|", "u32|", "u64|", "usize|",
            "isize|", "f32|", "f64|", "bool|", "char|", "str|", "String|", "Self|",
            "Option|", "Result|", "Vec|",
        ],
        singleline_comment: Some("//"),
        multiline_comment: Some(("/*", "*/")),
        flags: LITERALS,
    },
    SyntaxProfile {
        filetype: "python",
        filematch: &[".py"],
        keywords: &[
            "def", "class", "if", "elif", "else", "for", "while", "return", "import",
            "from", "as", "with", "try", "except", "finally", "raise", "pass",
            "break", "continue", "lambda", "yield", "in", "is", "not", "and", "or",
            "None|", "True|", "False|", "self|", "int|", "str|", "float|", "list|",
            "dict|",
        ],
        singleline_comment: Some("#"),
        multiline_comment: None,
        flags: LITERALS,
    },
];

/// Pick the first registry profile that matches `filename`.
#[must_use]
pub fn select(filename: &str) -> Option<&'static SyntaxProfile> {
    REGISTRY.iter().find(|profile| profile.matches(filename))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
