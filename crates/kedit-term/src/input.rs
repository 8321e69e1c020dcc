// SPDX-License-Identifier: MIT
//
// Terminal input decoder.
//
// Turns the raw byte stream from a `ByteSource` into logical keys, one key
// per call. Most bytes are keys on their own. A lone ESC (0x1B) triggers a
// short lookahead for the sequences terminals send for navigation keys:
//
//   ESC [ <digit> ~     Home (1, 7)  Del (3)  End (4, 8)  PgUp (5)  PgDn (6)
//   ESC [ <letter>      Up (A)  Down (B)  Right (C)  Left (D)  Home (H)  End (F)
//   ESC O <letter>      Home (H)  End (F)     (application cursor mode)
//
// Anything else after ESC, or a lookahead that times out, degrades to a
// plain Escape key. The bytes consumed by a failed lookahead are dropped.
//
// Decoding never aliases editor state: the decoder owns only its source,
// and every helper below is a pure function over the bytes it was given.

use std::io;

use crate::reader::ByteSource;

/// The escape byte that opens every multi-byte sequence.
const ESC: u8 = 0x1B;

// ─── Key ─────────────────────────────────────────────────────────────────────

/// A decoded logical key.
///
/// Bytes without special meaning (printable characters, control codes,
/// Enter, Backspace, a lone Escape) arrive as [`Byte`](Key::Byte) carrying
/// the literal code. Named variants exist only for keys that terminals
/// encode as escape sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A literal byte from the input stream.
    Byte(u8),
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
}

impl Key {
    /// Carriage return, which raw mode delivers for the Enter key.
    pub const ENTER: Self = Self::Byte(b'\r');
    /// A lone escape byte.
    pub const ESCAPE: Self = Self::Byte(ESC);
    /// DEL (0x7F), which terminals send for the Backspace key.
    pub const BACKSPACE: Self = Self::Byte(0x7F);

    /// The key produced by holding Ctrl with `letter` (`ctrl(b'q')` is 0x11).
    #[inline]
    #[must_use]
    pub const fn ctrl(letter: u8) -> Self {
        Self::Byte(letter & 0x1F)
    }

    /// Whether this is a printable ASCII byte (space through `~`).
    #[inline]
    #[must_use]
    pub const fn is_printable(self) -> bool {
        matches!(self, Self::Byte(b) if b >= 0x20 && b < 0x7F)
    }
}

// ─── Decoder ─────────────────────────────────────────────────────────────────

/// Pulls bytes from a [`ByteSource`] and returns one [`Key`] per call.
///
/// # Example
///
/// ```
/// use std::collections::VecDeque;
/// use kedit_term::input::{InputDecoder, Key};
///
/// let script: VecDeque<u8> = b"\x1b[Ax".iter().copied().collect();
/// let mut decoder = InputDecoder::new(script);
/// assert_eq!(decoder.read_key()?, Key::ArrowUp);
/// assert_eq!(decoder.read_key()?, Key::Byte(b'x'));
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct InputDecoder<S> {
    source: S,
}

impl<S: ByteSource> InputDecoder<S> {
    /// Wrap a byte source.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Mutable access to the underlying source.
    pub const fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Block until one logical key is available.
    ///
    /// Timeouts while waiting for the first byte are retried; timeouts
    /// inside an escape sequence end it as a plain Escape.
    ///
    /// # Errors
    ///
    /// Propagates any unrecoverable error from the byte source.
    pub fn read_key(&mut self) -> io::Result<Key> {
        let byte = loop {
            if let Some(b) = self.source.read_byte()? {
                break b;
            }
        };

        if byte != ESC {
            return Ok(Key::Byte(byte));
        }

        Ok(self.read_escape_tail()?.unwrap_or(Key::ESCAPE))
    }

    /// Read the bytes after an ESC. `None` means "not a sequence we know".
    fn read_escape_tail(&mut self) -> io::Result<Option<Key>> {
        let Some(first) = self.source.read_byte()? else {
            return Ok(None);
        };
        let Some(second) = self.source.read_byte()? else {
            return Ok(None);
        };

        let key = match (first, second) {
            (b'[', digit @ b'0'..=b'9') => match self.source.read_byte()? {
                Some(b'~') => tilde_key(digit),
                _ => None,
            },
            (b'[', letter) => csi_key(letter),
            (b'O', letter) => ss3_key(letter),
            _ => None,
        };

        Ok(key)
    }
}

// ─── Sequence tables ─────────────────────────────────────────────────────────

/// `ESC [ <digit> ~`: editing keypad.
const fn tilde_key(digit: u8) -> Option<Key> {
    match digit {
        b'1' | b'7' => Some(Key::Home),
        b'3' => Some(Key::Delete),
        b'4' | b'8' => Some(Key::End),
        b'5' => Some(Key::PageUp),
        b'6' => Some(Key::PageDown),
        _ => None,
    }
}

/// `ESC [ <letter>`: arrows plus xterm Home/End.
const fn csi_key(letter: u8) -> Option<Key> {
    match letter {
        b'A' => Some(Key::ArrowUp),
        b'B' => Some(Key::ArrowDown),
        b'C' => Some(Key::ArrowRight),
        b'D' => Some(Key::ArrowLeft),
        b'H' => Some(Key::Home),
        b'F' => Some(Key::End),
        _ => None,
    }
}

/// `ESC O <letter>`: Home/End in application cursor mode.
const fn ss3_key(letter: u8) -> Option<Key> {
    match letter {
        b'H' => Some(Key::Home),
        b'F' => Some(Key::End),
        _ => None,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
