// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Byte sources: where the input decoder gets its bytes.
//
// The editor is single-threaded: it blocks on stdin for at most one short
// timeout, processes whatever key arrived, draws a frame, and blocks again.
// `ByteSource` is the seam between that loop and the outside world. The
// real implementation polls the stdin file descriptor; tests feed a
// `VecDeque<u8>` script instead.
//
// Timeouts are not errors. A source returns `Ok(None)` when the timeout
// elapsed with nothing to read, and the decoder decides what that means
// (keep waiting for a first byte, or give up on an escape sequence).

use std::collections::VecDeque;
use std::io;

/// How long a single read waits for a byte (milliseconds).
///
/// Short enough that a lone ESC resolves without perceptible lag, long
/// enough that the idle loop costs nothing.
pub const READ_TIMEOUT_MS: i32 = 100;

/// A blocking, timeout-bounded source of raw input bytes.
pub trait ByteSource {
    /// Read one byte.
    ///
    /// Returns `Ok(None)` when the read timed out with no data.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying stream fails or is closed.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

/// Scripted input: pops bytes from the front, then reports timeouts.
impl ByteSource for VecDeque<u8> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.pop_front())
    }
}

// ─── StdinReader ─────────────────────────────────────────────────────────────

/// Reads stdin one byte at a time with a [`READ_TIMEOUT_MS`] timeout.
///
/// # Example
///
/// ```no_run
/// use kedit_term::reader::{ByteSource, StdinReader};
///
/// let mut reader = StdinReader::new();
/// if let Some(byte) = reader.read_byte()? {
///     println!("got {byte:#04x}");
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct StdinReader {
    _private: (),
}

impl StdinReader {
    /// Create a reader over the process's stdin.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl ByteSource for StdinReader {
    /// Polls stdin, then reads a single byte.
    ///
    /// A readable descriptor that yields zero bytes means the other end
    /// hung up; that is reported as `UnexpectedEof` so the editor can exit
    /// instead of spinning.
    #[cfg(unix)]
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        use std::os::unix::io::AsRawFd;

        let fd = io::stdin().as_raw_fd();

        let ready = unsafe {
            let mut pfd = libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            };
            libc::poll(&raw mut pfd, 1, READ_TIMEOUT_MS)
        };

        if ready == 0 {
            return Ok(None);
        }
        if ready < 0 {
            return retryable_or(io::Error::last_os_error());
        }

        let mut byte = 0u8;
        let n = unsafe { libc::read(fd, (&raw mut byte).cast::<libc::c_void>(), 1) };

        match n {
            1 => Ok(Some(byte)),
            0 => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input stream closed",
            )),
            _ => retryable_or(io::Error::last_os_error()),
        }
    }

    /// Non-unix fallback: a plain blocking read, no timeout.
    #[cfg(not(unix))]
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        use std::io::Read;

        let mut byte = [0u8; 1];
        match io::stdin().lock().read(&mut byte)? {
            0 => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input stream closed",
            )),
            _ => Ok(Some(byte[0])),
        }
    }
}

/// `EAGAIN` and `EINTR` mean "nothing yet"; anything else is fatal.
#[cfg(unix)]
fn retryable_or(err: io::Error) -> io::Result<Option<u8>> {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(None),
        _ => Err(err),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
