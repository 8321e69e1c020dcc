// SPDX-License-Identifier: MIT
//
// Terminal control: raw mode, window size, and RAII cleanup.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), isatty, and raw fd writes. These are
// the standard POSIX interfaces for terminal control: there is no safe
// alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// This module owns the terminal's raw state. `Terminal::enter` switches
// off echo, canonical input, signal keys, flow control and output
// post-processing, and arranges for reads to return after a tenth of a
// second even when no key was pressed. `Terminal::leave` (or drop) clears
// the screen and puts the original termios back.
//
// A panic hook writes a pre-built restore sequence directly to fd 1 and
// restores termios from a global backup, so a panic mid-frame still leaves
// the user with a working shell.

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use crate::ansi;
use crate::reader::ByteSource;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if stdout is not a terminal or the query fails.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Check whether stdin is connected to a terminal (TTY).
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

/// Longest cursor position report we are willing to read.
const REPORT_MAX: usize = 32;

/// Measure the window by moving the cursor to the far corner and asking
/// where it ended up.
///
/// This is the fallback when `TIOCGWINSZ` fails. It needs raw mode (the
/// reply must not be echoed or line-buffered), so call it after
/// [`Terminal::enter`].
///
/// # Errors
///
/// Returns an error if the probe cannot be written, the source fails, or
/// the terminal's reply is not a well-formed report.
pub fn probe_size(out: &mut impl Write, input: &mut impl ByteSource) -> io::Result<Size> {
    ansi::cursor_far_corner(out)?;
    ansi::query_cursor_position(out)?;
    out.flush()?;

    let mut report = Vec::with_capacity(REPORT_MAX);
    while report.len() < REPORT_MAX {
        match input.read_byte()? {
            Some(b'R') | None => break,
            Some(b) => report.push(b),
        }
    }

    parse_cursor_report(&report).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "terminal did not answer the cursor position query",
        )
    })
}

/// Parse the body of a cursor position report: `ESC [ rows ; cols`
/// (the trailing `R` already stripped).
#[must_use]
pub fn parse_cursor_report(report: &[u8]) -> Option<Size> {
    let body = report.strip_prefix(b"\x1b[")?;
    let text = std::str::from_utf8(body).ok()?;
    let (rows, cols) = text.split_once(';')?;
    Some(Size {
        rows: rows.parse().ok()?,
        cols: cols.parse().ok()?,
    })
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of original termios for panic recovery.
///
/// The [`Terminal`] struct owns its own copy, but the panic hook can't
/// access it. This global backup (behind a [`Mutex`], not `static mut`)
/// lets the hook restore cooked mode without the struct.
#[cfg(unix)]
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
#[cfg(unix)]
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original);
            }
        }
    }
}

/// Complete terminal restore sequence for emergency use.
///
/// Reset SGR attributes, show cursor, clear screen, home cursor.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[0m\x1b[?25h\x1b[2J\x1b[H";

/// Panic hook guard: ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();

            #[cfg(unix)]
            restore_termios_from_backup();

            original(info);
        }));
    });
}

/// Write the restore sequence directly to stdout's file descriptor,
/// bypassing the stdout lock in case the panic happened while holding it.
fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Terminal handle with RAII cleanup.
///
/// Call [`enter`](Self::enter) to switch to raw mode. The terminal is
/// restored when the handle is dropped, even on panic.
///
/// # Example
///
/// ```no_run
/// use kedit_term::terminal::Terminal;
///
/// let mut term = Terminal::new();
/// term.enter()?;
/// // ... read keys, draw frames ...
/// // Terminal is restored automatically on drop.
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    /// Original termios saved before entering raw mode.
    #[cfg(unix)]
    original_termios: Option<libc::termios>,

    /// Whether raw mode is active.
    active: bool,
}

impl Terminal {
    /// Create a terminal handle. Does **not** enter raw mode.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            #[cfg(unix)]
            original_termios: None,
            active: false,
        }
    }

    /// Whether raw mode is active.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Enter raw mode.
    ///
    /// Idempotent: calling `enter()` while already active is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if termios cannot be read or written.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }

        install_panic_hook();
        self.enable_raw_mode()?;

        self.active = true;
        Ok(())
    }

    /// Leave raw mode: clear the screen, home the cursor, restore termios.
    ///
    /// Idempotent: calling `leave()` while inactive is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal output or termios restore fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }

        let stdout = io::stdout();
        let mut lock = stdout.lock();
        ansi::reset(&mut lock)?;
        ansi::cursor_show(&mut lock)?;
        ansi::clear_screen(&mut lock)?;
        ansi::cursor_home(&mut lock)?;
        lock.flush()?;
        drop(lock);

        self.disable_raw_mode()?;
        self.active = false;
        Ok(())
    }

    /// The usable window size, falling back to the cursor-report probe.
    ///
    /// # Errors
    ///
    /// Returns an error if neither `TIOCGWINSZ` nor the probe works.
    pub fn window_size(&self, input: &mut impl ByteSource) -> io::Result<Size> {
        if let Some(size) = get_size() {
            return Ok(size);
        }
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        probe_size(&mut lock, input)
    }

    // ── Raw Mode (termios) ──────────────────────────────────────────

    #[cfg(unix)]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        use std::os::unix::io::AsRawFd;

        if !is_tty() {
            return Ok(());
        }

        let fd = io::stdin().as_raw_fd();

        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(fd, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }

            self.original_termios = Some(termios);
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = Some(termios);
            }

            // Ctrl-S/Ctrl-Q flow control, CR→NL translation, parity, 8th-bit strip.
            termios.c_iflag &=
                !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
            termios.c_oflag &= !libc::OPOST;
            termios.c_cflag |= libc::CS8;
            // Echo, line buffering, Ctrl-V, Ctrl-C/Ctrl-Z signals.
            termios.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);

            // VMIN=0, VTIME=1: read() returns after 100ms even with no input.
            termios.c_cc[libc::VMIN] = 0;
            termios.c_cc[libc::VTIME] = 1;

            if libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const termios) != 0 {
                return Err(io::Error::last_os_error());
            }
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn enable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(unix)]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        if let Some(ref original) = self.original_termios {
            use std::os::unix::io::AsRawFd;
            let fd = io::stdin().as_raw_fd();

            unsafe {
                if libc::tcsetattr(fd, libc::TCSAFLUSH, original) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }

            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }

            self.original_termios = None;
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn disable_raw_mode(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    // ── Cursor report parsing ───────────────────────────────────────

    #[test]
    fn parse_report_basic() {
        assert_eq!(
            parse_cursor_report(b"\x1b[24;80"),
            Some(Size { cols: 80, rows: 24 })
        );
    }

    #[test]
    fn parse_report_rejects_missing_prefix() {
        assert_eq!(parse_cursor_report(b"24;80"), None);
    }

    #[test]
    fn parse_report_rejects_missing_separator() {
        assert_eq!(parse_cursor_report(b"\x1b[2480"), None);
    }

    #[test]
    fn parse_report_rejects_garbage_numbers() {
        assert_eq!(parse_cursor_report(b"\x1b[a;b"), None);
        assert_eq!(parse_cursor_report(b"\x1b[;80"), None);
    }

    // ── Probe ───────────────────────────────────────────────────────

    #[test]
    fn probe_writes_queries_and_parses_reply() {
        let mut out = Vec::new();
        let mut reply: VecDeque<u8> = b"\x1b[50;132R".iter().copied().collect();
        let size = probe_size(&mut out, &mut reply).unwrap();
        assert_eq!(size, Size { cols: 132, rows: 50 });
        assert_eq!(out, b"\x1b[999C\x1b[999B\x1b[6n");
    }

    #[test]
    fn probe_without_reply_is_an_error() {
        let mut out = Vec::new();
        let mut reply: VecDeque<u8> = VecDeque::new();
        let err = probe_size(&mut out, &mut reply).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    // ── Emergency restore sequence ──────────────────────────────────

    #[test]
    fn emergency_restore_shows_cursor_and_clears() {
        let s = std::str::from_utf8(EMERGENCY_RESTORE).unwrap();
        assert!(s.contains("\x1b[?25h"), "must show cursor");
        assert!(s.contains("\x1b[0m"), "must reset SGR attributes");
        assert!(s.ends_with("\x1b[2J\x1b[H"), "must leave a clean screen");
    }

    // ── Terminal struct ─────────────────────────────────────────────

    #[test]
    fn get_size_does_not_panic() {
        let _ = get_size();
    }

    #[test]
    fn terminal_new_is_inactive() {
        let term = Terminal::new();
        assert!(!term.is_active());
    }

    #[test]
    fn terminal_leave_without_enter() {
        let mut term = Terminal::new();
        term.leave().unwrap();
        assert!(!term.is_active());
    }

    #[test]
    fn terminal_drop_without_enter() {
        let term = Terminal::new();
        drop(term);
    }
}
