// SPDX-License-Identifier: MIT
//
// kedit: a small terminal text editor.
//
// This is the binary that wires the two library crates together:
//
//   kedit-term → raw mode, window size, byte source, key decoding
//   kedit-core → document, highlighting, viewport, prompt, search, frames
//
// Each turn of the loop draws one frame and handles one key:
//
//   stdin → InputDecoder → Editor::process_key → document / cursor / prompt
//   Editor::scroll → Frame::render → OutputBuffer → one write to stdout
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ text area                    │  ← rows - 2
//   ├──────────────────────────────┤
//   │ status bar (INVERSE)         │  ← 1 row
//   ├──────────────────────────────┤
//   │ message bar                  │  ← 1 row
//   └──────────────────────────────┘
//
// Usage: `kedit [FILE]`. Exit status is 0 on quit and 1 on any fatal
// error (unreadable file, broken terminal or input stream).
//
// Logging is off unless `KEDIT_LOG` holds a filter directive such as
// `debug` or `search=trace`; records then go to `kedit.log` in the system
// temp directory, never to the terminal the editor is drawing on.

use std::env;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Once;

use anyhow::{Context, Result};
use kedit_core::{Editor, EditorOptions, Flow};
use kedit_term::input::InputDecoder;
use kedit_term::reader::StdinReader;
use kedit_term::terminal::Terminal;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "KEDIT_LOG";

const LOG_FILE: &str = "kedit.log";

// ─── Logging ────────────────────────────────────────────────────────────────

/// Install a file-backed subscriber when `KEDIT_LOG` is set.
///
/// The returned guard flushes the background writer on drop and must be
/// held until exit.
fn configure_logging() -> Option<WorkerGuard> {
    let directive = env::var(LOG_ENV).ok()?;

    let appender = tracing_appender::rolling::never(env::temp_dir(), LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}

/// Log panics. Installed before raw mode so the terminal's own restore
/// hook runs first and then chains to this one.
fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", %info, "panic");
            default_panic(info);
        }));
    });
}

// ─── Session ────────────────────────────────────────────────────────────────

fn run(path: Option<PathBuf>, term: &mut Terminal) -> Result<()> {
    let mut input = InputDecoder::new(StdinReader::new());

    term.enter().context("cannot enter raw mode")?;
    let size = term
        .window_size(input.source_mut())
        .context("cannot determine window size")?;
    info!(target: "runtime", rows = size.rows, cols = size.cols, "startup");

    let mut editor = Editor::new(size.rows.into(), size.cols.into(), EditorOptions::default());
    if let Some(path) = path {
        editor.open(&path)?;
    }
    editor.show_help();

    let stdout = io::stdout();
    loop {
        let flow = editor.step(&mut input, &mut stdout.lock())?;
        if flow == Flow::Quit {
            break;
        }
    }

    info!(target: "runtime", "shutdown");
    Ok(())
}

fn main() {
    let log_guard = configure_logging();
    install_panic_hook();

    let path = env::args_os().nth(1).map(PathBuf::from);

    let mut term = Terminal::new();
    let result = run(path, &mut term);
    let restored = term.leave().context("cannot restore terminal");

    if let Err(e) = result.and(restored) {
        tracing::error!(target: "runtime", error = %format!("{e:#}"), "fatal");
        eprintln!("kedit: {e:#}");
        drop(log_guard);
        process::exit(1);
    }
}
