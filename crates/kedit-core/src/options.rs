//! Editor tunables.
//!
//! There is no configuration file; these are the compiled-in defaults and
//! tests override them directly.

use std::time::Duration;

/// Status text shown at startup.
pub const HELP_MESSAGE: &str = "HELP: Ctrl-Q = quit, Ctrl-S = save, CTRL-F = find";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorOptions {
    /// Extra Ctrl-Q presses required to quit with unsaved changes.
    pub quit_times: u32,
    /// How long a status message stays on the message bar.
    pub message_timeout: Duration,
    pub help_message: String,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            quit_times: 3,
            message_timeout: Duration::from_secs(5),
            help_message: HELP_MESSAGE.to_owned(),
        }
    }
}
