//! Prompt: single-line input on the message bar.
//!
//! A [`PromptSession`] owns the text typed so far and a boxed
//! [`PromptHandler`] that decides what the input means. The session itself
//! only edits the line; the handler is told about every key (so search can
//! react as the user types) and then about the outcome.
//!
//! The session does not block or draw. The editor feeds it one key per
//! event-loop turn and the normal frame shows the prompt through the
//! message bar, so a prompt is just another editor state.
//!
//! | Key                 | Effect                                  |
//! |---------------------|-----------------------------------------|
//! | Backspace, Del      | drop the last character                 |
//! | Esc                 | cancel                                  |
//! | Enter               | submit, unless the line is empty        |
//! | printable ASCII     | append                                  |
//! | anything else       | ignored (the handler still sees it)     |

use kedit_term::input::Key;

/// Where a prompt shows its text.
pub trait StatusLine {
    fn set_status(&mut self, text: String);
}

/// Reacts to prompt input. `C` is the state the handler works on.
pub trait PromptHandler<C> {
    /// Called once for every key, after the line was edited and before the
    /// session ends.
    fn on_key(&mut self, _ctx: &mut C, _input: &str, _key: Key) {}

    /// The user pressed Enter on a non-empty line.
    fn on_submit(self: Box<Self>, ctx: &mut C, input: String);

    /// The user pressed Esc.
    fn on_cancel(self: Box<Self>, _ctx: &mut C) {}
}

/// What a key did to the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStatus {
    Editing,
    Submitted,
    Cancelled,
}

/// An active prompt.
pub struct PromptSession<C> {
    template: String,
    input: String,
    handler: Box<dyn PromptHandler<C>>,
}

impl<C: StatusLine> PromptSession<C> {
    /// Open a prompt and show it. `template` is shown with its first `{}`
    /// replaced by the input.
    pub fn start(ctx: &mut C, template: impl Into<String>, handler: Box<dyn PromptHandler<C>>) -> Self {
        let session = Self {
            template: template.into(),
            input: String::new(),
            handler,
        };
        ctx.set_status(session.message());
        session
    }

    /// Apply one key. Returns the session back while it is still open.
    #[must_use]
    pub fn feed(mut self, ctx: &mut C, key: Key) -> Option<Self> {
        match self.edit(key) {
            PromptStatus::Editing => {
                self.handler.on_key(ctx, &self.input, key);
                ctx.set_status(self.message());
                Some(self)
            }
            PromptStatus::Submitted => {
                ctx.set_status(String::new());
                self.handler.on_key(ctx, &self.input, key);
                self.handler.on_submit(ctx, self.input);
                None
            }
            PromptStatus::Cancelled => {
                ctx.set_status(String::new());
                self.handler.on_key(ctx, &self.input, key);
                self.handler.on_cancel(ctx);
                None
            }
        }
    }
}

impl<C> PromptSession<C> {
    /// The line typed so far.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Status text for the current input.
    #[must_use]
    pub fn message(&self) -> String {
        self.template.replacen("{}", &self.input, 1)
    }

    fn edit(&mut self, key: Key) -> PromptStatus {
        match key {
            Key::Delete | Key::BACKSPACE => {
                self.input.pop();
            }
            Key::ESCAPE => return PromptStatus::Cancelled,
            Key::ENTER if !self.input.is_empty() => return PromptStatus::Submitted,
            Key::Byte(b) if key.is_printable() => self.input.push(char::from(b)),
            _ => {}
        }
        PromptStatus::Editing
    }
}

impl<C> std::fmt::Debug for PromptSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSession")
            .field("template", &self.template)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
