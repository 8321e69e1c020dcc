//! # kedit-core: Editing engine for kedit
//!
//! Everything between a decoded key and an escape-coded frame:
//!
//! - **[`row`]**: one line: raw bytes, tab-expanded render form, highlight
//! - **[`document`]**: the row sequence: edits, dirty flag, load and save
//! - **[`syntax`]**: language profiles and the static registry
//! - **[`highlight`]**: per-row classification with block-comment carry-over
//! - **[`viewport`]**: scroll offsets and text-area size
//! - **[`compositor`]**: rows, status bar and message bar as one frame
//! - **[`prompt`]**: single-line input on the message bar
//! - **[`search`]**: incremental search driven by the prompt
//! - **[`editor`]**: the controller that owns all of the above
//!
//! Terminal access lives in `kedit-term`; this crate only writes to
//! `io::Write` sinks and reads keys through `kedit_term::input`.

pub mod compositor;
pub mod document;
pub mod editor;
pub mod error;
pub mod highlight;
pub mod options;
pub mod prompt;
pub mod row;
pub mod search;
pub mod syntax;
pub mod viewport;

pub use editor::{Editor, EditorState, Flow};
pub use error::{EditorError, EditorResult};
pub use options::EditorOptions;
