//! Error type for the editing engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by document I/O and the input stream.
///
/// `Open` is fatal for the binary. `Save` is caught by the editor and shown
/// in the message bar.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{source}")]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("document has no file name")]
    Unnamed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type EditorResult<T> = Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_names_the_path() {
        let err = EditorError::Open {
            path: PathBuf::from("/no/such/file.c"),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "cannot open /no/such/file.c: not found");
    }

    #[test]
    fn save_displays_only_the_cause() {
        let err = EditorError::Save {
            path: PathBuf::from("x"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "denied");
    }

    #[test]
    fn io_converts() {
        let err: EditorError = io::Error::other("boom").into();
        assert!(matches!(err, EditorError::Io(_)));
    }
}
