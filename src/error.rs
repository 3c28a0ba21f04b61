//! Engine error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::event::FileEvent;

/// Failures of a single engine operation.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("file path is empty")]
    EmptyPath,

    #[error("unsupported extension `{0}`")]
    UnsupportedExtension(String),

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("failed to read `{}`: {error}", path.display())]
    Read {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("{media_type} preamble failed: {message}")]
    Preamble {
        media_type: &'static str,
        message: String,
    },

    #[error("{media_type} minification failed: {message}")]
    Minify {
        media_type: &'static str,
        message: String,
    },

    #[error("failed to write `{}`: {error}", path.display())]
    Write {
        path: PathBuf,
        error: std::io::Error,
    },
}

/// An [`AssetError`] with the event it happened on.
///
/// NOTE: the cause is rendered inline, not exposed via `source()`,
/// so `{:#}` chains in the host don't print it twice.
#[derive(Debug, Error)]
#[error("{event} {extension} `{}`: {cause}", path.display())]
pub struct EventError {
    pub event: FileEvent,
    pub extension: String,
    pub path: PathBuf,
    pub cause: AssetError,
}

impl EventError {
    pub fn new(
        event: FileEvent,
        extension: impl Into<String>,
        path: impl Into<PathBuf>,
        cause: AssetError,
    ) -> Self {
        Self {
            event,
            extension: extension.into(),
            path: path.into(),
            cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_event_error_display() {
        let err = EventError::new(
            FileEvent::Write,
            ".js",
            "modules/a.js",
            AssetError::Read {
                path: PathBuf::from("modules/a.js"),
                error: Error::new(ErrorKind::NotFound, "file not found"),
            },
        );
        let display = err.to_string();
        assert!(display.contains("write"));
        assert!(display.contains(".js"));
        assert!(display.contains("modules/a.js"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_minify_error_display() {
        let err = AssetError::Minify {
            media_type: "text/css",
            message: "unexpected token".to_string(),
        };
        assert_eq!(err.to_string(), "text/css minification failed: unexpected token");
    }
}
