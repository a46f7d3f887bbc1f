use std::fmt;

use crate::summary::SummaryError;

/// Errors that can occur while loading or checking a book.
#[derive(Debug)]
pub enum BookError {
    /// The requested page or file was not found.
    NotFound(String),
    /// An IO error occurred while reading the book.
    Io(std::io::Error),
    /// The path is invalid (empty after stripping anchors and dot segments).
    InvalidPath(String),
    /// The path climbs above the book source root.
    EscapesRoot(String),
    /// `SUMMARY.md` could not be parsed.
    Summary(SummaryError),
    /// `book.toml` is malformed.
    Config(String),
    /// A report could not be serialized.
    Json(serde_json::Error),
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::NotFound(path) => write!(f, "not found: {path}"),
            BookError::Io(err) => write!(f, "IO error: {err}"),
            BookError::InvalidPath(reason) => write!(f, "invalid path: {reason}"),
            BookError::EscapesRoot(path) => write!(f, "path escapes the book root: {path}"),
            BookError::Summary(err) => write!(f, "SUMMARY.md: {err}"),
            BookError::Config(reason) => write!(f, "book.toml: {reason}"),
            BookError::Json(err) => write!(f, "JSON output: {err}"),
        }
    }
}

impl std::error::Error for BookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BookError::Io(err) => Some(err),
            BookError::Summary(err) => Some(err),
            BookError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BookError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            BookError::NotFound(err.to_string())
        } else {
            BookError::Io(err)
        }
    }
}

impl From<SummaryError> for BookError {
    fn from(err: SummaryError) -> Self {
        BookError::Summary(err)
    }
}

impl From<serde_json::Error> for BookError {
    fn from(err: serde_json::Error) -> Self {
        BookError::Json(err)
    }
}
