//! Error types for confnotes.
//!
//! Library crates use [`ConfNotesError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all confnotes operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfNotesError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while loading a page.
    #[error("network error: {0}")]
    Network(String),

    /// A required page field never appeared within the wait limit.
    #[error("required field '{field}' not found within {timeout_secs}s (url: {url})")]
    FieldMissing {
        field: String,
        url: String,
        timeout_secs: u64,
    },

    /// An optional page field never appeared; the record continues without it.
    #[error("optional field '{field}' not found, continuing without it")]
    FieldDegraded { field: String },

    /// Sanitization could not produce a legal note filename.
    #[error("illegal character {character:?} in filename: '{filename}'")]
    IllegalFilename { character: char, filename: String },

    /// Filename truncation stopped making progress.
    #[error("cannot shorten filename below {max_len} bytes: '{filename}'")]
    TruncationStalled { filename: String, max_len: usize },

    /// Author blocks stayed unreadable after every polling attempt.
    #[error("author info not found after {attempts} attempts")]
    AuthorParseExhausted { attempts: u32 },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Zip archive error while preserving a replaced note.
    #[error("archive error at {path:?}: {message}")]
    Archive { path: PathBuf, message: String },

    /// Data validation error (bad URL shape, unreadable calendar, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ConfNotesError>;

impl ConfNotesError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// A required field that did not show up on the page at `url`.
    pub fn field_missing(field: impl Into<String>, url: impl Into<String>, timeout_secs: u64) -> Self {
        Self::FieldMissing {
            field: field.into(),
            url: url.into(),
            timeout_secs,
        }
    }

    /// Wrap a zip failure for the archive at `path`.
    pub fn archive(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Whether this error aborts the record it was raised for.
    ///
    /// Only [`ConfNotesError::FieldDegraded`] is recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FieldDegraded { .. })
    }
}
