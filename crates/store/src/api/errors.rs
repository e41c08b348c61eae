//! Unified error type surfaced by the book store API.
//!
//! Codec failures from `book-core` are wrapped transparently; filesystem
//! failures during a save carry the output path so callers can report it.
use std::io;
use std::path::PathBuf;

use book_core::{FormatError, PositionError};
use thiserror::Error;

use super::SessionId;

pub type Result<T> = std::result::Result<T, BookError>;

#[derive(Debug, Error)]
pub enum BookError {
    #[error(transparent)]
    MalformedFormat(#[from] FormatError),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("extension of {} does not match the {format} book format", path.display())]
    UnsupportedExtension {
        path: PathBuf,
        format: book_core::BookFormat,
    },

    #[error("positions are not sorted in {}: {previous:?} precedes {next:?}", path.display())]
    OrderingViolation {
        path: PathBuf,
        previous: String,
        next: String,
    },

    #[error("cannot save over the on-the-fly source {}", .0.display())]
    PathConflict(PathBuf),

    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("failed to write merged book to {}", path.display())]
    MergeIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    InvalidPosition(#[from] PositionError),

    #[error("failed to parse config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl BookError {
    pub(crate) fn merge_io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| BookError::MergeIo { path, source }
    }
}
