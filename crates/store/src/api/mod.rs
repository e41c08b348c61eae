//! Public store API surface.
//!
//! Types callers pass to and receive from [`BookStore`](crate::BookStore)
//! live here so the reader, persistence and import layers stay internal.

pub mod errors;
pub mod options;

pub use errors::{BookError, Result};
pub use options::{BookLoadingMode, OpenOptions, SessionId};
