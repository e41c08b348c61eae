//! Async opening-book store for shogi engines.
//!
//! A [`BookStore`] holds numbered sessions, each backed either by a fully
//! decoded book (in-memory) or by a sorted book file searched in place with
//! an in-memory overlay of edits (on-the-fly). Sessions support lookup,
//! move edits, streaming merge saves and importing game records.
//!
//! ```no_run
//! use book_store::{BookStore, OpenOptions, SessionId};
//!
//! # async fn demo() -> book_store::Result<()> {
//! let mut store = BookStore::new();
//! store.open("standard_book.db", &OpenOptions::new()).await?;
//! let moves = store
//!     .search(SessionId::DEFAULT, "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1")
//!     .await?;
//! # let _ = moves;
//! # Ok(())
//! # }
//! ```
pub mod api;
pub mod config;
pub mod import;
pub mod logging;
mod persist;
mod reader;
mod session;
mod store;

pub use api::{BookError, BookLoadingMode, OpenOptions, Result, SessionId};
pub use config::StoreConfig;
pub use import::{
    BuiltinRecordParser, GameRecord, ImportSettings, ImportSource, ImportSummary,
    PlayerCriteria, RecordError, RecordFormat, RecordNode, RecordParser,
};
pub use logging::{LogFile, setup_logging};
pub use store::{BookStore, BookStoreBuilder};

pub use book_core::{
    AperyZobrist, BookEntry, BookFormat, BookMove, EntryKind, Position, PositionHasher,
};
