//! Bulk import of game records into a session.
//!
//! Each admitted (position, move) pair bumps that move's count in the
//! session's book, or in its overlay as a patch for on-the-fly sessions,
//! and re-sorts the position's moves by count.

mod csa;
mod pipeline;
pub mod record;
pub mod settings;
mod usi;

pub(crate) use pipeline::run;
pub use csa::parse_csa;
pub use record::{BuiltinRecordParser, GameRecord, RecordError, RecordFormat, RecordNode, RecordParser};
pub use settings::{ImportSettings, ImportSource, ImportSummary, PlayerCriteria};
pub use usi::parse_usi_line;
