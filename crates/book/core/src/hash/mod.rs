//! Position hashing for the binary book format.
//!
//! Binary books are keyed by a 64-bit hash of the position. The hasher is a
//! seam: the store accepts any [`PositionHasher`], and [`AperyZobrist`]
//! reproduces the key the Apery engine writes into its book files.
//!
//! There is no collision detection. Two positions with the same hash share
//! one entry, exactly as they do in the engine's own book reader.
mod apery;
mod mt64;

pub use apery::AperyZobrist;
pub use mt64::Mt64;

use crate::shogi::Position;

/// Maps a position to the 64-bit key used by binary books.
pub trait PositionHasher: Send + Sync {
    fn hash(&self, position: &Position) -> u64;
}
