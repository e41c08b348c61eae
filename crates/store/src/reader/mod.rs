//! Disk-backed access to book files.
//!
//! On-the-fly sessions never load their source. Point lookups binary-search
//! byte offsets through a [`RecordLayout`], which knows how to find the next
//! record boundary and decode an entry for one format. No index is built or
//! kept: every lookup repeats the search. Saves and order checks read the
//! file front to back through an [`EntryStream`].

mod binary;
mod stream;
mod text;

use async_trait::async_trait;
use book_core::{BookEntry, BookFormat, BookKey};
use tokio::fs::File;
use tracing::debug;

use crate::api::Result;
use crate::config::StoreConfig;

pub(crate) use binary::BinaryLayout;
pub(crate) use stream::EntryStream;
pub(crate) use text::TextLayout;

/// Record boundaries and entry decoding of one on-disk format.
#[async_trait]
pub(crate) trait RecordLayout: Send + Sync {
    /// First record starting at or after `offset`, with its key.
    async fn next_record(
        &self,
        file: &mut File,
        offset: u64,
        size: u64,
    ) -> Result<Option<(u64, BookKey)>>;

    /// Decodes the entry whose first record starts at `start`.
    async fn read_entry(
        &self,
        file: &mut File,
        start: u64,
        key: &BookKey,
    ) -> Result<Option<BookEntry>>;
}

pub(crate) fn layout_for(format: BookFormat, config: &StoreConfig) -> Box<dyn RecordLayout> {
    match format {
        BookFormat::Text => Box::new(TextLayout::new(config.search_window_bytes)),
        BookFormat::Binary => Box::new(BinaryLayout::new(config.search_window_bytes)),
    }
}

/// Looks up `key` in a sorted book of `size` bytes.
///
/// Searches for the smallest offset whose next record has a key not below
/// `key`; that record starts the matching entry if there is one.
pub(crate) async fn lookup(
    layout: &dyn RecordLayout,
    file: &mut File,
    size: u64,
    key: &BookKey,
) -> Result<Option<BookEntry>> {
    let mut lo = 0u64;
    let mut hi = size;
    let mut reads = 0u32;

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        reads += 1;
        match layout.next_record(file, mid, size).await? {
            Some((start, found)) if found < *key => lo = start + 1,
            _ => hi = mid,
        }
    }

    let found = match layout.next_record(file, lo, size).await? {
        Some((start, found)) if found == *key => Some(start),
        _ => None,
    };
    debug!(reads, found = found.is_some(), "book lookup");

    match found {
        Some(start) => layout.read_entry(file, start, key).await,
        None => Ok(None),
    }
}
