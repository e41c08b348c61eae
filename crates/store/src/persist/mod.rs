//! Save paths: whole-book dump and streaming base ⊕ overlay merge.
//!
//! Both write to a sibling `<name>.tmp` and rename it over the target once
//! the stream is flushed. A failed save removes the temporary file, so the
//! target is either untouched or complete.

mod writer;

use std::path::{Path, PathBuf};

use book_core::{Book, BookFormat, merge_entries};
use tokio::fs::File;
use tracing::{debug, info};

use crate::api::{BookError, Result};
use crate::config::StoreConfig;
use crate::reader::EntryStream;

pub(crate) use writer::BookWriter;

const READ_BUFFER: usize = 64 * 1024;

pub(crate) fn temp_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    output.with_file_name(name)
}

async fn commit(temp: &Path, output: &Path, written: Result<u64>) -> Result<u64> {
    match written {
        Ok(entries) => {
            tokio::fs::rename(temp, output)
                .await
                .map_err(BookError::merge_io(output))?;
            Ok(entries)
        }
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(temp).await {
                debug!("could not remove {}: {}", temp.display(), cleanup);
            }
            Err(e)
        }
    }
}

/// Writes every non-empty entry of an in-memory book in key order.
pub(crate) async fn save_book(book: &Book, output: &Path, config: &StoreConfig) -> Result<u64> {
    let temp = temp_path(output);
    let written = write_book(book, &temp, config).await;
    let entries = commit(&temp, output, written).await?;
    info!("Saved {} positions to {}", entries, output.display());
    Ok(entries)
}

async fn write_book(book: &Book, temp: &Path, config: &StoreConfig) -> Result<u64> {
    let mut writer = BookWriter::create(temp, book.format(), config.write_buffer_bytes).await?;
    for (key, entry) in book.iter() {
        writer.write_entry(&key, entry).await?;
    }
    writer.finish().await
}

/// Streams `base` merged with `overlay` into `output`.
///
/// Overlay keys are flushed as the base passes them; an overlay key equal to
/// a base key is merged with it, and overlay keys past the last base entry
/// are written at the end. `base` is rewound first.
pub(crate) async fn save_merged(
    base: &mut File,
    format: BookFormat,
    overlay: &Book,
    output: &Path,
    config: &StoreConfig,
) -> Result<u64> {
    let temp = temp_path(output);
    let written = write_merged(base, format, overlay, &temp, config).await;
    let entries = commit(&temp, output, written).await?;
    info!(
        "Saved {} positions to {} ({} overlay entries merged)",
        entries,
        output.display(),
        overlay.len()
    );
    Ok(entries)
}

async fn write_merged(
    base: &mut File,
    format: BookFormat,
    overlay: &Book,
    temp: &Path,
    config: &StoreConfig,
) -> Result<u64> {
    let mut writer = BookWriter::create(temp, format, config.write_buffer_bytes).await?;
    let mut stream = EntryStream::open(format, base, READ_BUFFER).await?;
    let mut pending = overlay.iter().peekable();

    while let Some((key, base_entry)) = stream.next_entry().await? {
        while let Some((patch_key, patch)) = pending.next_if(|(next, _)| *next < key) {
            writer.write_entry(&patch_key, patch).await?;
        }
        match pending.next_if(|(next, _)| *next == key) {
            Some((_, patch)) => {
                writer
                    .write_entry(&key, &merge_entries(&base_entry, patch))
                    .await?
            }
            None => writer.write_entry(&key, &base_entry).await?,
        }
    }
    for (key, patch) in pending {
        writer.write_entry(&key, patch).await?;
    }
    debug!("merged {} base positions", stream.entries_read());
    writer.finish().await
}
