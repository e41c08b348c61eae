use std::path::{Path, PathBuf};

use book_core::codec::{binary, text};
use book_core::{BookEntry, BookFormat, BookKey};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::api::{BookError, Result};

/// Buffered forward-only book writer.
///
/// `write_entry` awaits the buffered write, so a slow disk throttles the
/// producer instead of growing memory.
pub(crate) struct BookWriter {
    inner: BufWriter<File>,
    path: PathBuf,
    text: String,
    bytes: Vec<u8>,
    entries: u64,
}

impl BookWriter {
    /// Creates `path` and writes the format header.
    pub(crate) async fn create(path: &Path, format: BookFormat, buffer: usize) -> Result<Self> {
        let file = File::create(path).await.map_err(BookError::merge_io(path))?;
        let mut writer = Self {
            inner: BufWriter::with_capacity(buffer, file),
            path: path.to_path_buf(),
            text: String::new(),
            bytes: Vec::new(),
            entries: 0,
        };
        if format == BookFormat::Text {
            text::encode_header(&mut writer.text);
            writer.flush_scratch().await?;
        }
        Ok(writer)
    }

    /// Writes one entry; entries without moves are skipped.
    pub(crate) async fn write_entry(&mut self, key: &BookKey, entry: &BookEntry) -> Result<()> {
        if entry.is_empty() {
            return Ok(());
        }
        match key {
            BookKey::Text(key) => text::encode_entry(key, entry, &mut self.text),
            BookKey::Binary(key) => binary::encode_entry(*key, entry, &mut self.bytes)?,
        }
        self.entries += 1;
        self.flush_scratch().await
    }

    async fn flush_scratch(&mut self) -> Result<()> {
        if !self.text.is_empty() {
            self.inner
                .write_all(self.text.as_bytes())
                .await
                .map_err(BookError::merge_io(&self.path))?;
            self.text.clear();
        }
        if !self.bytes.is_empty() {
            self.inner
                .write_all(&self.bytes)
                .await
                .map_err(BookError::merge_io(&self.path))?;
            self.bytes.clear();
        }
        Ok(())
    }

    /// Flushes and syncs; returns the number of entries written.
    pub(crate) async fn finish(mut self) -> Result<u64> {
        self.inner.flush().await.map_err(BookError::merge_io(&self.path))?;
        self.inner
            .get_ref()
            .sync_all()
            .await
            .map_err(BookError::merge_io(&self.path))?;
        Ok(self.entries)
    }
}
