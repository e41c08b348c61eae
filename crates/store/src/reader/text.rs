use std::io::SeekFrom;

use async_trait::async_trait;
use book_core::codec::text::{self, TextDecoder};
use book_core::{BookEntry, BookKey, FormatError};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

use super::RecordLayout;
use crate::api::Result;
use crate::config::MIN_SEARCH_WINDOW;

const POSITION_MARKER: &[u8] = b"sfen ";

/// Text books: records are `sfen ` lines, found by scanning forward line by line.
pub(crate) struct TextLayout {
    window: usize,
}

impl TextLayout {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            window: window.max(MIN_SEARCH_WINDOW),
        }
    }
}

fn position_key(line: &[u8]) -> Result<BookKey> {
    let bad_line = || FormatError::BadPositionLine(String::from_utf8_lossy(line).into_owned());
    let line = std::str::from_utf8(line).map_err(|_| bad_line())?;
    let (key, _) = text::parse_position_line(line).ok_or_else(bad_line)?;
    Ok(BookKey::Text(key))
}

#[async_trait]
impl RecordLayout for TextLayout {
    async fn next_record(
        &self,
        file: &mut File,
        offset: u64,
        size: u64,
    ) -> Result<Option<(u64, BookKey)>> {
        if offset >= size {
            return Ok(None);
        }
        // Start one byte early so a line beginning exactly at `offset` is not
        // skipped. At offset 0 the skipped line is the header.
        let start = offset.saturating_sub(1);
        file.seek(SeekFrom::Start(start)).await?;
        let mut reader = BufReader::with_capacity(self.window, file);

        let mut line = Vec::new();
        let mut pos = start + reader.read_until(b'\n', &mut line).await? as u64;
        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line).await?;
            if read == 0 {
                return Ok(None);
            }
            if line.starts_with(POSITION_MARKER) {
                return Ok(Some((pos, position_key(&line)?)));
            }
            pos += read as u64;
        }
    }

    async fn read_entry(
        &self,
        file: &mut File,
        start: u64,
        _key: &BookKey,
    ) -> Result<Option<BookEntry>> {
        file.seek(SeekFrom::Start(start)).await?;
        let mut reader = BufReader::with_capacity(self.window, file);
        let mut decoder = TextDecoder::fragment();
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }
            // The first line opens the entry, the next position line closes it.
            if let Some((_, entry)) = decoder.push_bytes(&line)? {
                return Ok(Some(entry));
            }
        }
        Ok(decoder.finish().map(|(_, entry)| entry))
    }
}
