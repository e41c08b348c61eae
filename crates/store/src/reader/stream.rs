use std::io::SeekFrom;

use book_core::codec::binary::BinaryDecoder;
use book_core::codec::text::TextDecoder;
use book_core::{BookEntry, BookFormat, BookKey, FormatError};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

use super::binary::read_record;
use crate::api::Result;

enum Decoder {
    Text { decoder: TextDecoder, line: Vec<u8> },
    Binary(BinaryDecoder),
}

/// Sequential reader yielding a book's entries in file order.
pub(crate) struct EntryStream<'a> {
    reader: BufReader<&'a mut File>,
    decoder: Option<Decoder>,
    entries: u64,
}

impl<'a> EntryStream<'a> {
    /// Rewinds `file` and starts decoding from its first byte.
    pub(crate) async fn open(format: BookFormat, file: &'a mut File, buffer: usize) -> Result<Self> {
        file.seek(SeekFrom::Start(0)).await?;
        let decoder = match format {
            BookFormat::Text => Decoder::Text {
                decoder: TextDecoder::new(),
                line: Vec::new(),
            },
            BookFormat::Binary => Decoder::Binary(BinaryDecoder::new()),
        };
        Ok(Self {
            reader: BufReader::with_capacity(buffer.max(16), file),
            decoder: Some(decoder),
            entries: 0,
        })
    }

    /// Next entry, or `None` once the file is exhausted.
    pub(crate) async fn next_entry(&mut self) -> Result<Option<(BookKey, BookEntry)>> {
        let next = match &mut self.decoder {
            None => return Ok(None),
            Some(Decoder::Text { decoder, line }) => loop {
                line.clear();
                if self.reader.read_until(b'\n', line).await? == 0 {
                    break None;
                }
                if let Some((key, entry)) = decoder.push_bytes(line)? {
                    break Some((BookKey::Text(key), entry));
                }
            },
            Some(Decoder::Binary(decoder)) => loop {
                let Some(record) = read_record(&mut self.reader).await? else {
                    break None;
                };
                if let Some((key, entry)) = decoder.push_record(&record)? {
                    break Some((BookKey::Binary(key), entry));
                }
            },
        };
        if next.is_some() {
            self.entries += 1;
            return Ok(next);
        }

        // End of file: flush the entry in progress.
        let last = match self.decoder.take() {
            Some(Decoder::Text { decoder, .. }) => {
                if decoder.header_pending() {
                    return Err(FormatError::BadHeader(String::new()).into());
                }
                decoder.finish().map(|(key, entry)| (BookKey::Text(key), entry))
            }
            Some(Decoder::Binary(decoder)) => decoder
                .finish()
                .map(|(key, entry)| (BookKey::Binary(key), entry)),
            None => None,
        };
        if last.is_some() {
            self.entries += 1;
        }
        Ok(last)
    }

    pub(crate) fn entries_read(&self) -> u64 {
        self.entries
    }
}
