use std::io::{ErrorKind, SeekFrom};

use async_trait::async_trait;
use book_core::codec::binary::{BinaryDecoder, RECORD_SIZE, record_key};
use book_core::{BookEntry, BookKey};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, BufReader};

use super::RecordLayout;
use crate::api::Result;

const RECORD: u64 = RECORD_SIZE as u64;

/// Binary books: records sit on 16-byte boundaries.
pub(crate) struct BinaryLayout {
    buffer: usize,
}

impl BinaryLayout {
    pub(crate) fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(RECORD_SIZE),
        }
    }
}

/// Reads one record, or `None` at end of file.
pub(crate) async fn read_record<R>(reader: &mut R) -> Result<Option<[u8; RECORD_SIZE]>>
where
    R: AsyncRead + Unpin,
{
    let mut record = [0u8; RECORD_SIZE];
    match reader.read_exact(&mut record).await {
        Ok(_) => Ok(Some(record)),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl RecordLayout for BinaryLayout {
    async fn next_record(
        &self,
        file: &mut File,
        offset: u64,
        size: u64,
    ) -> Result<Option<(u64, BookKey)>> {
        let start = offset.div_ceil(RECORD) * RECORD;
        if start + RECORD > size {
            return Ok(None);
        }
        file.seek(SeekFrom::Start(start)).await?;
        let mut key = [0u8; 8];
        file.read_exact(&mut key).await?;
        Ok(Some((start, BookKey::Binary(u64::from_le_bytes(key)))))
    }

    async fn read_entry(
        &self,
        file: &mut File,
        start: u64,
        key: &BookKey,
    ) -> Result<Option<BookEntry>> {
        let BookKey::Binary(key) = *key else {
            return Ok(None);
        };
        file.seek(SeekFrom::Start(start)).await?;
        let mut reader = BufReader::with_capacity(self.buffer, file);
        let mut decoder = BinaryDecoder::new();
        while let Some(record) = read_record(&mut reader).await? {
            if record_key(&record) != Some(key) {
                break;
            }
            decoder.push_record(&record)?;
        }
        Ok(decoder.finish().map(|(_, entry)| entry))
    }
}
