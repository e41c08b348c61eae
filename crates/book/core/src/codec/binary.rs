//! Apery binary book codec.
//!
//! Headerless sequence of 16-byte little-endian records sorted by key:
//! ```text
//! [u64 key][u16 move code][u16 count][i32 score]
//! ```
//! Consecutive records with the same key form one entry. Within a group the
//! first record for a usi wins; later duplicates are dropped.

use std::collections::BTreeMap;

use super::move_code::{decode_move, encode_move};
use crate::book::{BookEntry, BookMove, EntryKind};
use crate::error::FormatError;

pub const RECORD_SIZE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinaryRecord {
    pub key: u64,
    pub code: u16,
    pub count: u16,
    pub score: i32,
}

impl BinaryRecord {
    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Self {
        let [k0, k1, k2, k3, k4, k5, k6, k7, m0, m1, c0, c1, s0, s1, s2, s3] = *bytes;
        Self {
            key: u64::from_le_bytes([k0, k1, k2, k3, k4, k5, k6, k7]),
            code: u16::from_le_bytes([m0, m1]),
            count: u16::from_le_bytes([c0, c1]),
            score: i32::from_le_bytes([s0, s1, s2, s3]),
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0..8].copy_from_slice(&self.key.to_le_bytes());
        out[8..10].copy_from_slice(&self.code.to_le_bytes());
        out[10..12].copy_from_slice(&self.count.to_le_bytes());
        out[12..16].copy_from_slice(&self.score.to_le_bytes());
        out
    }
}

/// Key stored in the first eight bytes of a record.
pub fn record_key(bytes: &[u8]) -> Option<u64> {
    let key: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    Some(u64::from_le_bytes(key))
}

/// Incremental record decoder grouping records by key.
#[derive(Debug, Default)]
pub struct BinaryDecoder {
    current: Option<(u64, BookEntry)>,
}

impl BinaryDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one record; yields the previous entry when the key changes.
    pub fn push_record(
        &mut self,
        bytes: &[u8; RECORD_SIZE],
    ) -> Result<Option<(u64, BookEntry)>, FormatError> {
        let record = BinaryRecord::from_bytes(bytes);
        let usi = decode_move(record.code)?;

        let finished = match &self.current {
            Some((key, _)) if *key == record.key => None,
            _ => self
                .current
                .replace((record.key, BookEntry::new(0, EntryKind::Normal))),
        };

        if let Some((_, entry)) = self.current.as_mut()
            && entry.position_of(&usi).is_none()
        {
            entry.moves.push(BookMove {
                usi,
                usi2: None,
                score: Some(record.score),
                depth: None,
                count: Some(u64::from(record.count)),
                comment: String::new(),
            });
        }
        Ok(finished)
    }

    pub fn finish(self) -> Option<(u64, BookEntry)> {
        self.current
    }
}

/// Decodes a whole binary book.
pub fn decode(bytes: &[u8]) -> Result<BTreeMap<u64, BookEntry>, FormatError> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(FormatError::BadLength(bytes.len() as u64));
    }
    let mut decoder = BinaryDecoder::new();
    let mut entries = BTreeMap::new();
    for chunk in bytes.chunks_exact(RECORD_SIZE) {
        let record: &[u8; RECORD_SIZE] = chunk
            .try_into()
            .map_err(|_| FormatError::BadLength(bytes.len() as u64))?;
        if let Some((key, entry)) = decoder.push_record(record)? {
            entries.entry(key).or_insert(entry);
        }
    }
    if let Some((key, entry)) = decoder.finish() {
        entries.entry(key).or_insert(entry);
    }
    Ok(entries)
}

/// Appends the records of one entry. Comment, ponder and depth are not stored.
pub fn encode_entry(key: u64, entry: &BookEntry, out: &mut Vec<u8>) -> Result<(), FormatError> {
    for mv in &entry.moves {
        let record = BinaryRecord {
            key,
            code: encode_move(&mv.usi)?,
            count: mv
                .count
                .map_or(0, |count| u16::try_from(count).unwrap_or(u16::MAX)),
            score: mv.score.unwrap_or(0),
        };
        out.extend_from_slice(&record.to_bytes());
    }
    Ok(())
}

/// Encodes a whole binary book, skipping entries without moves.
pub fn encode(entries: &BTreeMap<u64, BookEntry>) -> Result<Vec<u8>, FormatError> {
    let mut out = Vec::with_capacity(entries.len() * RECORD_SIZE);
    for (key, entry) in entries {
        encode_entry(*key, entry, &mut out)?;
    }
    Ok(out)
}
