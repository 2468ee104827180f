//! Write-ahead journal.
//!
//! Every insert is one frame holding both the vector and its metadata
//! record, fsynced before the insert is acknowledged. On open the frames
//! are replayed on top of the snapshots, so the vector and metadata
//! snapshots are derived state and the journal is the commit point.
//!
//! Frame layout (little-endian):
//!
//! ```text
//! len u32 | crc32 u32 | payload[len]
//! payload = position u64 | dimension u32 | f32 × dimension
//!         | path_len u32 | path | summary_len u32 | summary
//! ```
//!
//! A frame cut short by a crash, or one whose CRC does not match, ends
//! replay; the file is truncated back to the last intact frame.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::VectorError;

const FRAME_HEADER_LEN: usize = 8;

/// One committed insert.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub position: u64,
    pub vector: Vec<f32>,
    pub path: String,
    pub summary: String,
}

impl JournalEntry {
    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            8 + 4 + self.vector.len() * 4 + 4 + self.path.len() + 4 + self.summary.len(),
        );
        buf.extend_from_slice(&self.position.to_le_bytes());
        buf.extend_from_slice(&(self.vector.len() as u32).to_le_bytes());
        for value in &self.vector {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf.extend_from_slice(&(self.path.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.path.as_bytes());
        buf.extend_from_slice(&(self.summary.len() as u32).to_le_bytes());
        buf.extend_from_slice(self.summary.as_bytes());
        buf
    }

    fn decode(payload: &[u8]) -> Option<Self> {
        let mut cursor = Cursor { buf: payload };
        let position = cursor.u64()?;
        let dimension = cursor.u32()? as usize;
        let vector = cursor
            .take(dimension.checked_mul(4)?)?
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let path_len = cursor.u32()? as usize;
        let path = String::from_utf8(cursor.take(path_len)?.to_vec()).ok()?;
        let summary_len = cursor.u32()? as usize;
        let summary = String::from_utf8(cursor.take(summary_len)?.to_vec()).ok()?;
        if !cursor.buf.is_empty() {
            return None;
        }
        Some(Self {
            position,
            vector,
            path,
            summary,
        })
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() < n {
            return None;
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Some(head)
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Option<u64> {
        let b = self.take(8)?;
        let mut out = [0u8; 8];
        out.copy_from_slice(b);
        Some(u64::from_le_bytes(out))
    }
}

/// Append-only journal file.
pub struct Journal {
    path: PathBuf,
    file: File,
    len: u64,
    entries: usize,
}

impl Journal {
    /// Open (or create) the journal and return every intact frame.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, Vec<JournalEntry>), VectorError> {
        let path = path.into();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let (entries, good_len) = decode_frames(&bytes);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        if good_len < bytes.len() {
            warn!(
                path = ?path,
                kept = entries.len(),
                discarded_bytes = bytes.len() - good_len,
                "Discarding torn journal tail"
            );
            file.set_len(good_len as u64)?;
            file.sync_all()?;
        }

        if !entries.is_empty() {
            info!(path = ?path, entries = entries.len(), "Replaying journal");
        }

        let journal = Self {
            path,
            file,
            len: good_len as u64,
            entries: entries.len(),
        };
        Ok((journal, entries))
    }

    /// Append one frame and fsync it.
    ///
    /// On failure the file is cut back to its previous length so later
    /// frames are not stranded behind a partial one.
    pub fn append(&mut self, entry: &JournalEntry) -> Result<(), VectorError> {
        let payload = entry.encode();
        let len = u32::try_from(payload.len()).map_err(|_| {
            VectorError::InvalidPath(format!("journal frame too large: {} bytes", payload.len()))
        })?;
        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);

        let written = self
            .file
            .write_all(&frame)
            .and_then(|_| self.file.sync_data());
        if let Err(e) = written {
            if let Err(rollback) = self.file.set_len(self.len) {
                warn!(path = ?self.path, error = %rollback, "Failed to roll back journal");
            }
            return Err(e.into());
        }

        self.len += frame.len() as u64;
        self.entries += 1;
        debug!(position = entry.position, "Journaled insert");
        Ok(())
    }

    /// Drop every frame; called once both snapshots are durable.
    pub fn truncate(&mut self) -> Result<(), VectorError> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.len = 0;
        self.entries = 0;
        debug!(path = ?self.path, "Truncated journal");
        Ok(())
    }

    /// Frames written since the last truncate (including replayed ones).
    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn size_bytes(&self) -> u64 {
        self.len
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Decode frames until the first torn or corrupt one.
/// Returns the entries and the byte length they cover.
fn decode_frames(bytes: &[u8]) -> (Vec<JournalEntry>, usize) {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while bytes.len() - offset >= FRAME_HEADER_LEN {
        let header = &bytes[offset..offset + FRAME_HEADER_LEN];
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = offset + FRAME_HEADER_LEN;
        let Some(payload) = start.checked_add(len).and_then(|end| bytes.get(start..end)) else {
            break;
        };
        if crc32fast::hash(payload) != crc {
            break;
        }
        let Some(entry) = JournalEntry::decode(payload) else {
            break;
        };

        entries.push(entry);
        offset = start + len;
    }

    (entries, offset)
}
