//! Vector snapshot file format.
//!
//! Layout (little-endian):
//!
//! Header (22 bytes):
//!   Magic: "SMVX" (4 bytes)
//!   Version: u16
//!   Dimension: u32
//!   Count: u64
//!   HeaderCRC32: u32 (CRC32 of the 18 header bytes before this field)
//!
//! Body:
//!   Count × Dimension f32 values in position order
//!   BodyCRC32: u32 (CRC32 of the value bytes)
//!
//! Loading validates every field; any mismatch is fatal. The store refuses
//! to start on a corrupt snapshot rather than continue with an empty index.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::VectorError;
use crate::flat::FlatIndex;
use crate::index::VectorIndex;

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"SMVX";
pub const SNAPSHOT_VERSION: u16 = 1;
pub const HEADER_LEN: usize = 4 + 2 + 4 + 8 + 4;

/// Decoded snapshot header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u16,
    pub dimension: u32,
    pub count: u64,
}

impl SnapshotHeader {
    pub fn new(dimension: usize, count: usize) -> Result<Self, VectorError> {
        let dimension = u32::try_from(dimension).map_err(|_| VectorError::DimensionMismatch {
            expected: u32::MAX as usize,
            actual: dimension,
        })?;
        Ok(Self {
            version: SNAPSHOT_VERSION,
            dimension,
            count: count as u64,
        })
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&SNAPSHOT_MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..10].copy_from_slice(&self.dimension.to_le_bytes());
        buf[10..18].copy_from_slice(&self.count.to_le_bytes());
        let crc = crc32fast::hash(&buf[..18]);
        buf[18..22].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    pub fn decode(path: &Path, bytes: &[u8]) -> Result<Self, VectorError> {
        if bytes.len() < HEADER_LEN {
            return Err(VectorError::corrupt(path, "truncated header"));
        }
        if bytes[0..4] != SNAPSHOT_MAGIC {
            return Err(VectorError::corrupt(
                path,
                format!("invalid magic {:?}", &bytes[0..4]),
            ));
        }
        let crc_expected = u32::from_le_bytes(le_array(&bytes[18..22]));
        let crc_actual = crc32fast::hash(&bytes[..18]);
        if crc_expected != crc_actual {
            return Err(VectorError::corrupt(
                path,
                format!(
                    "header CRC mismatch (expected {crc_expected:#010x}, got {crc_actual:#010x})"
                ),
            ));
        }
        let version = u16::from_le_bytes(le_array(&bytes[4..6]));
        if version != SNAPSHOT_VERSION {
            return Err(VectorError::corrupt(
                path,
                format!("unsupported version {version}"),
            ));
        }
        let dimension = u32::from_le_bytes(le_array(&bytes[6..10]));
        if dimension == 0 {
            return Err(VectorError::corrupt(path, "dimension is zero"));
        }
        Ok(Self {
            version,
            dimension,
            count: u64::from_le_bytes(le_array(&bytes[10..18])),
        })
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Write the index to `path` atomically.
pub fn write_vector_snapshot(path: &Path, index: &FlatIndex) -> Result<u64, VectorError> {
    let header = SnapshotHeader::new(index.dimension(), index.len())?;
    let mut body = Vec::with_capacity(index.as_slice().len() * 4);
    for value in index.as_slice() {
        body.extend_from_slice(&value.to_le_bytes());
    }
    let body_crc = crc32fast::hash(&body);

    write_atomic(path, |writer| {
        writer.write_all(&header.encode())?;
        writer.write_all(&body)?;
        writer.write_all(&body_crc.to_le_bytes())?;
        Ok(())
    })?;

    let bytes = (HEADER_LEN + body.len() + 4) as u64;
    info!(path = ?path, vectors = index.len(), bytes, "Saved vector snapshot");
    Ok(bytes)
}

/// Read a snapshot, validating it against the store dimension.
///
/// Returns `Ok(None)` when no snapshot exists yet.
pub fn read_vector_snapshot(
    path: &Path,
    expected_dimension: usize,
) -> Result<Option<FlatIndex>, VectorError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let header = SnapshotHeader::decode(path, &bytes)?;
    if header.dimension as usize != expected_dimension {
        return Err(VectorError::DimensionMismatch {
            expected: expected_dimension,
            actual: header.dimension as usize,
        });
    }

    let values = usize::try_from(header.count)
        .ok()
        .and_then(|count| count.checked_mul(header.dimension as usize))
        .ok_or_else(|| VectorError::corrupt(path, "count overflows"))?;
    let body_len = values
        .checked_mul(4)
        .ok_or_else(|| VectorError::corrupt(path, "count overflows"))?;
    let expected_len = HEADER_LEN + body_len + 4;
    if bytes.len() != expected_len {
        return Err(VectorError::corrupt(
            path,
            format!(
                "expected {expected_len} bytes for {} vectors, found {}",
                header.count,
                bytes.len()
            ),
        ));
    }

    let body = &bytes[HEADER_LEN..HEADER_LEN + body_len];
    let crc_expected = u32::from_le_bytes(le_array(&bytes[HEADER_LEN + body_len..]));
    let crc_actual = crc32fast::hash(body);
    if crc_expected != crc_actual {
        return Err(VectorError::corrupt(
            path,
            format!("body CRC mismatch (expected {crc_expected:#010x}, got {crc_actual:#010x})"),
        ));
    }

    let data: Vec<f32> = body
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(le_array(chunk)))
        .collect();

    debug!(path = ?path, vectors = header.count, "Loaded vector snapshot");
    FlatIndex::from_parts(header.dimension as usize, data).map(Some)
}

/// Write through a temporary sibling, fsync, then rename over `path`.
pub(crate) fn write_atomic<F>(path: &Path, write: F) -> Result<(), VectorError>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let tmp = temp_path(path);
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        write(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    sync_parent(path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
