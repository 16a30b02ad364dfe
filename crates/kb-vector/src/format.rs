//! On-disk layout of the index pair.
//!
//! `index.bin`: a 16-byte header (`b"KBVI"`, `u32` dim, `u64` count)
//! followed by `count * dim` `f32` values, row-major. Every field is
//! little-endian regardless of host. `metadata.json`: a JSON array of
//! chunks, one per vector, in insertion order.

use std::fs;
use std::io::Write;
use std::path::Path;

use bytemuck::{Pod, Zeroable};
use kb_core::error::{Error, Result};
use kb_core::types::Chunk;

pub const INDEX_FILE: &str = "index.bin";
pub const METADATA_FILE: &str = "metadata.json";

const MAGIC: [u8; 4] = *b"KBVI";
const HEADER_LEN: usize = std::mem::size_of::<IndexHeader>();
const F32_LEN: usize = std::mem::size_of::<f32>();

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct IndexHeader {
    magic: [u8; 4],
    dim: u32,
    count: u64,
}

pub(crate) struct RawIndex {
    pub dim: usize,
    pub count: usize,
    pub vectors: Vec<f32>,
}

pub(crate) fn encode_index(dim: usize, vectors: &[f32]) -> Result<Vec<u8>> {
    let count = if dim == 0 { 0 } else { vectors.len() / dim };
    let header = IndexHeader {
        magic: MAGIC,
        dim: u32::try_from(dim)
            .map_err(|_| Error::Operation(format!("dimension {dim} does not fit the index header")))?
            .to_le(),
        count: (count as u64).to_le(),
    };
    let mut buf = Vec::with_capacity(HEADER_LEN + vectors.len() * F32_LEN);
    buf.extend_from_slice(bytemuck::bytes_of(&header));
    for v in vectors {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    Ok(buf)
}

pub(crate) fn decode_index(bytes: &[u8]) -> Result<RawIndex> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::CorruptIndex(format!("{INDEX_FILE} is {} bytes, shorter than its header", bytes.len())));
    }
    let header: IndexHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_LEN]);
    if header.magic != MAGIC {
        return Err(Error::CorruptIndex(format!("{INDEX_FILE} has a bad magic number")));
    }
    let dim = u32::from_le(header.dim) as usize;
    let raw_count = u64::from_le(header.count);
    let count = usize::try_from(raw_count)
        .map_err(|_| Error::CorruptIndex(format!("vector count {raw_count} is too large")))?;
    if dim == 0 && count != 0 {
        return Err(Error::CorruptIndex(format!("header declares {count} vectors of dimension 0")));
    }
    let payload = &bytes[HEADER_LEN..];
    let expected = dim
        .checked_mul(count)
        .and_then(|n| n.checked_mul(F32_LEN))
        .ok_or_else(|| Error::CorruptIndex("header dimensions overflow".into()))?;
    if payload.len() != expected {
        return Err(Error::CorruptIndex(format!(
            "payload is {} bytes, header declares {count} x {dim} vectors ({expected} bytes)",
            payload.len()
        )));
    }
    let vectors = payload
        .chunks_exact(F32_LEN)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(RawIndex { dim, count, vectors })
}

/// Write through a sibling temp file and rename it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub(crate) fn read_metadata(path: &Path) -> Result<Vec<Chunk>> {
    let raw = fs::read(path)?;
    serde_json::from_slice(&raw).map_err(|e| Error::CorruptIndex(format!("{METADATA_FILE}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_sixteen_bytes() {
        assert_eq!(HEADER_LEN, 16);
    }

    #[test]
    fn decodes_what_it_encodes() {
        let bytes = encode_index(2, &[1.0, 0.0, 0.5, 0.5]).unwrap();
        assert_eq!(&bytes[..4], b"KBVI");
        let raw = decode_index(&bytes).unwrap();
        assert_eq!((raw.dim, raw.count), (2, 2));
        assert_eq!(raw.vectors, vec![1.0, 0.0, 0.5, 0.5]);
    }

    #[test]
    fn rejects_truncated_payload_and_bad_magic() {
        let mut bytes = encode_index(3, &[1.0, 2.0, 3.0]).unwrap();
        bytes.pop();
        assert!(matches!(decode_index(&bytes), Err(Error::CorruptIndex(_))));

        let mut bytes = encode_index(1, &[1.0]).unwrap();
        bytes[0] = b'X';
        assert!(matches!(decode_index(&bytes), Err(Error::CorruptIndex(_))));
        assert!(matches!(decode_index(b"KB"), Err(Error::CorruptIndex(_))));

        let mut zero_dim = b"KBVI".to_vec();
        zero_dim.extend_from_slice(&0u32.to_le_bytes());
        zero_dim.extend_from_slice(&2u64.to_le_bytes());
        assert!(matches!(decode_index(&zero_dim), Err(Error::CorruptIndex(_))));
    }

    #[test]
    fn empty_index_has_zero_dim_and_count() {
        let raw = decode_index(&encode_index(0, &[]).unwrap()).unwrap();
        assert_eq!((raw.dim, raw.count), (0, 0));
        assert!(raw.vectors.is_empty());
    }

    #[test]
    fn fields_are_little_endian() {
        let bytes = encode_index(1, &[1.0]).unwrap();
        assert_eq!(&bytes[4..8], &1u32.to_le_bytes());
        assert_eq!(&bytes[8..16], &1u64.to_le_bytes());
        assert_eq!(&bytes[16..], &1.0f32.to_le_bytes());
    }
}
