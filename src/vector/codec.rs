//! Single-file binary format for a persisted [`VectorIndex`].
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic        8 bytes  "DLVIDX\0\0"
//! version      u32
//! metric       u32      0 = cosine, 1 = l2
//! dimension    u32
//! count        u64      number of records
//! manifest_len u64
//! manifest     JSON     records (text + metadata) and next chunk index
//! vectors      count * dimension * f32
//! checksum     32 bytes SHA-256 of everything above
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::index::{IndexRecord, VectorIndex};
use super::metric::SimilarityMetric;

const MAGIC: &[u8; 8] = b"DLVIDX\0\0";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 4 + 4 + 8 + 8;
const CHECKSUM_LEN: usize = 32;

#[derive(Serialize)]
struct ManifestRef<'a> {
    next_chunk_index: u64,
    records: &'a [IndexRecord],
}

#[derive(Deserialize)]
struct Manifest {
    next_chunk_index: u64,
    records: Vec<IndexRecord>,
}

pub(crate) fn encode(index: &VectorIndex) -> Result<Vec<u8>, serde_json::Error> {
    let manifest = serde_json::to_vec(&ManifestRef {
        next_chunk_index: index.next_chunk_index(),
        records: index.records(),
    })?;
    let vectors = index.vectors();

    let mut out = Vec::with_capacity(HEADER_LEN + manifest.len() + vectors.len() * 4 + CHECKSUM_LEN);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&index.metric().tag().to_le_bytes());
    out.extend_from_slice(&(index.dimension() as u32).to_le_bytes());
    out.extend_from_slice(&(index.len() as u64).to_le_bytes());
    out.extend_from_slice(&(manifest.len() as u64).to_le_bytes());
    out.extend_from_slice(&manifest);
    for value in vectors {
        out.extend_from_slice(&value.to_le_bytes());
    }

    let checksum = Sha256::digest(&out);
    out.extend_from_slice(&checksum);
    Ok(out)
}

/// Decode an index, describing the first problem found on failure.
pub(crate) fn decode(bytes: &[u8]) -> Result<VectorIndex, String> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(format!("file too short ({} bytes)", bytes.len()));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err("not an index file (bad magic)".to_string());
    }

    let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if Sha256::digest(body).as_slice() != checksum {
        return Err("checksum mismatch".to_string());
    }

    let mut reader = Reader {
        bytes: body,
        pos: MAGIC.len(),
    };

    let version = reader.u32()?;
    if version != VERSION {
        return Err(format!("unsupported format version {version}"));
    }
    let metric_tag = reader.u32()?;
    let metric = SimilarityMetric::from_tag(metric_tag)
        .ok_or_else(|| format!("unknown metric tag {metric_tag}"))?;
    let dimension = reader.u32()? as usize;
    let count = usize::try_from(reader.u64()?).map_err(|_| "record count overflow".to_string())?;
    let manifest_len =
        usize::try_from(reader.u64()?).map_err(|_| "manifest length overflow".to_string())?;

    let manifest: Manifest = serde_json::from_slice(reader.take(manifest_len)?)
        .map_err(|e| format!("invalid manifest: {e}"))?;

    if manifest.records.len() != count {
        return Err(format!(
            "header declares {count} records but manifest holds {}",
            manifest.records.len()
        ));
    }
    if count > 0 && dimension == 0 {
        return Err("non-empty index with zero dimension".to_string());
    }

    let byte_len = count
        .checked_mul(dimension)
        .and_then(|values| values.checked_mul(4))
        .ok_or_else(|| "vector block size overflow".to_string())?;
    let raw = reader.rest();
    if raw.len() != byte_len {
        return Err(format!(
            "expected {byte_len} vector bytes, found {}",
            raw.len()
        ));
    }

    let vectors = raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(VectorIndex::from_parts(
        metric,
        dimension,
        manifest.records,
        vectors,
        manifest.next_chunk_index,
    ))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| format!("unexpected end of data at offset {}", self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, String> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, String> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        slice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{Chunk, ChunkMetadata};
    use std::path::PathBuf;

    fn sample() -> VectorIndex {
        let mut index = VectorIndex::new(SimilarityMetric::L2);
        for (i, v) in [[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]].iter().enumerate() {
            let chunk = Chunk::new(
                format!("chunk {i}"),
                ChunkMetadata {
                    source_path: PathBuf::from("guide.pdf"),
                    page_number: 3,
                    chunk_index: 10 + i as u64,
                    char_range: (i * 5, i * 5 + 7),
                },
            );
            index.insert(chunk, v.to_vec()).unwrap();
        }
        index
    }

    #[test]
    fn test_roundtrip_preserves_everything() {
        let index = sample();
        let decoded = decode(&encode(&index).unwrap()).unwrap();
        assert_eq!(decoded, index);
        assert_eq!(decoded.next_chunk_index(), 12);
        assert_eq!(decoded.metric(), SimilarityMetric::L2);
    }

    #[test]
    fn test_empty_index_roundtrip() {
        let index = VectorIndex::new(SimilarityMetric::Cosine);
        let decoded = decode(&encode(&index).unwrap()).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.dimension(), 0);
    }

    #[test]
    fn test_flipped_byte_fails_checksum() {
        let mut bytes = encode(&sample()).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;
        assert_eq!(decode(&bytes).unwrap_err(), "checksum mismatch");
    }

    #[test]
    fn test_truncated_file_rejected() {
        let bytes = encode(&sample()).unwrap();
        assert!(decode(&bytes[..bytes.len() - 1]).is_err());
        assert!(decode(&bytes[..10]).is_err());
    }

    #[test]
    fn test_huge_declared_dimension_is_rejected() {
        let bytes = encode(&sample()).unwrap();
        let mut body = bytes[..bytes.len() - CHECKSUM_LEN].to_vec();
        body[16..20].copy_from_slice(&u32::MAX.to_le_bytes());
        let checksum = Sha256::digest(&body);
        body.extend_from_slice(&checksum);

        let err = decode(&body).unwrap_err();
        assert!(err.contains("vector bytes") || err.contains("overflow"), "{err}");
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[0] = b'X';
        assert!(decode(&bytes).unwrap_err().contains("magic"));
    }
}
