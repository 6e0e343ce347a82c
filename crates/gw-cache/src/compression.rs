use crate::error::CacheError;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Values whose serialized byte length exceeds this are compressed before
/// storage. See SPEC_FULL.md §4.2.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1000;
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Compresses `bytes` at `level` (1-9, clamped). The caller is responsible
/// for deciding whether compression was worthwhile (see
/// [`DEFAULT_COMPRESSION_THRESHOLD`]) — this function always compresses.
pub fn compress(bytes: &[u8], level: u32) -> Result<Vec<u8>, CacheError> {
    let level = level.clamp(1, 9);
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
    encoder
        .write_all(bytes)
        .map_err(|e| CacheError::Infrastructure(format!("compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| CacheError::Infrastructure(format!("compression failed: {e}")))
}

/// Decompresses a value produced by [`compress`]. Mandatory before
/// deserialization when the stored entry's `compressed` flag is set.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CacheError> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CacheError::Infrastructure(format!("decompression failed: {e}")))?;
    Ok(out)
}

/// Whether a serialized value should be compressed before storage, given
/// the configured threshold.
pub fn should_compress(bytes: &[u8], threshold: usize) -> bool {
    bytes.len() > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_at_every_documented_level() {
        let payload = "the quick brown fox jumps over the lazy dog ".repeat(50);
        for level in 1..=9 {
            let compressed = compress(payload.as_bytes(), level).unwrap();
            let decompressed = decompress(&compressed).unwrap();
            assert_eq!(decompressed, payload.as_bytes());
        }
    }

    #[test]
    fn compress_is_idempotent_as_a_byte_for_byte_transform() {
        let payload = b"deterministic payload for compression";
        let once = compress(payload, 6).unwrap();
        let twice = compress(&decompress(&once).unwrap(), 6).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn threshold_respects_configured_cutoff() {
        let small = vec![0u8; 10];
        let large = vec![0u8; 2000];
        assert!(!should_compress(&small, DEFAULT_COMPRESSION_THRESHOLD));
        assert!(should_compress(&large, DEFAULT_COMPRESSION_THRESHOLD));
    }
}
