//! Gzip compression and decompression.

use std::io::{Read, Write};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use nexus_core::error::{ErrorKind, Result};

/// Compresses `data` into a gzip stream at `level` (clamped to `1..=9`).
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder =
        GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(level.clamp(1, 9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflates a gzip stream produced by [`compress`], producing at most `limit` bytes.
///
/// Streams that would inflate past `limit` fail with [`ErrorKind::InflateLimit`]
/// after reading one byte beyond it; the rest of the stream is never inflated.
pub fn decompress(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data).take((limit as u64).saturating_add(1));
    let mut decompressed = Vec::with_capacity(limit.min(data.len().saturating_mul(4)));
    decoder.read_to_end(&mut decompressed)?;

    if decompressed.len() > limit {
        return Err(ErrorKind::InflateLimit(limit));
    }
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_repetitive_data_shrinks() {
        let data = b"repetition repetition repetition repetition repetition repetition".repeat(8);
        let compressed = compress(&data, 6).unwrap();
        assert!(compressed.len() < data.len());
        assert_eq!(decompress(&compressed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_out_of_range_levels_are_clamped() {
        let data = b"level check level check level check".repeat(4);
        for level in [0, 1, 9, 42] {
            let compressed = compress(&data, level).unwrap();
            assert_eq!(decompress(&compressed, data.len()).unwrap(), data);
        }
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(decompress(b"definitely not gzip", 64).is_err());
    }

    #[test]
    fn test_decompress_stops_at_limit() {
        let data = vec![0u8; 4 * 1024 * 1024];
        let compressed = compress(&data, 9).unwrap();

        let err = decompress(&compressed, 16).unwrap_err();
        assert!(matches!(err, ErrorKind::InflateLimit(16)));
        assert_eq!(decompress(&compressed, data.len()).unwrap().len(), data.len());
    }
}
