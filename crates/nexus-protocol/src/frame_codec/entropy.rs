//! Compressibility estimate based on byte diversity.

/// Number of leading bytes inspected.
const SAMPLE_SIZE: usize = 256;

/// Returns `false` when the leading sample looks like random or already-compressed data.
///
/// Counts distinct byte values in the first 256 bytes; if they make up 80% or
/// more of the sample, compression is unlikely to pay off.
pub fn likely_compressible(data: &[u8]) -> bool {
    let sample = &data[..data.len().min(SAMPLE_SIZE)];
    if sample.is_empty() {
        return false;
    }

    let mut seen = [false; 256];
    let mut unique = 0usize;
    for &byte in sample {
        if !seen[byte as usize] {
            seen[byte as usize] = true;
            unique += 1;
        }
    }

    // unique < 0.8 * sample, kept in integers
    unique * 5 < sample.len() * 4
}
