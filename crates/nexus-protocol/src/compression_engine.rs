//! Peer-aware payload compression.
//!
//! The engine decides, per outbound payload, whether compressing it for a given
//! peer is allowed and worthwhile, and wraps the result in a compressed frame
//! (see [`frame_codec`](crate::frame_codec)). Inbound payloads that are not
//! frames pass through untouched.
//!
//! Admission requires all of:
//! - compression enabled locally, or forced on by the server override
//! - the peer registered as frame-capable
//! - the payload at least `compression_threshold` bytes
//! - (optional) the payload passing the entropy estimate
//!
//! Compression that does not make the frame strictly smaller than the input is
//! discarded and the original bytes are returned. Errors never leave the engine:
//! they are logged and the input is passed through.

use std::{borrow::Cow, collections::HashSet};

use nexus_core::{config::Config, error::Result, PeerId};

use crate::frame_codec::{compress, decode_frame, decompress, encode_frame, is_frame, likely_compressible};

/// Largest declared length honoured when bounding an inbound frame.
const MAX_INFLATED_LEN: usize = 1024 * 1024;
/// Bytes a frame may inflate beyond its declared length before it is rejected.
const INFLATE_SLACK: usize = 64 * 1024;

/// Cumulative compression counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressionStats {
    /// Payload bytes that went into successful compressions
    pub bytes_before: u64,
    /// Frame bytes that came out of successful compressions
    pub bytes_after: u64,
    /// Payloads shipped as compressed frames
    pub packets_compressed: u64,
    /// Payloads shipped unchanged (not admitted, not smaller, or failed)
    pub packets_skipped: u64,
    /// Frames successfully inflated on receive
    pub packets_decompressed: u64,
    /// Inflated frames whose length differed from the declared length
    pub integrity_mismatches: u64,
}

/// Compresses outbound payloads for capable peers and unwraps inbound frames.
#[derive(Debug, Clone)]
pub struct CompressionEngine {
    /// Peers known to understand compressed frames
    peers: HashSet<PeerId>,
    enabled: bool,
    forced: bool,
    level: u32,
    threshold: usize,
    entropy_check: bool,
    stats: CompressionStats,
}

impl CompressionEngine {
    /// Creates an engine with settings taken from `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            peers: HashSet::new(),
            enabled: config.compression_enabled,
            forced: config.force_compression,
            level: config.compression_level,
            threshold: config.compression_threshold,
            entropy_check: config.compression_entropy_check,
            stats: CompressionStats::default(),
        }
    }

    /// Re-reads compression settings. Registered peers and counters are kept.
    pub fn apply_config(&mut self, config: &Config) {
        self.enabled = config.compression_enabled;
        self.forced = config.force_compression;
        self.level = config.compression_level;
        self.threshold = config.compression_threshold;
        self.entropy_check = config.compression_entropy_check;
    }

    /// Marks `peer` as frame-capable. Returns `true` if it was not registered before.
    pub fn register_peer(&mut self, peer: PeerId) -> bool {
        let added = self.peers.insert(peer);
        if added {
            tracing::debug!("Registered compression peer: {}", peer);
        }
        added
    }

    /// Forgets `peer`. Returns `true` if it was registered.
    pub fn unregister_peer(&mut self, peer: PeerId) -> bool {
        let removed = self.peers.remove(&peer);
        if removed {
            tracing::debug!("Unregistered compression peer: {}", peer);
        }
        removed
    }

    /// Returns whether `peer` may receive compressed frames.
    pub fn is_peer_registered(&self, peer: PeerId) -> bool {
        self.peers.contains(&peer)
    }

    /// Number of frame-capable peers.
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Sets the local enable flag.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Sets the server-enforced override.
    pub fn set_forced(&mut self, forced: bool) {
        self.forced = forced;
    }

    /// Compression is on if the server forces it, otherwise if enabled locally.
    pub fn is_compression_enabled(&self) -> bool {
        self.forced || self.enabled
    }

    /// Returns a compressed frame for `peer`, or `payload` itself when compression
    /// is not admitted or does not make the payload smaller.
    pub fn compress_for_peer<'a>(&mut self, peer: PeerId, payload: &'a [u8]) -> Cow<'a, [u8]> {
        if payload.is_empty() {
            return Cow::Borrowed(payload);
        }

        if !self.admits(peer, payload) {
            self.stats.packets_skipped += 1;
            return Cow::Borrowed(payload);
        }

        match self.try_compress(payload) {
            Ok(Some(frame)) => {
                self.stats.bytes_before += payload.len() as u64;
                self.stats.bytes_after += frame.len() as u64;
                self.stats.packets_compressed += 1;
                Cow::Owned(frame)
            }
            Ok(None) => {
                self.stats.packets_skipped += 1;
                Cow::Borrowed(payload)
            }
            Err(err) => {
                tracing::warn!("Compression failed for peer {} ({}): {}", peer, err.kind(), err);
                self.stats.packets_skipped += 1;
                Cow::Borrowed(payload)
            }
        }
    }

    /// Unwraps a compressed frame, or returns `payload` itself if it is not one.
    ///
    /// A frame whose inflated length differs from its declared length is still
    /// returned; the mismatch is logged and counted. A frame that inflates well
    /// past its declared length (capped at 1 MiB) is rejected and passed through
    /// as-is.
    pub fn decompress_from_peer<'a>(&mut self, payload: &'a [u8]) -> Cow<'a, [u8]> {
        if !is_frame(payload) {
            return Cow::Borrowed(payload);
        }

        match self.try_decompress(payload) {
            Ok(decompressed) => {
                self.stats.packets_decompressed += 1;
                Cow::Owned(decompressed)
            }
            Err(err) => {
                tracing::warn!(
                    "Decompression failed ({} bytes, {}): {}",
                    payload.len(),
                    err.kind(),
                    err
                );
                Cow::Borrowed(payload)
            }
        }
    }

    /// Fraction of bytes saved, `1 - after / before`; `0.0` before any compression.
    pub fn compression_ratio(&self) -> f32 {
        if self.stats.bytes_before == 0 {
            return 0.0;
        }
        1.0 - (self.stats.bytes_after as f32 / self.stats.bytes_before as f32)
    }

    /// Total bytes saved by compression.
    pub fn bytes_saved(&self) -> u64 {
        self.stats.bytes_before.saturating_sub(self.stats.bytes_after)
    }

    /// Returns the cumulative counters.
    pub fn stats(&self) -> &CompressionStats {
        &self.stats
    }

    /// Forgets every registered peer. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.peers.clear();
    }

    fn admits(&self, peer: PeerId, payload: &[u8]) -> bool {
        self.is_compression_enabled()
            && self.is_peer_registered(peer)
            && payload.len() >= self.threshold
            && (!self.entropy_check || likely_compressible(payload))
    }

    fn try_compress(&self, payload: &[u8]) -> Result<Option<Vec<u8>>> {
        let body = compress(payload, self.level)?;
        let frame = encode_frame(payload.len(), &body)?;

        // Only ship the frame if it is smaller than what it replaces
        if frame.len() < payload.len() {
            Ok(Some(frame))
        } else {
            Ok(None)
        }
    }

    fn try_decompress(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        let frame = decode_frame(payload)?;
        let declared = usize::try_from(frame.original_len).unwrap_or(0);
        let limit = declared.min(MAX_INFLATED_LEN) + INFLATE_SLACK;
        let decompressed = decompress(frame.body, limit)?;

        if decompressed.len() as i64 != frame.original_len as i64 {
            self.stats.integrity_mismatches += 1;
            tracing::warn!(
                "Decompression size mismatch: expected {}, got {}",
                frame.original_len,
                decompressed.len()
            );
        }

        Ok(decompressed)
    }
}

impl Default for CompressionEngine {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
