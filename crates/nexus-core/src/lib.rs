#![warn(missing_docs)]

//! nexus-core: foundational types shared by every layer of the shaper.
//!
//! This crate provides the minimal set of core utilities shared across all layers:
//! - Configuration types
//! - Error handling
//! - Wire and timing constants
//!
//! The algorithmic components live in specialized crates:
//! - `nexus-protocol`: rate limiting, compression frame codec, compression engine
//! - `nexus-peer`: per-connection queue accounting
//! - `nexus-host`: quality scoring, diagnostics campaigns, the shaper context

/// Constants shared across layers.
pub mod constants {
    use std::time::Duration;

    /// Marker byte that opens every compressed frame (`'N'`).
    pub const COMPRESSION_MARKER: u8 = 0x4E;
    /// Size of the frame header: marker byte plus little-endian `i32` original length.
    pub const FRAME_HEADER_SIZE: usize = 5;
    /// Smallest buffer the decompression path will treat as a frame.
    ///
    /// A header with no compressed body cannot be a frame produced by the encoder.
    pub const MIN_FRAME_SIZE: usize = FRAME_HEADER_SIZE + 1;
    /// Length of one rate accounting window.
    pub const RATE_WINDOW: Duration = Duration::from_secs(1);
    /// Number of completed windows kept for rate reporting.
    pub const RATE_HISTORY_SIZE: usize = 10;
    /// Remaining capacity reported for an unlimited direction.
    pub const UNLIMITED_CAPACITY: u64 = u64::MAX;
    /// Cadence at which the quality scorer refreshes its snapshot.
    pub const QUALITY_UPDATE_INTERVAL: Duration = Duration::from_millis(500);
    /// Weight given to the newest sample in ping/loss moving averages.
    pub const EMA_SAMPLE_WEIGHT: f32 = 0.2;
    /// Total length of a diagnostics campaign.
    pub const DIAGNOSTICS_DURATION: Duration = Duration::from_secs(5);
    /// Spacing between diagnostics samples.
    pub const DIAGNOSTICS_SAMPLE_INTERVAL: Duration = Duration::from_millis(250);
}

/// Configuration options consumed by the shaper components.
pub mod config;
/// Error types and results.
pub mod error;

pub use config::{Config, Limit};
pub use error::{ErrorKind, Result};

/// Opaque identifier the host assigns to a remote peer or connection.
///
/// The shaper never interprets it beyond equality and hashing.
pub type PeerId = u64;
