#![warn(missing_docs)]

//! nexus-protocol: bandwidth accounting, compression framing and peer-aware compression.

/// Per-second bandwidth accounting and advisory admission.
pub mod bandwidth;
/// Peer-aware compression with pass-through for non-capable peers.
pub mod compression_engine;
/// Compressed frame serialization.
pub mod frame_codec;

pub use bandwidth::RateLimiter;
pub use compression_engine::{CompressionEngine, CompressionStats};
