//! Compressed frame serialization.
//!
//! A compressed payload travels as a fixed-layout frame:
//!
//! ```text
//! [marker: u8 = 0x4E][original length: i32 LE][gzip stream ...]
//! ```
//!
//! Anything that does not start with the marker, or is too short to hold a
//! header plus a body, is not a frame and must be delivered untouched. That is
//! what keeps peers without frame support interoperable.
//!
//! # Module Organization
//!
//! - [`compression`] - gzip deflate/inflate at a configurable level
//! - [`frame`] - frame header encoding and decoding
//! - [`entropy`] - cheap compressibility estimate used for admission

pub mod compression;
pub mod entropy;
pub mod frame;


pub use compression::{compress, decompress};
pub use entropy::likely_compressible;
pub use frame::{decode_frame, encode_frame, is_frame, DecodedFrame};
