//! Frame header encoding and decoding.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nexus_core::{
    constants::{COMPRESSION_MARKER, FRAME_HEADER_SIZE, MIN_FRAME_SIZE},
    error::{ErrorKind, Result},
};

/// A frame split into its declared length and compressed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    /// Length of the payload before compression, as written by the sender.
    pub original_len: i32,
    /// Compressed body following the header.
    pub body: &'a [u8],
}

/// Returns true if `data` has the shape of a compressed frame.
pub fn is_frame(data: &[u8]) -> bool {
    data.len() >= MIN_FRAME_SIZE && data[0] == COMPRESSION_MARKER
}

/// Wraps a compressed body in a frame declaring `original_len` bytes.
pub fn encode_frame(original_len: usize, body: &[u8]) -> Result<Vec<u8>> {
    let declared = i32::try_from(original_len).map_err(|_| ErrorKind::FrameTooLarge(original_len))?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + body.len());
    frame.write_u8(COMPRESSION_MARKER)?;
    frame.write_i32::<LittleEndian>(declared)?;
    frame.extend_from_slice(body);
    Ok(frame)
}

/// Splits a frame into header fields and body.
pub fn decode_frame(data: &[u8]) -> Result<DecodedFrame<'_>> {
    if !is_frame(data) {
        return Err(ErrorKind::MalformedFrame(format!(
            "expected marker 0x{:02X} and at least {} bytes, got {} bytes",
            COMPRESSION_MARKER,
            MIN_FRAME_SIZE,
            data.len()
        )));
    }

    let mut cursor = Cursor::new(&data[1..FRAME_HEADER_SIZE]);
    let original_len = cursor.read_i32::<LittleEndian>()?;
    Ok(DecodedFrame { original_len, body: &data[FRAME_HEADER_SIZE..] })
}
