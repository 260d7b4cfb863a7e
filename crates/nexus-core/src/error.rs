//! Error types shared across the shaper crates.
//!
//! None of these errors ever reach the host as a failure of a public
//! transform or accounting call: components catch them and degrade to a
//! default value. They surface only as structured results (for example a
//! rejected diagnostics start) and in log output.

use std::io;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Every failure the shaper can describe.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The deflate stream could not be produced or consumed.
    #[error("compression stream failed: {0}")]
    Compression(#[from] io::Error),
    /// Payload is too large for the 4-byte length field of a frame.
    #[error("payload of {0} bytes does not fit in a compression frame")]
    FrameTooLarge(usize),
    /// A frame inflated past the number of bytes the receiver will accept.
    #[error("frame inflates past the {0} byte limit")]
    InflateLimit(usize),
    /// A buffer carrying the marker byte did not hold a well-formed frame.
    #[error("malformed compression frame: {0}")]
    MalformedFrame(String),
    /// A diagnostics campaign is already in progress.
    #[error("a diagnostics test is already running")]
    CampaignRunning,
    /// There is no active connection to measure.
    #[error("{0}")]
    NotConnected(String),
}

impl ErrorKind {
    /// Returns the variant name, stable across message changes.
    pub fn kind(&self) -> &'static str {
        match self {
            ErrorKind::Compression(_) => "Compression",
            ErrorKind::FrameTooLarge(_) => "FrameTooLarge",
            ErrorKind::InflateLimit(_) => "InflateLimit",
            ErrorKind::MalformedFrame(_) => "MalformedFrame",
            ErrorKind::CampaignRunning => "CampaignRunning",
            ErrorKind::NotConnected(_) => "NotConnected",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_returns_variant_name() {
        assert_eq!(ErrorKind::FrameTooLarge(1).kind(), "FrameTooLarge");
        assert_eq!(ErrorKind::CampaignRunning.kind(), "CampaignRunning");
        assert_eq!(ErrorKind::NotConnected("x".into()).kind(), "NotConnected");
        assert_eq!(ErrorKind::MalformedFrame("x".into()).kind(), "MalformedFrame");
        assert_eq!(ErrorKind::InflateLimit(16).kind(), "InflateLimit");
    }

    #[test]
    fn test_not_connected_displays_message_verbatim() {
        let err = ErrorKind::NotConnected("Join a world first.".into());
        assert_eq!(err.to_string(), "Join a world first.");
    }

    #[test]
    fn test_from_io_error_produces_compression_variant() {
        let io_err = io::Error::new(io::ErrorKind::InvalidData, "corrupt deflate stream");
        let err: ErrorKind = io_err.into();
        assert_eq!(err.kind(), "Compression");
        assert!(err.to_string().contains("corrupt deflate stream"));
    }
}
