use std::fmt;

use thiserror::Error;

/// Errors returned while decoding server-to-client messages.
///
/// Every variant is fatal for the message being decoded: there is no
/// resynchronization point in the stream, so callers usually close the
/// connection.
///
/// # Examples
/// ```
/// use rfbscope_core::protocols::rfb::DecodeError;
///
/// let err = DecodeError::UnsupportedEncoding { encoding: 16 };
/// assert!(err.to_string().contains("unsupported encoding type: 16"));
/// ```
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stream failed or ended before the message was complete.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown server message type: {tag}")]
    UnknownMessageType { tag: u8 },
    /// No decoder is registered for the rectangle's encoding, not even the fallback.
    #[error("unsupported encoding type: {encoding}")]
    UnsupportedEncoding { encoding: i32 },
    /// A peer-controlled size is above the configured decode limits.
    #[error("{kind} limit exceeded: {actual} > {limit}")]
    LimitExceeded {
        kind: LimitKind,
        limit: u64,
        actual: u64,
    },
    #[error("invalid pixel format: {bits_per_pixel} bits per pixel")]
    InvalidPixelFormat { bits_per_pixel: u8 },
}

impl DecodeError {
    /// Whether the stream ended before the message was complete.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, Self::Io(err) if err.kind() == std::io::ErrorKind::UnexpectedEof)
    }

    /// Stable short code used in reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => "truncated",
            Self::Io(_) => "io",
            Self::UnknownMessageType { .. } => "unknown-message-type",
            Self::UnsupportedEncoding { .. } => "unsupported-encoding",
            Self::LimitExceeded { .. } => "limit-exceeded",
            Self::InvalidPixelFormat { .. } => "invalid-pixel-format",
        }
    }
}

/// Peer-controlled quantity bounded by [`DecodeLimits`](super::DecodeLimits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Rectangles,
    RectanglePayloadBytes,
    CutTextBytes,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rectangles => "rectangles",
            Self::RectanglePayloadBytes => "rectangle payload bytes",
            Self::CutTextBytes => "cut text bytes",
        };
        write!(f, "{name}")
    }
}
