mod stream;

pub use stream::{ServerStream, StreamFileSource};

use log::Log;
use thiserror::Error;

use crate::protocols::rfb::{DecodeError, DecodePhase, ServerMessage, SessionContext};

/// A message decoded from a stream, with its position.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// Zero-based index of the message in the stream.
    pub index: u64,
    /// Byte offset of the message type tag.
    pub offset: u64,
    /// Bytes consumed, tag included.
    pub len: u64,
    pub message: ServerMessage,
}

pub trait MessageSource {
    /// Decode the next message; `Ok(None)` when the stream ends at a message
    /// boundary.
    fn next_message(
        &mut self,
        session: &mut dyn SessionContext,
        logger: &dyn Log,
    ) -> Result<Option<DecodedMessage>, StreamError>;
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("message {index} at offset {offset} failed while {phase}: {source}")]
    Decode {
        index: u64,
        offset: u64,
        phase: DecodePhase,
        source: DecodeError,
    },
    /// The stream cannot be resynchronized after a failed message.
    #[error("stream failed at message {index}; no further messages can be read")]
    Failed { index: u64 },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
