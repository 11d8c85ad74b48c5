use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::Log;

use super::{DecodedMessage, MessageSource, SourceError, StreamError};
use crate::protocols::rfb::{DecodePhase, SessionContext, WireReader, decode_with_reader};

/// Server-to-client messages decoded in order from a byte stream.
pub struct ServerStream<R> {
    inner: R,
    index: u64,
    offset: u64,
    phase: DecodePhase,
    failed: bool,
}

/// A server stream read from a capture file.
pub type StreamFileSource = ServerStream<BufReader<File>>;

impl ServerStream<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(64 * 1024, file)))
    }
}

impl<R: Read> ServerStream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            index: 0,
            offset: 0,
            phase: DecodePhase::AwaitingTag,
            failed: false,
        }
    }

    /// Messages decoded so far.
    pub fn messages_read(&self) -> u64 {
        self.index
    }

    /// Bytes consumed so far, including those of a failed message.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Phase of the message in progress; `Failed` once any message failed.
    pub fn phase(&self) -> DecodePhase {
        self.phase
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> MessageSource for ServerStream<R> {
    fn next_message(
        &mut self,
        session: &mut dyn SessionContext,
        logger: &dyn Log,
    ) -> Result<Option<DecodedMessage>, StreamError> {
        if self.failed {
            return Err(StreamError::Failed { index: self.index });
        }

        let mut reader = WireReader::new(&mut self.inner);
        let outcome = match reader.read_tag() {
            Ok(Some(tag)) => decode_with_reader(tag, &mut reader, session, logger).map(Some),
            other => other.map(|_| None),
        };
        let len = reader.consumed();
        let phase = reader.failed_in().unwrap_or(reader.phase());

        let index = self.index;
        let offset = self.offset;
        self.offset += len;
        match outcome {
            Ok(Some(message)) => {
                self.index += 1;
                self.phase = DecodePhase::AwaitingTag;
                Ok(Some(DecodedMessage {
                    index,
                    offset,
                    len,
                    message,
                }))
            }
            Ok(None) => Ok(None),
            Err(source) => {
                self.failed = true;
                self.phase = DecodePhase::Failed;
                Err(StreamError::Decode {
                    index,
                    offset,
                    phase,
                    source,
                })
            }
        }
    }
}
