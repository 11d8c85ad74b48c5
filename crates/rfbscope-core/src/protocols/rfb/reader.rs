use std::io::{self, Read};

use super::error::DecodeError;
use super::types::DecodePhase;

/// Reserved up front by [`read_bytes`]; larger bodies grow as bytes arrive.
const READ_PREALLOC_BYTES: usize = 64 * 1024;

/// Big-endian field reader over a blocking byte stream.
///
/// Counts every byte it consumes and carries the decode phase of the
/// message in progress, so a failure can be reported with its position.
/// It implements `Read` itself: encoding decoders receive it as
/// `&mut dyn Read` and their reads are counted too.
pub struct WireReader<'a> {
    inner: &'a mut dyn Read,
    consumed: u64,
    phase: DecodePhase,
    failed_in: Option<DecodePhase>,
}

impl<'a> WireReader<'a> {
    pub fn new(inner: &'a mut dyn Read) -> Self {
        Self {
            inner,
            consumed: 0,
            phase: DecodePhase::AwaitingTag,
            failed_in: None,
        }
    }

    /// Bytes consumed since construction.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn phase(&self) -> DecodePhase {
        self.phase
    }

    /// Phase the last failed message was in when it failed.
    pub fn failed_in(&self) -> Option<DecodePhase> {
        self.failed_in
    }

    pub(crate) fn set_phase(&mut self, phase: DecodePhase) {
        self.phase = phase;
    }

    pub(crate) fn fail(&mut self) {
        self.failed_in = Some(self.phase);
        self.phase = DecodePhase::Failed;
    }

    /// Read a message type tag, or `None` when the stream ends cleanly
    /// before any byte of a new message.
    pub fn read_tag(&mut self) -> Result<Option<u8>, DecodeError> {
        let mut tag = [0u8; 1];
        loop {
            match self.read(&mut tag) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(tag[0])),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let [value] = self.read_array::<1>()?;
        Ok(value)
    }

    pub fn read_u16_be(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32_be(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Consume and discard `len` padding bytes.
    pub fn skip_padding(&mut self, len: usize) -> Result<(), DecodeError> {
        let mut remaining = len;
        let mut scratch = [0u8; 8];
        while remaining > 0 {
            let chunk = remaining.min(scratch.len());
            fill(self, &mut scratch[..chunk])?;
            remaining -= chunk;
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        read_bytes(self, len)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut buf = [0u8; N];
        fill(self, &mut buf)?;
        Ok(buf)
    }
}

impl Read for WireReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        Ok(n)
    }
}

/// Read exactly `len` bytes, growing the buffer as data arrives so a
/// truncated stream fails before the declared size is committed.
pub fn read_bytes(stream: &mut dyn Read, len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut buf = Vec::with_capacity(len.min(READ_PREALLOC_BYTES));
    stream.take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(short_read(buf.len(), len).into());
    }
    Ok(buf)
}

/// Read a big-endian `u16` from any stream.
pub fn read_u16_be(stream: &mut dyn Read) -> Result<u16, DecodeError> {
    let mut buf = [0u8; 2];
    fill(stream, &mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn fill(stream: &mut dyn Read, buf: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => return Err(short_read(filled, buf.len())),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

fn short_read(got: usize, needed: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("stream ended after {got} of {needed} bytes"),
    )
}
