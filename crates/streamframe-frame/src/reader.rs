use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use tracing::debug;

use crate::codec::Frame;
use crate::error::{FrameError, Result};
use crate::parser::{FrameParser, Outcome, ParserConfig};

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete frames from any `Read` byte source (serial device, pipe, file).
///
/// Bytes are handed to a [`FrameParser`] one at a time; callers only ever see validated,
/// owned frames. Rejected frames are counted, never returned. Resynchronization noise
/// (`HeaderNotFoundYet`) is not counted; diagnostics go to the parser's error sink.
pub struct FrameReader<T> {
    inner: T,
    parser: FrameParser,
    pending: BytesMut,
    rejected: u64,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with the default parser configuration.
    pub fn new(inner: T) -> Self {
        Self::from_parser(inner, FrameParser::new())
    }

    /// Create a new frame reader with explicit parser configuration.
    pub fn with_config(inner: T, config: ParserConfig) -> Result<Self> {
        Ok(Self::from_parser(inner, FrameParser::with_config(config)?))
    }

    /// Wrap an already configured parser (sinks included).
    pub fn from_parser(inner: T, parser: FrameParser) -> Self {
        Self {
            inner,
            parser,
            pending: BytesMut::with_capacity(READ_CHUNK_SIZE),
            rejected: 0,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached; a partial frame at
    /// EOF is dropped.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            while self.pending.has_remaining() {
                let byte = self.pending.get_u8();
                match self.parser.push_byte(byte) {
                    Outcome::Pending => {}
                    Outcome::Frame(packet) => return Frame::from_packet(packet),
                    Outcome::Rejected(crate::ErrorKind::HeaderNotFoundYet) => {}
                    Outcome::Rejected(kind) => {
                        self.rejected += 1;
                        debug!(%kind, rejected = self.rejected, "discarded malformed frame");
                    }
                }
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.pending.extend_from_slice(&chunk[..read]);
        }
    }

    /// Number of frames discarded as invalid (`InvalidPacket` or `InternalError`).
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Borrow the parser.
    pub fn parser(&self) -> &FrameParser {
        &self.parser
    }

    /// Mutably borrow the parser, e.g. to reset it after a framing timeout.
    pub fn parser_mut(&mut self) -> &mut FrameParser {
        &mut self.parser
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    /// Yields frames until the source is exhausted.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Err(FrameError::ConnectionClosed) => None,
            other => Some(other),
        }
    }
}
