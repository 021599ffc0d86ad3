use std::fmt;

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::codec::{
    frame_checksum, CHECKSUM_LEN, DEFAULT_BUFFER_CAPACITY, HEADER, LENGTH_END, MAX_FRAME_LEN,
    MIN_FRAME_LEN, TRAILER, TYPE_END,
};
use crate::context::{self, Snapshot};
use crate::error::{ErrorKind, FrameError, Result, Violation};

/// Where the parser is within the frame being reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserState {
    SeekHeader,
    ReadLength,
    ReadType,
    ReadBody,
    ReadChecksum,
    SeekTrailer,
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Configuration for a [`FrameParser`].
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Largest frame (header through trailer) the parser accepts. Default: 1 KiB.
    ///
    /// Values above [`MAX_FRAME_LEN`] are clamped, since no frame can be longer.
    pub buffer_capacity: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// Result of pushing one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<'a> {
    /// The byte was consumed; no frame boundary was reached.
    Pending,
    /// The byte completed a frame. The slice borrows the parser buffer and is overwritten by
    /// later pushes; copy it out (e.g. with [`crate::Frame::from_packet`]) to keep it.
    Frame(&'a [u8]),
    /// The frame in progress was abandoned and the parser is back to seeking a header.
    Rejected(ErrorKind),
}

impl Outcome<'_> {
    pub fn is_frame(&self) -> bool {
        matches!(self, Outcome::Frame(_))
    }
}

/// Receives completed frames. The slice is only valid for the duration of the call.
pub trait PacketSink {
    fn on_packet(&mut self, packet: &[u8]);
}

impl<F> PacketSink for F
where
    F: FnMut(&[u8]),
{
    fn on_packet(&mut self, packet: &[u8]) {
        self(packet)
    }
}

/// Receives diagnostics along with a human-readable context line.
pub trait ErrorSink {
    fn on_error(&mut self, kind: ErrorKind, message: &str);
}

impl<F> ErrorSink for F
where
    F: FnMut(ErrorKind, &str),
{
    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        self(kind, message)
    }
}

enum Step {
    Continue(ParserState),
    Complete,
}

/// Byte-at-a-time frame parser.
///
/// Exactly one frame is reconstructed at a time in a buffer allocated once at construction.
/// Malformed input never stalls the parser: every violation drops the partial frame, is
/// reported to the error sink, and returns the machine to [`ParserState::SeekHeader`].
///
/// ```
/// use bytes::BytesMut;
/// use streamframe_frame::{encode_frame, FrameParser, Outcome};
///
/// let mut wire = BytesMut::new();
/// encode_frame(*b"MSG", b"hello", &mut wire).unwrap();
///
/// let mut parser = FrameParser::new();
/// let mut frames = 0;
/// for &byte in wire.iter() {
///     if let Outcome::Frame(packet) = parser.push_byte(byte) {
///         assert_eq!(packet, &wire[..]);
///         frames += 1;
///     }
/// }
/// assert_eq!(frames, 1);
/// ```
pub struct FrameParser {
    buf: BytesMut,
    cursor: usize,
    state: ParserState,
    declared_length: usize,
    packet_sink: Option<Box<dyn PacketSink + Send>>,
    error_sink: Option<Box<dyn ErrorSink + Send>>,
}

impl FrameParser {
    /// Create a parser with the default 1 KiB buffer.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Create a parser from explicit configuration.
    pub fn with_config(config: ParserConfig) -> Result<Self> {
        if config.buffer_capacity < MIN_FRAME_LEN {
            return Err(FrameError::CapacityTooSmall {
                capacity: config.buffer_capacity,
                min: MIN_FRAME_LEN,
            });
        }
        Ok(Self::with_capacity(config.buffer_capacity))
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::zeroed(capacity.min(MAX_FRAME_LEN)),
            cursor: 0,
            state: ParserState::SeekHeader,
            declared_length: 0,
            packet_sink: None,
            error_sink: None,
        }
    }

    /// Register the sink for completed frames, replacing any previous one.
    pub fn set_packet_sink(&mut self, sink: impl PacketSink + Send + 'static) {
        self.packet_sink = Some(Box::new(sink));
    }

    /// Drop the packet sink. Frames are still returned from [`FrameParser::push_byte`].
    pub fn clear_packet_sink(&mut self) {
        self.packet_sink = None;
    }

    /// Register the sink for diagnostics, replacing any previous one.
    pub fn set_error_sink(&mut self, sink: impl ErrorSink + Send + 'static) {
        self.error_sink = Some(Box::new(sink));
    }

    /// Drop the error sink. Diagnostics are then only visible through [`Outcome::Rejected`].
    pub fn clear_error_sink(&mut self) {
        self.error_sink = None;
    }

    /// Current state.
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Number of bytes of the current frame accumulated so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total length of the frame in progress, or 0 before its length field is read.
    pub fn declared_length(&self) -> usize {
        self.declared_length
    }

    /// Largest frame this parser accepts.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Abandon any partial frame without reporting it.
    ///
    /// Useful for callers that time out stalled frames above this layer.
    pub fn reset(&mut self) {
        self.state = ParserState::SeekHeader;
        self.cursor = 0;
        self.declared_length = 0;
    }

    /// Feed every byte of `bytes`, returning how many frames were completed.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> usize {
        bytes
            .iter()
            .filter(|&&byte| self.push_byte(byte).is_frame())
            .count()
    }

    /// Advance the state machine by one byte.
    pub fn push_byte(&mut self, byte: u8) -> Outcome<'_> {
        match self.transition(byte) {
            Ok(Step::Continue(next)) => {
                if next != self.state {
                    trace!(
                        from = %self.state,
                        to = %next,
                        cursor = self.cursor,
                        "parser transition"
                    );
                    self.state = next;
                }
                Outcome::Pending
            }
            Ok(Step::Complete) => {
                let len = self.declared_length;
                trace!(len, "frame complete");
                self.reset();
                if let Some(sink) = self.packet_sink.as_mut() {
                    sink.on_packet(&self.buf[..len]);
                }
                Outcome::Frame(&self.buf[..len])
            }
            Err(violation) => {
                let kind = violation.kind();
                self.report(&violation);
                self.reset();
                if let Violation::HeaderMismatch { received: b'/' } = violation {
                    // The offending byte may itself open the next header.
                    self.buf[0] = b'/';
                    self.cursor = 1;
                }
                Outcome::Rejected(kind)
            }
        }
    }

    fn transition(&mut self, byte: u8) -> std::result::Result<Step, Violation> {
        use ParserState::*;

        let next = match self.state {
            SeekHeader => {
                if self.cursor == 0 {
                    // Not synchronized yet: anything but '/' is skipped silently.
                    if byte == HEADER[0] {
                        self.store(byte)?;
                    }
                    SeekHeader
                } else if byte == HEADER[1] {
                    self.store(byte)?;
                    ReadLength
                } else {
                    return Err(Violation::HeaderMismatch { received: byte });
                }
            }
            ReadLength => {
                if self.store(byte)? < LENGTH_END {
                    ReadLength
                } else {
                    let body_len = usize::from(u16::from_le_bytes([self.buf[2], self.buf[3]]));
                    let declared = body_len + MIN_FRAME_LEN;
                    if declared > self.capacity() {
                        return Err(Violation::LengthOutOfRange {
                            declared,
                            min: MIN_FRAME_LEN,
                            max: self.capacity(),
                        });
                    }
                    self.declared_length = declared;
                    ReadType
                }
            }
            ReadType => {
                if self.store(byte)? < TYPE_END {
                    ReadType
                } else if self.declared_length == MIN_FRAME_LEN {
                    // Empty body: the next byte already belongs to the checksum.
                    ReadChecksum
                } else {
                    ReadBody
                }
            }
            ReadBody => {
                if self.store(byte)? < self.checksum_start() {
                    ReadBody
                } else {
                    ReadChecksum
                }
            }
            ReadChecksum => {
                if self.store(byte)? < self.checksum_start() + CHECKSUM_LEN {
                    ReadChecksum
                } else {
                    self.verify_checksum()?;
                    SeekTrailer
                }
            }
            SeekTrailer => {
                let cursor = self.store(byte)?;
                if cursor == self.declared_length - 1 && byte == TRAILER[0] {
                    SeekTrailer
                } else if cursor == self.declared_length && byte == TRAILER[1] {
                    return Ok(Step::Complete);
                } else {
                    return Err(Violation::BadTrailer {
                        position: cursor - 1,
                        received: byte,
                    });
                }
            }
        };

        Ok(Step::Continue(next))
    }

    /// Append `byte`, returning the new cursor.
    fn store(&mut self, byte: u8) -> std::result::Result<usize, Violation> {
        if self.cursor >= self.buf.len() {
            return Err(Violation::Overrun {
                cursor: self.cursor,
                capacity: self.buf.len(),
            });
        }
        self.buf[self.cursor] = byte;
        self.cursor += 1;
        Ok(self.cursor)
    }

    fn checksum_start(&self) -> usize {
        self.declared_length - TRAILER.len() - CHECKSUM_LEN
    }

    fn verify_checksum(&self) -> std::result::Result<(), Violation> {
        let at = self.checksum_start();
        let expected = frame_checksum(&self.buf[..at]);
        let received = u32::from_le_bytes([
            self.buf[at],
            self.buf[at + 1],
            self.buf[at + 2],
            self.buf[at + 3],
        ]);
        if expected != received {
            return Err(Violation::ChecksumMismatch { expected, received });
        }
        Ok(())
    }

    fn report(&mut self, violation: &Violation) {
        let kind = violation.kind();
        match kind {
            ErrorKind::HeaderNotFoundYet => trace!(%violation, "resynchronizing"),
            _ => debug!(
                %kind,
                %violation,
                state = %self.state,
                cursor = self.cursor,
                "frame rejected"
            ),
        }

        if let Some(sink) = self.error_sink.as_mut() {
            let message = context::describe(
                violation,
                &Snapshot {
                    state: self.state,
                    cursor: self.cursor,
                    declared_length: self.declared_length,
                    buffer: &self.buf[..self.cursor],
                    limit: self.buf.len(),
                },
            );
            sink.on_error(kind, &message);
        }
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameParser")
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("declared_length", &self.declared_length)
            .field("capacity", &self.buf.len())
            .field("packet_sink", &self.packet_sink.is_some())
            .field("error_sink", &self.error_sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::codec::encode_frame;

    fn wire(frame_type: &[u8; 3], body: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(*frame_type, body, &mut buf).unwrap();
        buf.to_vec()
    }

    fn parser_with_capacity(capacity: usize) -> FrameParser {
        FrameParser::with_config(ParserConfig {
            buffer_capacity: capacity,
        })
        .unwrap()
    }

    type Recorded = Arc<Mutex<Vec<(ErrorKind, String)>>>;

    fn record_errors(parser: &mut FrameParser) -> Recorded {
        let errors: Recorded = Arc::default();
        let sink = Arc::clone(&errors);
        parser.set_error_sink(move |kind: ErrorKind, message: &str| {
            sink.lock().unwrap().push((kind, message.to_string()));
        });
        errors
    }

    fn record_packets(parser: &mut FrameParser) -> Arc<Mutex<Vec<Vec<u8>>>> {
        let packets = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&packets);
        parser.set_packet_sink(move |packet: &[u8]| {
            sink.lock().unwrap().push(packet.to_vec());
        });
        packets
    }

    #[test]
    fn parses_single_frame() {
        let bytes = wire(b"MSG", b"hello");
        let mut parser = FrameParser::new();

        let (last, rest) = bytes.split_last().unwrap();
        for &byte in rest {
            assert_eq!(parser.push_byte(byte), Outcome::Pending);
        }
        match parser.push_byte(*last) {
            Outcome::Frame(packet) => assert_eq!(packet, bytes.as_slice()),
            other => panic!("expected frame, got {other:?}"),
        }
        assert_eq!(parser.state(), ParserState::SeekHeader);
        assert_eq!(parser.cursor(), 0);
    }

    #[test]
    fn walks_every_state() {
        let bytes = wire(b"MSG", b"ab");
        let mut parser = FrameParser::new();
        let mut seen = Vec::new();
        for &byte in &bytes {
            parser.push_byte(byte);
            if seen.last() != Some(&parser.state()) {
                seen.push(parser.state());
            }
        }
        assert_eq!(
            seen,
            vec![
                ParserState::SeekHeader,
                ParserState::ReadLength,
                ParserState::ReadType,
                ParserState::ReadBody,
                ParserState::ReadChecksum,
                ParserState::SeekTrailer,
                ParserState::SeekHeader,
            ]
        );
    }

    #[test]
    fn packet_sink_receives_exact_bytes() {
        let bytes = wire(b"TMP", b"21.5C");
        let mut parser = FrameParser::new();
        let packets = record_packets(&mut parser);

        assert_eq!(parser.push_bytes(&bytes), 1);
        assert_eq!(packets.lock().unwrap().as_slice(), &[bytes]);
    }

    #[test]
    fn empty_body_frame() {
        let bytes = wire(b"NOP", b"");
        let mut parser = FrameParser::new();
        let errors = record_errors(&mut parser);

        assert_eq!(parser.push_bytes(&bytes), 1);
        assert!(errors.lock().unwrap().is_empty());
    }

    #[test]
    fn leading_noise_is_skipped_silently() {
        let mut stream = b"\x00\xFFgarbage*\r\n".to_vec();
        stream.extend(wire(b"MSG", b"x"));
        let mut parser = FrameParser::new();
        let errors = record_errors(&mut parser);
        let packets = record_packets(&mut parser);

        assert_eq!(parser.push_bytes(&stream), 1);
        assert!(errors.lock().unwrap().is_empty());
        assert_eq!(packets.lock().unwrap().len(), 1);
    }

    #[test]
    fn broken_header_reports_header_not_found() {
        let mut parser = FrameParser::new();
        let errors = record_errors(&mut parser);

        assert_eq!(parser.push_byte(b'/'), Outcome::Pending);
        assert_eq!(
            parser.push_byte(b'x'),
            Outcome::Rejected(ErrorKind::HeaderNotFoundYet)
        );
        assert_eq!(parser.cursor(), 0);

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, ErrorKind::HeaderNotFoundYet);
        assert!(errors[0].1.contains("received 0x78"));
        assert!(errors[0].1.contains("state: SeekHeader"));
        assert!(errors[0].1.ends_with("buffer: 2F"));
    }

    #[test]
    fn repeated_slash_still_finds_header() {
        let mut stream = b"//".to_vec();
        stream.extend(wire(b"MSG", b"x")[1..].iter());
        let mut parser = FrameParser::new();
        let packets = record_packets(&mut parser);

        assert_eq!(parser.push_bytes(&stream), 1);
        assert_eq!(packets.lock().unwrap()[0], wire(b"MSG", b"x"));
    }

    #[test]
    fn length_equal_to_capacity_is_accepted() {
        let body = vec![0x5A; 7];
        let bytes = wire(b"CAP", &body);
        assert_eq!(bytes.len(), 20);

        let mut parser = parser_with_capacity(20);
        assert_eq!(parser.push_bytes(&bytes), 1);
    }

    #[test]
    fn length_over_capacity_is_rejected_at_length_field() {
        let bytes = wire(b"CAP", &[0x5A; 8]);
        let mut parser = parser_with_capacity(20);
        let errors = record_errors(&mut parser);

        for &byte in &bytes[..3] {
            assert_eq!(parser.push_byte(byte), Outcome::Pending);
        }
        assert_eq!(
            parser.push_byte(bytes[3]),
            Outcome::Rejected(ErrorKind::InvalidPacket)
        );
        assert_eq!(parser.state(), ParserState::SeekHeader);
        assert!(errors.lock().unwrap()[0]
            .1
            .starts_with("invalid packet length 21 (allowed 13..=20)"));
    }

    #[test]
    fn checksum_mismatch_discards_frame() {
        let mut bytes = wire(b"MSG", b"hello");
        bytes[8] ^= 0x40;
        let mut parser = FrameParser::new();
        let errors = record_errors(&mut parser);
        let packets = record_packets(&mut parser);

        let outcomes: Vec<_> = bytes
            .iter()
            .map(|&b| match parser.push_byte(b) {
                Outcome::Rejected(kind) => Some(kind),
                _ => None,
            })
            .collect();

        // Rejected once the last checksum byte arrives.
        assert_eq!(outcomes[bytes.len() - 3], Some(ErrorKind::InvalidPacket));
        assert!(packets.lock().unwrap().is_empty());
        let errors = errors.lock().unwrap();
        assert_eq!(errors[0].0, ErrorKind::InvalidPacket);
        assert!(errors[0].1.starts_with("checksum mismatch"));
        assert!(errors[0].1.contains("state: ReadChecksum"));
    }

    #[test]
    fn bad_first_trailer_byte() {
        let mut bytes = wire(b"MSG", b"hi");
        let n = bytes.len();
        bytes[n - 2] = b'#';
        let mut parser = FrameParser::new();
        let errors = record_errors(&mut parser);

        assert_eq!(parser.push_bytes(&bytes), 0);
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .1
            .starts_with(&format!("incorrect trailer byte 0x23 at position {}", n - 2)));
    }

    #[test]
    fn bad_second_trailer_byte() {
        let mut bytes = wire(b"MSG", b"hi");
        let n = bytes.len();
        bytes[n - 1] = b'*';
        let mut parser = FrameParser::new();

        let mut last = Outcome::Pending;
        for &byte in &bytes {
            last = match parser.push_byte(byte) {
                Outcome::Rejected(kind) => Outcome::Rejected(kind),
                Outcome::Frame(_) => panic!("corrupt frame must not complete"),
                Outcome::Pending => Outcome::Pending,
            };
        }
        assert_eq!(last, Outcome::Rejected(ErrorKind::InvalidPacket));
        assert_eq!(parser.state(), ParserState::SeekHeader);
    }

    #[test]
    fn recovers_for_next_frame() {
        let mut corrupt = wire(b"MSG", b"first");
        corrupt[9] ^= 0xFF;
        let good = wire(b"MSG", b"second");

        let mut stream = corrupt;
        stream.extend(&good);
        let mut parser = FrameParser::new();
        let packets = record_packets(&mut parser);

        assert_eq!(parser.push_bytes(&stream), 1);
        assert_eq!(packets.lock().unwrap().as_slice(), &[good]);
    }

    #[test]
    fn works_without_sinks() {
        let mut parser = FrameParser::new();
        let mut bad = wire(b"MSG", b"x");
        bad[5] ^= 1;
        assert_eq!(parser.push_bytes(&bad), 0);
        assert_eq!(parser.push_bytes(&wire(b"MSG", b"x")), 1);
    }

    #[test]
    fn sinks_can_be_replaced_and_cleared() {
        let mut parser = FrameParser::new();
        let first = record_packets(&mut parser);
        parser.push_bytes(&wire(b"ONE", b""));

        let second = record_packets(&mut parser);
        parser.push_bytes(&wire(b"TWO", b""));

        parser.clear_packet_sink();
        assert_eq!(parser.push_bytes(&wire(b"THR", b"")), 1);

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().len(), 1);
    }

    #[test]
    fn reset_abandons_partial_frame() {
        let bytes = wire(b"MSG", b"payload");
        let mut parser = FrameParser::new();
        parser.push_bytes(&bytes[..9]);
        assert_eq!(parser.state(), ParserState::ReadBody);
        assert_eq!(parser.declared_length(), bytes.len());

        parser.reset();
        assert_eq!(parser.state(), ParserState::SeekHeader);
        assert_eq!(parser.declared_length(), 0);
        assert_eq!(parser.push_bytes(&bytes), 1);
    }

    #[test]
    fn overrun_is_internal_error() {
        let mut parser = parser_with_capacity(13);
        let errors = record_errors(&mut parser);
        parser.state = ParserState::ReadBody;
        parser.cursor = 13;
        parser.declared_length = 13;

        assert_eq!(
            parser.push_byte(0),
            Outcome::Rejected(ErrorKind::InternalError)
        );
        assert_eq!(parser.state(), ParserState::SeekHeader);
        assert_eq!(errors.lock().unwrap()[0].0, ErrorKind::InternalError);
    }

    #[test]
    fn capacity_below_minimum_is_rejected() {
        let err = FrameParser::with_config(ParserConfig { buffer_capacity: 12 }).unwrap_err();
        assert!(matches!(
            err,
            FrameError::CapacityTooSmall {
                capacity: 12,
                min: 13
            }
        ));
    }

    #[test]
    fn capacity_is_clamped_to_wire_maximum() {
        let parser = parser_with_capacity(1 << 20);
        assert_eq!(parser.capacity(), MAX_FRAME_LEN);
    }

    #[test]
    fn debug_does_not_require_debug_sinks() {
        let mut parser = FrameParser::new();
        parser.set_packet_sink(|_: &[u8]| {});
        let text = format!("{parser:?}");
        assert!(text.contains("packet_sink: true"));
        assert!(text.contains("error_sink: false"));
    }
}
