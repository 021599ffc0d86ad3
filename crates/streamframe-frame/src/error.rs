use std::fmt;

/// Diagnostic categories reported to an error sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller contract violation (e.g. a null handle across the C ABI).
    InvalidArg,
    /// Resynchronization in progress; expected on idle or noisy links.
    HeaderNotFoundYet,
    /// Length out of bounds, checksum mismatch, or malformed trailer. The frame is discarded.
    InvalidPacket,
    /// The parser reached a state that should be impossible.
    InternalError,
}

impl ErrorKind {
    /// Stable upper-case name, used in logs and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidArg => "INVALID_ARG",
            ErrorKind::HeaderNotFoundYet => "HEADER_NOT_FOUND_YET",
            ErrorKind::InvalidPacket => "INVALID_PACKET",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the parser abandoned the frame in progress.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    /// The byte after `/` was not `*`.
    #[error("expected '/' then '*', received 0x{received:02X}")]
    HeaderMismatch { received: u8 },

    /// The declared frame length does not fit the parser buffer.
    #[error("invalid packet length {declared} (allowed {min}..={max})")]
    LengthOutOfRange {
        declared: usize,
        min: usize,
        max: usize,
    },

    /// The received checksum does not match the computed one.
    #[error("checksum mismatch, expected {expected:08X}, received {received:08X}")]
    ChecksumMismatch { expected: u32, received: u32 },

    /// A trailer byte was not the expected `*` or `/`.
    #[error("incorrect trailer byte 0x{received:02X} at position {position}")]
    BadTrailer { position: usize, received: u8 },

    /// The write cursor would have run past the buffer.
    #[error("buffer overrun at cursor {cursor} (capacity {capacity})")]
    Overrun { cursor: usize, capacity: usize },
}

impl Violation {
    /// Diagnostic category this violation is reported under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Violation::HeaderMismatch { .. } => ErrorKind::HeaderNotFoundYet,
            Violation::LengthOutOfRange { .. }
            | Violation::ChecksumMismatch { .. }
            | Violation::BadTrailer { .. } => ErrorKind::InvalidPacket,
            Violation::Overrun { .. } => ErrorKind::InternalError,
        }
    }
}

/// Errors surfaced by the fallible APIs (construction, encoding, reading).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The configured buffer cannot hold even an empty-body frame.
    #[error("buffer capacity {capacity} is below the minimum frame length {min}")]
    CapacityTooSmall { capacity: usize, min: usize },

    /// The body does not fit the 16-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A byte slice handed to [`crate::Frame::from_packet`] is not a complete frame.
    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
