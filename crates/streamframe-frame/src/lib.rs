//! Incremental, CRC-32 checked frame parsing for byte streams.
//!
//! Frames on the wire look like this:
//! - A 2-byte header `/*`
//! - A 2-byte little-endian body length
//! - A 3-byte opaque type tag
//! - The body
//! - A 4-byte little-endian CRC-32/ISO-HDLC over everything before it plus the trailer
//! - A 2-byte trailer `*/`
//!
//! Bytes are pushed into a [`FrameParser`] one at a time. It resynchronizes on noise,
//! rejects damaged frames, and hands completed frames to a sink.

pub mod codec;
pub mod context;
pub mod crc;
pub mod error;
pub mod parser;
pub mod reader;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::StreamFrameCodec;
pub use codec::{
    encode_frame, Frame, DEFAULT_BUFFER_CAPACITY, HEADER, MAX_BODY_LEN, MAX_FRAME_LEN,
    MIN_FRAME_LEN, TRAILER,
};
pub use crc::Crc32;
pub use error::{ErrorKind, FrameError, Result, Violation};
pub use parser::{ErrorSink, FrameParser, Outcome, PacketSink, ParserConfig, ParserState};
pub use reader::FrameReader;
