use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{encode_frame, Frame};
use crate::error::{ErrorKind, FrameError, Result};
use crate::parser::{FrameParser, Outcome, ParserConfig};

/// `tokio_util` codec over the byte-at-a-time [`FrameParser`].
///
/// Decoding consumes the read buffer one byte at a time, so a partial frame lives in the
/// parser rather than in `src`.
#[derive(Debug, Default)]
pub struct StreamFrameCodec {
    parser: FrameParser,
}

impl StreamFrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Result<Self> {
        Ok(Self {
            parser: FrameParser::with_config(config)?,
        })
    }

    pub fn parser_mut(&mut self) -> &mut FrameParser {
        &mut self.parser
    }
}

impl Decoder for StreamFrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        while src.has_remaining() {
            match self.parser.push_byte(src.get_u8()) {
                Outcome::Pending => {}
                Outcome::Frame(packet) => return Frame::from_packet(packet).map(Some),
                Outcome::Rejected(ErrorKind::HeaderNotFoundYet) => {}
                Outcome::Rejected(kind) => warn!(%kind, "discarded malformed frame"),
            }
        }
        Ok(None)
    }
}

impl Encoder<Frame> for StreamFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        encode_frame(item.frame_type, &item.body, dst)
    }
}
