use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::Crc32;
use crate::error::{FrameError, Result};

/// Header bytes: "/*".
pub const HEADER: [u8; 2] = [b'/', b'*'];

/// Trailer bytes: "*/".
pub const TRAILER: [u8; 2] = [b'*', b'/'];

/// Header (2) + length (2) + type (3) + checksum (4) + trailer (2).
pub const MIN_FRAME_LEN: usize = 13;

/// Largest body the 16-bit length field can describe.
pub const MAX_BODY_LEN: usize = u16::MAX as usize;

/// Largest frame the wire format can describe.
pub const MAX_FRAME_LEN: usize = MAX_BODY_LEN + MIN_FRAME_LEN;

/// Default parser buffer capacity: 1 KiB.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

pub(crate) const LENGTH_END: usize = 4;
pub(crate) const TYPE_END: usize = 7;
pub(crate) const CHECKSUM_LEN: usize = 4;

/// An owned copy of a validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Opaque 3-byte type tag.
    pub frame_type: [u8; 3],
    /// The frame body.
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(frame_type: [u8; 3], body: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            body: body.into(),
        }
    }

    /// Copy a complete wire frame (as handed out by the parser) into an owned `Frame`.
    ///
    /// The header, declared length, checksum and trailer are all re-checked.
    pub fn from_packet(packet: &[u8]) -> Result<Self> {
        if packet.len() < MIN_FRAME_LEN {
            return Err(FrameError::Malformed("shorter than the minimum frame"));
        }
        if packet[..2] != HEADER {
            return Err(FrameError::Malformed("missing '/*' header"));
        }
        if packet[packet.len() - 2..] != TRAILER {
            return Err(FrameError::Malformed("missing '*/' trailer"));
        }

        let body_len = usize::from(u16::from_le_bytes([packet[2], packet[3]]));
        if body_len + MIN_FRAME_LEN != packet.len() {
            return Err(FrameError::Malformed("declared length does not match"));
        }

        let checksum_at = packet.len() - TRAILER.len() - CHECKSUM_LEN;
        let received = u32::from_le_bytes([
            packet[checksum_at],
            packet[checksum_at + 1],
            packet[checksum_at + 2],
            packet[checksum_at + 3],
        ]);
        if received != frame_checksum(&packet[..checksum_at]) {
            return Err(FrameError::Malformed("checksum mismatch"));
        }

        Ok(Self {
            frame_type: [packet[4], packet[5], packet[6]],
            body: Bytes::copy_from_slice(&packet[TYPE_END..checksum_at]),
        })
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        MIN_FRAME_LEN + self.body.len()
    }

    /// Encode this frame into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self.frame_type, &self.body, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// CRC over everything preceding the checksum field, followed by the trailer.
///
/// The trailer is part of the checksummed domain even though it is transmitted after the
/// checksum. Senders compute it this way; changing it breaks wire compatibility.
pub(crate) fn frame_checksum(prefix: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(prefix);
    crc.update(&TRAILER);
    crc.finalize()
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────┬──────────┬────────┬──────────┬───────────┬─────────┐
/// │ Header │ Length   │ Type   │ Body     │ CRC-32    │ Trailer │
/// │ "/*"   │ (2B LE)  │ (3B)   │ (Length) │ (4B LE)   │ "*/"    │
/// └────────┴──────────┴────────┴──────────┴───────────┴─────────┘
/// ```
pub fn encode_frame(frame_type: [u8; 3], body: &[u8], dst: &mut BytesMut) -> Result<()> {
    if body.len() > MAX_BODY_LEN {
        return Err(FrameError::PayloadTooLarge {
            size: body.len(),
            max: MAX_BODY_LEN,
        });
    }

    let start = dst.len();
    dst.reserve(MIN_FRAME_LEN + body.len());
    dst.put_slice(&HEADER);
    dst.put_u16_le(body.len() as u16);
    dst.put_slice(&frame_type);
    dst.put_slice(body);
    let checksum = frame_checksum(&dst[start..]);
    dst.put_u32_le(checksum);
    dst.put_slice(&TRAILER);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() {
        let mut buf = BytesMut::new();
        encode_frame(*b"MSG", b"hi", &mut buf).unwrap();

        assert_eq!(buf.len(), MIN_FRAME_LEN + 2);
        assert_eq!(&buf[..2], b"/*");
        assert_eq!(&buf[2..4], &[2, 0]);
        assert_eq!(&buf[4..7], b"MSG");
        assert_eq!(&buf[7..9], b"hi");
        assert_eq!(&buf[buf.len() - 2..], b"*/");

        let mut crc = Crc32::new();
        crc.update(&buf[..9]);
        crc.update(b"*/");
        assert_eq!(&buf[9..13], &crc.finalize().to_le_bytes());
    }

    #[test]
    fn empty_body_is_minimum_frame() {
        let mut buf = BytesMut::new();
        encode_frame(*b"NOP", b"", &mut buf).unwrap();
        assert_eq!(buf.len(), MIN_FRAME_LEN);
    }

    #[test]
    fn encode_appends_after_existing_bytes() {
        let mut buf = BytesMut::from(&b"noise"[..]);
        encode_frame(*b"ABC", b"x", &mut buf).unwrap();

        let frame = Frame::from_packet(&buf[5..]).unwrap();
        assert_eq!(frame.body.as_ref(), b"x");
    }

    #[test]
    fn payload_too_large() {
        let body = vec![0u8; MAX_BODY_LEN + 1];
        let mut buf = BytesMut::new();
        let err = encode_frame(*b"BIG", &body, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn from_packet_copies_fields() {
        let original = Frame::new(*b"TMP", Bytes::from_static(b"21.5C"));
        let wire = original.to_bytes().unwrap();

        let parsed = Frame::from_packet(&wire).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.wire_size(), wire.len());
    }

    #[test]
    fn from_packet_rejects_bad_checksum() {
        let mut wire = BytesMut::new();
        encode_frame(*b"TMP", b"21.5C", &mut wire).unwrap();
        wire[8] ^= 0x01;

        let err = Frame::from_packet(&wire).unwrap_err();
        assert!(matches!(err, FrameError::Malformed("checksum mismatch")));
    }

    #[test]
    fn from_packet_rejects_truncated() {
        let err = Frame::from_packet(b"/*\x00\x00").unwrap_err();
        assert!(matches!(err, FrameError::Malformed(_)));
    }

    #[test]
    fn from_packet_rejects_length_mismatch() {
        let mut wire = BytesMut::new();
        encode_frame(*b"TMP", b"abc", &mut wire).unwrap();
        wire[2] = 9;

        let err = Frame::from_packet(&wire).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Malformed("declared length does not match")
        ));
    }
}
