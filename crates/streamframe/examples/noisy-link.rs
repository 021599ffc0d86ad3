//! Simulated noisy serial link: frames interleaved with garbage and bit errors.
//!
//! Run with:
//!   cargo run --example noisy-link

use bytes::BytesMut;
use streamframe::frame::{encode_frame, ErrorKind, Frame, FrameParser, Outcome};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut link = BytesMut::new();
    link.extend_from_slice(b"\x00\xFF boot noise \x07");
    encode_frame(*b"TMP", b"21.5C", &mut link)?;
    encode_frame(*b"HUM", b"40%", &mut link)?;
    let damaged_at = link.len() + 8;
    encode_frame(*b"TMP", b"21.7C", &mut link)?;
    link[damaged_at] ^= 0x04;
    encode_frame(*b"BAT", b"3.71V", &mut link)?;

    let mut parser = FrameParser::new();
    parser.set_error_sink(|kind: ErrorKind, message: &str| {
        eprintln!("[{kind}] {message}");
    });

    for &byte in link.iter() {
        if let Outcome::Frame(packet) = parser.push_byte(byte) {
            let frame = Frame::from_packet(packet)?;
            println!(
                "{} -> {}",
                String::from_utf8_lossy(&frame.frame_type),
                String::from_utf8_lossy(&frame.body)
            );
        }
    }

    Ok(())
}
