//! Recover CRC-32 checked frames from serial byte streams.
//!
//! streamframe reconstructs `/* len type body crc */` frames from a raw byte source one byte
//! at a time, resynchronizing after noise and discarding damaged frames.
//!
//! # Crate Structure
//!
//! - [`frame`]: Checksum engine, frame parser, encoder, and blocking reader
//!
//! The `streamframe` binary (behind the `cli` feature) listens on a device or file and
//! prints recovered frames.

/// Re-export frame types.
pub mod frame {
    pub use streamframe_frame::*;
}
