//! Human-readable diagnostic context handed to error sinks.

use std::fmt::Write;

use crate::error::Violation;
use crate::parser::ParserState;

/// Snapshot of the parser at the moment a frame was abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub state: ParserState,
    pub cursor: usize,
    pub declared_length: usize,
    /// Bytes accumulated so far.
    pub buffer: &'a [u8],
    /// Upper bound on how many buffer bytes are dumped.
    pub limit: usize,
}

/// Render `violation` and `snapshot` as a single diagnostic line.
///
/// ```text
/// checksum mismatch, expected ..., received ...; state: ReadChecksum, cursor: 11, declared length: 13, buffer: 2F 2A ...
/// ```
pub fn describe(violation: &Violation, snapshot: &Snapshot<'_>) -> String {
    let shown = snapshot.buffer.len().min(snapshot.limit);
    let mut out = String::with_capacity(96 + shown * 3);
    let _ = write!(
        out,
        "{violation}; state: {}, cursor: {}, declared length: {}, buffer:",
        snapshot.state, snapshot.cursor, snapshot.declared_length
    );
    out.push_str(&hex_dump(&snapshot.buffer[..shown]));
    out
}

/// Upper-case hex, each byte preceded by a space.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for byte in bytes {
        let _ = write!(out, " {byte:02X}");
    }
    out
}
