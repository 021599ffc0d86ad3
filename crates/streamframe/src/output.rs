use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use streamframe_frame::context::hex_dump;
use streamframe_frame::Frame;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    sequence: u64,
    frame_type: String,
    frame_type_hex: String,
    body_size: usize,
    body: String,
    body_hex: String,
    wire_size: usize,
    source: &'a str,
    timestamp: String,
}

pub fn print_frame(frame: &Frame, sequence: u64, source: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                sequence,
                frame_type: type_label(&frame.frame_type),
                frame_type_hex: hex_dump(&frame.frame_type).trim_start().to_string(),
                body_size: frame.body.len(),
                body: body_preview(frame.body.as_ref()),
                body_hex: hex_dump(&frame.body).trim_start().to_string(),
                wire_size: frame.wire_size(),
                source,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "TYPE", "SIZE", "BODY"])
                .add_row(vec![
                    sequence.to_string(),
                    type_label(&frame.frame_type),
                    frame.body.len().to_string(),
                    body_preview(frame.body.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "#{} type={} size={} body={}",
                sequence,
                type_label(&frame.frame_type),
                frame.body.len(),
                body_preview(frame.body.as_ref())
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.body.as_ref());
        }
    }
}

#[derive(Serialize)]
struct ChecksumOutput {
    algorithm: &'static str,
    length: usize,
    crc32: String,
}

pub fn print_checksum(crc: u32, length: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ChecksumOutput {
                algorithm: "CRC-32/ISO-HDLC",
                length,
                crc32: format!("{crc:08X}"),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("0x{crc:08X} ({length} bytes)"),
        OutputFormat::Raw => print_raw(&crc.to_le_bytes()),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Printable ASCII type tags are shown as text, anything else as hex.
fn type_label(frame_type: &[u8; 3]) -> String {
    if frame_type.iter().all(|b| b.is_ascii_graphic()) {
        String::from_utf8_lossy(frame_type).into_owned()
    } else {
        hex_dump(frame_type).trim_start().to_string()
    }
}

/// UTF-8 bodies are shown as text, anything else as hex bytes.
fn body_preview(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => hex_dump(body).trim_start().to_string(),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_label_prefers_ascii() {
        assert_eq!(type_label(b"MSG"), "MSG");
        assert_eq!(type_label(&[0x01, 0x02, 0xFF]), "01 02 FF");
    }

    #[test]
    fn body_preview_handles_binary() {
        assert_eq!(body_preview(b"21.5C"), "21.5C");
        assert_eq!(body_preview(&[0xFF, 0xFE, 0x00]), "FF FE 00");
        assert_eq!(body_preview(b""), "");
    }
}
