use clap::{Args, Subcommand};
use std::fs;
use std::path::PathBuf;

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod checksum;
pub mod encode;
pub mod listen;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read a device or file and print every recovered frame.
    Listen(ListenArgs),
    /// Encode one frame and write it to stdout.
    Encode(EncodeArgs),
    /// Print the CRC-32/ISO-HDLC of some bytes.
    Checksum(ChecksumArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Encode(args) => encode::run(args),
        Command::Checksum(args) => checksum::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Device or file to read (`-` for stdin). The device must already be configured.
    pub path: PathBuf,
    /// Largest accepted frame in bytes, header through trailer.
    #[arg(
        long,
        default_value_t = streamframe_frame::DEFAULT_BUFFER_CAPACITY,
        env = "STREAMFRAME_CAPACITY"
    )]
    pub capacity: usize,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// Literal string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Three-character frame type tag.
    #[arg(long = "type", short = 't', value_name = "TAG")]
    pub frame_type: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Write the frame as space-separated hex instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
