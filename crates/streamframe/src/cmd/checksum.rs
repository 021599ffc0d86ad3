use streamframe_frame::Crc32;

use crate::cmd::ChecksumArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_checksum, OutputFormat};

pub fn run(args: ChecksumArgs, format: OutputFormat) -> CliResult<i32> {
    let data = args.payload.resolve()?;
    print_checksum(Crc32::checksum(&data), data.len(), format);
    Ok(SUCCESS)
}
