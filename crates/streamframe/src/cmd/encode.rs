use bytes::BytesMut;
use streamframe_frame::context::hex_dump;
use streamframe_frame::encode_frame;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::print_raw;

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let frame_type = parse_type(&args.frame_type)?;
    let body = args.payload.resolve()?;

    let mut wire = BytesMut::new();
    encode_frame(frame_type, &body, &mut wire).map_err(|err| frame_error("encode failed", err))?;
    tracing::debug!(len = wire.len(), "encoded frame");

    if args.hex {
        println!("{}", hex_dump(&wire).trim_start());
    } else {
        print_raw(&wire);
    }
    Ok(SUCCESS)
}

fn parse_type(tag: &str) -> CliResult<[u8; 3]> {
    tag.as_bytes().try_into().map_err(|_| {
        CliError::new(
            USAGE,
            format!("--type must be exactly 3 bytes, got {} ({tag:?})", tag.len()),
        )
    })
}
