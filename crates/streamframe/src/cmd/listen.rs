use std::fs::File;
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use streamframe_frame::{ErrorKind, FrameError, FrameParser, FrameReader, ParserConfig};

use crate::cmd::ListenArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let source = args.path.display().to_string();
    let input = open_source(&args)?;

    let mut parser = FrameParser::with_config(ParserConfig {
        buffer_capacity: args.capacity,
    })
    .map_err(|err| frame_error("invalid --capacity", err))?;
    parser.set_error_sink(log_diagnostic);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    tracing::info!(source = %source, capacity = parser.capacity(), "listening");
    let mut reader = FrameReader::from_parser(input, parser);
    let mut received = 0u64;

    while running.load(Ordering::SeqCst) {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        };

        received = received.saturating_add(1);
        print_frame(&frame, received, &source, format);

        if let Some(count) = args.count {
            if received >= count {
                break;
            }
        }
    }

    tracing::info!(received, rejected = reader.rejected(), "stream finished");
    Ok(SUCCESS)
}

fn open_source(args: &ListenArgs) -> CliResult<Box<dyn Read>> {
    if args.path.as_os_str() == "-" {
        return Ok(Box::new(std::io::stdin().lock()));
    }
    let file = File::open(&args.path)
        .map_err(|err| io_error(&format!("failed opening {}", args.path.display()), err))?;
    Ok(Box::new(file))
}

fn log_diagnostic(kind: ErrorKind, message: &str) {
    match kind {
        ErrorKind::HeaderNotFoundYet => tracing::debug!(%kind, "{message}"),
        _ => tracing::warn!(%kind, "{message}"),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        // A read blocked on a quiet device never observes the flag; a second Ctrl-C exits.
        if !running.swap(false, Ordering::SeqCst) {
            std::process::exit(130);
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
