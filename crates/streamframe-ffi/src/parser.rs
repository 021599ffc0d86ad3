use std::ffi::c_void;
use std::os::raw::c_char;

use streamframe_frame::{ErrorKind, ErrorSink, FrameParser, Outcome, PacketSink, ParserConfig};

use crate::error;
use crate::types::{ParserHandle, SfErrorCallback, SfPacketCallback, SfParserHandle, SfResult};

struct PacketCallback {
    callback: unsafe extern "C" fn(*const u8, usize, *mut c_void),
    user_data: *mut c_void,
}

// SAFETY: a parser handle is driven by one thread at a time per the C contract, so
// `user_data` is never touched concurrently from Rust.
unsafe impl Send for PacketCallback {}

impl PacketSink for PacketCallback {
    fn on_packet(&mut self, packet: &[u8]) {
        // SAFETY: The callback was registered by the caller together with `user_data`.
        unsafe { (self.callback)(packet.as_ptr(), packet.len(), self.user_data) }
    }
}

struct ErrorCallback {
    callback: unsafe extern "C" fn(SfResult, *const c_char, *mut c_void),
    user_data: *mut c_void,
}

// SAFETY: see `PacketCallback`.
unsafe impl Send for ErrorCallback {}

impl ErrorSink for ErrorCallback {
    fn on_error(&mut self, kind: ErrorKind, message: &str) {
        let message = error::to_c_string(message.to_string());
        // SAFETY: The callback was registered by the caller together with `user_data`.
        unsafe { (self.callback)(kind.into(), message.as_ptr(), self.user_data) }
    }
}

fn with_parser_mut<T>(
    handle: SfParserHandle,
    on_error: T,
    f: impl FnOnce(&mut ParserHandle) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("parser handle cannot be null");
        return on_error;
    }

    let parser_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut ParserHandle) }
    };

    f(parser_handle)
}

/// Open a parser whose buffer holds frames of up to `capacity` bytes.
///
/// A `capacity` of 0 selects the default (1024). Returns null if `capacity` is below the
/// 13-byte minimum frame; see `sf_last_error`.
#[no_mangle]
pub extern "C" fn sf_parser_open(capacity: usize) -> SfParserHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let config = if capacity == 0 {
            ParserConfig::default()
        } else {
            ParserConfig {
                buffer_capacity: capacity,
            }
        };

        match FrameParser::with_config(config) {
            Ok(parser) => Box::into_raw(Box::new(ParserHandle { parser })) as SfParserHandle,
            Err(err) => {
                let _ = error::map_frame_error(&err);
                std::ptr::null_mut()
            }
        }
    })
}

/// Release a parser and everything it owns.
///
/// # Safety
/// `parser` must be null or a handle returned by `sf_parser_open` that has not been closed.
#[no_mangle]
pub unsafe extern "C" fn sf_parser_close(parser: SfParserHandle) {
    crate::ffi_boundary((), || {
        if parser.is_null() {
            return;
        }
        // SAFETY: Handle was allocated by `sf_parser_open`.
        unsafe {
            drop(Box::from_raw(parser as *mut ParserHandle));
        }
    });
}

/// Push one byte.
///
/// On a completed frame `*out_len` receives its length (the packet callback has already run);
/// otherwise it receives 0. `out_len` may be null. Diagnostics are returned as the result
/// code and also delivered to the error callback.
///
/// # Safety
/// `parser` must be a valid handle; `out_len` must be null or point to writable memory.
#[no_mangle]
pub unsafe extern "C" fn sf_parser_push_byte(
    parser: SfParserHandle,
    byte: u8,
    out_len: *mut usize,
) -> SfResult {
    crate::ffi_boundary(SfResult::Internal, || {
        with_parser_mut(parser, SfResult::InvalidArgument, |handle| {
            let (result, len) = match handle.parser.push_byte(byte) {
                Outcome::Pending => (SfResult::Ok, 0),
                Outcome::Frame(packet) => (SfResult::Ok, packet.len()),
                Outcome::Rejected(kind) => (SfResult::from(kind), 0),
            };
            if !out_len.is_null() {
                // SAFETY: Pointer validity is guaranteed by the caller.
                unsafe { *out_len = len };
            }
            result
        })
    })
}

/// Register (or with a null `callback`, clear) the packet callback.
///
/// # Safety
/// `parser` must be a valid handle. `user_data` is passed back verbatim and must stay valid
/// for as long as the callback is registered.
#[no_mangle]
pub unsafe extern "C" fn sf_parser_set_packet_callback(
    parser: SfParserHandle,
    callback: SfPacketCallback,
    user_data: *mut c_void,
) -> SfResult {
    crate::ffi_boundary(SfResult::Internal, || {
        with_parser_mut(parser, SfResult::InvalidArgument, |handle| {
            match callback {
                Some(callback) => handle.parser.set_packet_sink(PacketCallback {
                    callback,
                    user_data,
                }),
                None => handle.parser.clear_packet_sink(),
            }
            SfResult::Ok
        })
    })
}

/// Register (or with a null `callback`, clear) the error callback.
///
/// # Safety
/// Same as `sf_parser_set_packet_callback`.
#[no_mangle]
pub unsafe extern "C" fn sf_parser_set_error_callback(
    parser: SfParserHandle,
    callback: SfErrorCallback,
    user_data: *mut c_void,
) -> SfResult {
    crate::ffi_boundary(SfResult::Internal, || {
        with_parser_mut(parser, SfResult::InvalidArgument, |handle| {
            match callback {
                Some(callback) => handle.parser.set_error_sink(ErrorCallback {
                    callback,
                    user_data,
                }),
                None => handle.parser.clear_error_sink(),
            }
            SfResult::Ok
        })
    })
}
