use std::ffi::c_void;
use std::os::raw::c_char;

use streamframe_frame::{ErrorKind, FrameParser};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SfResult {
    Ok = 0,
    InvalidArgument = 2,
    HeaderNotFoundYet = 4,
    InvalidPacket = 5,
    Internal = 99,
}

impl From<ErrorKind> for SfResult {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidArg => SfResult::InvalidArgument,
            ErrorKind::HeaderNotFoundYet => SfResult::HeaderNotFoundYet,
            ErrorKind::InvalidPacket => SfResult::InvalidPacket,
            ErrorKind::InternalError => SfResult::Internal,
        }
    }
}

#[allow(dead_code)]
pub const SF_OK: SfResult = SfResult::Ok;
#[allow(dead_code)]
pub const SF_ERR_INVALID_ARGUMENT: SfResult = SfResult::InvalidArgument;
#[allow(dead_code)]
pub const SF_ERR_HEADER_NOT_FOUND_YET: SfResult = SfResult::HeaderNotFoundYet;
#[allow(dead_code)]
pub const SF_ERR_INVALID_PACKET: SfResult = SfResult::InvalidPacket;
#[allow(dead_code)]
pub const SF_ERR_INTERNAL: SfResult = SfResult::Internal;

/// Called with a completed frame; `packet` is only valid for the duration of the call.
pub type SfPacketCallback =
    Option<unsafe extern "C" fn(packet: *const u8, len: usize, user_data: *mut c_void)>;

/// Called with a diagnostic; `message` is NUL-terminated and only valid during the call.
pub type SfErrorCallback =
    Option<unsafe extern "C" fn(code: SfResult, message: *const c_char, user_data: *mut c_void)>;

pub type SfParserHandle = *mut c_void;

pub(crate) struct ParserHandle {
    pub(crate) parser: FrameParser,
}
