//! streamframe-ffi: C-ABI exports for the streamframe parser.

mod error;
mod parser;
mod types;

use std::panic::AssertUnwindSafe;

pub use parser::{
    sf_parser_close, sf_parser_open, sf_parser_push_byte, sf_parser_set_error_callback,
    sf_parser_set_packet_callback,
};
pub use types::{
    SfErrorCallback, SfPacketCallback, SfParserHandle, SfResult, SF_ERR_HEADER_NOT_FOUND_YET,
    SF_ERR_INTERNAL, SF_ERR_INVALID_ARGUMENT, SF_ERR_INVALID_PACKET, SF_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Message describing the most recent failure on this thread (empty if none).
#[no_mangle]
pub extern "C" fn sf_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

/// Compute the CRC-32/ISO-HDLC of `len` bytes at `data`.
///
/// # Safety
/// `data` must point to `len` readable bytes, or be null with `len == 0`.
#[no_mangle]
pub unsafe extern "C" fn sf_crc32(data: *const u8, len: usize) -> u32 {
    ffi_boundary(0, || {
        if data.is_null() || len == 0 {
            return streamframe_frame::Crc32::new().finalize();
        }
        // SAFETY: Pointer validity is guaranteed by the caller.
        let bytes = unsafe { std::slice::from_raw_parts(data, len) };
        streamframe_frame::Crc32::checksum(bytes)
    })
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn last_error_returns_non_null_pointer() {
        error::clear_error_state();
        let ptr = sf_last_error();
        assert!(!ptr.is_null());

        // SAFETY: sf_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(ptr).to_str().unwrap() };
        assert!(text.is_empty());
    }

    #[test]
    fn crc32_reference_vector() {
        let data = b"Hello, World!";
        assert_eq!(unsafe { sf_crc32(data.as_ptr(), data.len()) }, 0xEC4A_C3D0);
        assert_eq!(unsafe { sf_crc32(std::ptr::null(), 0) }, 0);
    }
}
