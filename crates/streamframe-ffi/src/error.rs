use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use streamframe_frame::FrameError;

use crate::types::SfResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let message = to_c_string(message.into());
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = message;
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> SfResult {
    set_error_message(message);
    SfResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_frame_error(err: &FrameError) -> SfResult {
    set_error_message(err.to_string());
    match err {
        FrameError::CapacityTooSmall { .. } => SfResult::InvalidArgument,
        _ => SfResult::Internal,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

/// Interior NULs would truncate the string on the C side; replace them.
pub(crate) fn to_c_string(message: String) -> CString {
    CString::new(message.replace('\0', "?")).unwrap_or_default()
}
