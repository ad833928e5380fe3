//! HRESULT to [`NativeError`] conversion

use interop_core::{NativeError, NativeErrorKind};
use windows::core::HRESULT;
use windows::Win32::Foundation::{E_INVALIDARG, E_OUTOFMEMORY};
use windows::Win32::Graphics::Dxgi::{
    DXGI_ERROR_DEVICE_HUNG, DXGI_ERROR_DEVICE_REMOVED, DXGI_ERROR_DEVICE_RESET,
    DXGI_ERROR_DRIVER_INTERNAL_ERROR, DXGI_ERROR_INVALID_CALL, DXGI_ERROR_UNSUPPORTED,
};

/// Classify a native result code
pub fn classify(code: HRESULT) -> NativeErrorKind {
    match code {
        DXGI_ERROR_DEVICE_REMOVED
        | DXGI_ERROR_DEVICE_RESET
        | DXGI_ERROR_DEVICE_HUNG
        | DXGI_ERROR_DRIVER_INTERNAL_ERROR => NativeErrorKind::DeviceLost,
        E_OUTOFMEMORY => NativeErrorKind::OutOfMemory,
        E_INVALIDARG | DXGI_ERROR_INVALID_CALL => NativeErrorKind::InvalidArgument,
        DXGI_ERROR_UNSUPPORTED => NativeErrorKind::Unsupported,
        _ => NativeErrorKind::Other,
    }
}

pub(crate) fn native_error(operation: &'static str, code: HRESULT) -> NativeError {
    NativeError::new(operation, code.0 as u32, classify(code))
}

/// Attach the failing operation's name to a `windows` result
pub(crate) trait NativeResultExt<T> {
    fn native(self, operation: &'static str) -> Result<T, NativeError>;
}

impl<T> NativeResultExt<T> for windows::core::Result<T> {
    fn native(self, operation: &'static str) -> Result<T, NativeError> {
        self.map_err(|err| native_error(operation, err.code()))
    }
}
