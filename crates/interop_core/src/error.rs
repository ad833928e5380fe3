//! Error taxonomy for the surface pipeline
//!
//! - Fatal initialization errors (no hardware device, adapter/factory lookup)
//! - Resource creation errors while allocating a generation
//! - Presentation errors, of which device loss is recoverable
//! - Render backend errors, kept coarse on purpose
//!
//! Only the first category is allowed to end the process.

use crate::types::{Extent, PixelFormat};
use std::fmt;
use thiserror::Error;

/// Coarse classification of a native result code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeErrorKind {
    /// The GPU device was removed, reset or hung
    DeviceLost,
    OutOfMemory,
    InvalidArgument,
    /// No hardware device could be created
    Unsupported,
    Other,
}

/// A failed native graphics call: which operation, and the code it returned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed with 0x{code:08X} ({kind:?})")]
pub struct NativeError {
    pub operation: &'static str,
    pub code: u32,
    pub kind: NativeErrorKind,
}

impl NativeError {
    pub fn new(operation: &'static str, code: u32, kind: NativeErrorKind) -> Self {
        Self {
            operation,
            code,
            kind,
        }
    }

    pub fn is_device_lost(&self) -> bool {
        self.kind == NativeErrorKind::DeviceLost
    }
}

/// Errors while allocating a swapchain/shared-texture generation
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("cannot allocate a {0} surface, both dimensions must be non-zero")]
    ZeroExtent(Extent),

    #[error(
        "generation resources disagree: swapchain {swapchain} {swapchain_format}, \
         texture {texture} {texture_format}, back buffer {back_buffer} {back_buffer_format}"
    )]
    Mismatch {
        swapchain: Extent,
        swapchain_format: PixelFormat,
        texture: Extent,
        texture_format: PixelFormat,
        back_buffer: Extent,
        back_buffer_format: PixelFormat,
    },

    #[error(transparent)]
    Native(#[from] NativeError),
}

/// Coarse failure reported by the external render backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("render backend {operation} failed: {message}")]
pub struct BackendError {
    pub operation: &'static str,
    pub message: String,
}

impl BackendError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Host notifications, used to report events that arrive in the wrong phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    SurfaceLoaded,
    SurfaceResized,
    SurfaceClosed,
    Tick,
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SurfaceLoaded => "surface loaded",
            Self::SurfaceResized => "surface resized",
            Self::SurfaceClosed => "surface closed",
            Self::Tick => "tick",
        };
        f.write_str(name)
    }
}

/// Top-level error of the lifecycle controller
#[derive(Debug, Error)]
pub enum InteropError {
    #[error("no usable hardware presentation device: {0}")]
    DeviceUnavailable(#[source] NativeError),

    #[error("failed to allocate shared surface resources: {0}")]
    Surface(#[from] SurfaceError),

    #[error("failed to bind swapchain to the display surface: {0}")]
    Bind(#[source] NativeError),

    #[error("failed to present frame: {0}")]
    Present(#[source] NativeError),

    #[error("presentation device lost: {0}")]
    DeviceLost(#[source] NativeError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("render backend contract violated: {0}")]
    Contract(&'static str),

    #[error("{event} is not valid while the surface is {phase}")]
    InvalidTransition {
        event: HostEvent,
        phase: &'static str,
    },
}

impl InteropError {
    /// Whether startup must be aborted
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DeviceUnavailable(_))
    }
}
