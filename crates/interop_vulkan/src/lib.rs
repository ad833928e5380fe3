//! # Vulkan render backend
//!
//! Imports the compositor's shared texture through
//! `VK_KHR_external_memory_win32` (D3D11 KMT handle) and clears it to a
//! time-animated colour on every `draw_frame`.
//!
//! Each frame is submitted with a fence and waited on before `draw_frame`
//! returns, so the write is finished on the CPU timeline before the
//! compositor copies the texture. There is no GPU-side synchronization with
//! the other API.

mod backend;
mod context;
mod image;

pub use backend::{clear_color, VulkanBackend, VulkanOptions};
pub use context::DeviceLuid;

use ash::vk;
use interop_core::BackendError;

/// `map_err` adapter naming the failing Vulkan call
pub(crate) fn vk_error(operation: &'static str) -> impl Fn(vk::Result) -> BackendError {
    move |result| {
        tracing::warn!("⚠️ {operation} failed: {result:?} ({})", result.as_raw());
        BackendError::new(operation, format!("{result:?}"))
    }
}
