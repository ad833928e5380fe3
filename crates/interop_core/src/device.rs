//! Presentation Device Manager
//!
//! The compositing API is reached only through the traits in this module, so
//! the lifecycle can be driven against Direct3D 11 on Windows and against a
//! mock in tests.
//!
//! ## Ownership
//!
//! ```text
//! CompositionApi ──create_device()──► PresentationDevice<D>
//!                                         │ (device, context, adapter, factory)
//!                                         ├── create_swapchain()      ─► D::Swapchain
//!                                         ├── create_shared_texture() ─► D::SharedTexture
//!                                         └── copy_resource(back buffer ◄─ shared texture)
//! ```
//!
//! Every native object is an owned value released by `Drop`. Components only
//! borrow them for the duration of a call.

use crate::error::{InteropError, NativeError};
use crate::types::{Extent, PixelFormat, SharedTextureDesc, SwapchainDesc};

/// Size and format reporting shared by every per-generation object
pub trait SurfaceInfo {
    fn extent(&self) -> Extent;
    fn format(&self) -> PixelFormat;
}

/// Entry point into a compositing API
pub trait CompositionApi {
    type Device: GraphicsDevice;

    /// Create a hardware device with BGRA support plus its adapter chain.
    ///
    /// Implementations must not fall back to a software device.
    fn create_device(&self) -> Result<Self::Device, NativeError>;
}

/// A compositing-API device together with its immediate context and the
/// adapter/factory chain used to create swapchains
pub trait GraphicsDevice {
    type Swapchain: Swapchain<BackBuffer = Self::BackBuffer>;
    type SharedTexture: SharedTexture;
    type BackBuffer: SurfaceInfo;

    /// Human readable adapter name, for logs
    fn adapter_name(&self) -> String;

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<Self::Swapchain, NativeError>;

    fn create_shared_texture(&self, desc: &SharedTextureDesc) -> Result<Self::SharedTexture, NativeError>;

    /// Full-resource copy on the immediate context. Sizes must match.
    fn copy_resource(&self, dst: &Self::BackBuffer, src: &Self::SharedTexture);
}

pub trait Swapchain: SurfaceInfo {
    type BackBuffer: SurfaceInfo;

    fn back_buffer(&self, index: u32) -> Result<Self::BackBuffer, NativeError>;

    fn present(&self, sync_interval: u32) -> Result<(), NativeError>;
}

pub trait SharedTexture: SurfaceInfo {
    /// Raw OS handle another API can import
    fn raw_shared_handle(&self) -> Result<usize, NativeError>;
}

/// The host's native swapchain sink ("swapchain panel")
///
/// `attach` is called again after every generation is created. `detach` lets
/// the sink drop its reference before the swapchain is released; anything
/// the sink built on the device may stay until `reset`.
pub trait PresentationSink<D: GraphicsDevice> {
    fn attach(&mut self, swapchain: &D::Swapchain) -> Result<(), NativeError>;

    fn detach(&mut self) -> Result<(), NativeError>;

    /// Drop everything tied to the current device. Called after device loss
    /// and on shutdown, never on resize.
    fn reset(&mut self) {}
}

/// Owns the compositing device for the lifetime of the application
///
/// Survives resizes; only dropped on shutdown or after device loss, and always
/// after every generation created from it.
pub struct PresentationDevice<D: GraphicsDevice> {
    device: D,
    format: PixelFormat,
}

impl<D: GraphicsDevice> PresentationDevice<D> {
    /// Create the device. A failure here is fatal for startup.
    pub fn initialize<A>(api: &A) -> Result<Self, InteropError>
    where
        A: CompositionApi<Device = D>,
    {
        let device = api.create_device().map_err(|err| {
            tracing::error!("❌ Failed to create presentation device: {err}");
            InteropError::DeviceUnavailable(err)
        })?;

        tracing::info!("✨ Presentation device created on {}", device.adapter_name());

        Ok(Self {
            device,
            format: PixelFormat::Bgra8Unorm,
        })
    }

    /// The format every generation is allocated with
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn raw(&self) -> &D {
        &self.device
    }
}

impl<D: GraphicsDevice> Drop for PresentationDevice<D> {
    fn drop(&mut self) {
        tracing::debug!("🔄 Releasing presentation device");
    }
}
