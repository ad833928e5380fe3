//! Shared Surface Allocator
//!
//! Allocates one *generation*: the composition swapchain, the cross-API shared
//! texture with its OS handle, and the swapchain's back buffer 0. The three
//! objects are created together, are always the same size and format, and are
//! released together.

use crate::device::{GraphicsDevice, PresentationDevice, SharedTexture, SurfaceInfo, Swapchain};
use crate::error::SurfaceError;
use crate::types::{Extent, GenerationId, PixelFormat, SharedHandle, SharedTextureDesc, SwapchainDesc};

/// A size/format-matched set of per-size GPU objects
///
/// Field order is release order: shared texture, back buffer view, swapchain.
pub struct Generation<D: GraphicsDevice> {
    shared_texture: D::SharedTexture,
    back_buffer: D::BackBuffer,
    swapchain: D::Swapchain,
    handle: SharedHandle,
    extent: Extent,
    format: PixelFormat,
}

impl<D: GraphicsDevice> Generation<D> {
    /// Allocate a generation of `extent` on `device`.
    ///
    /// On failure every object created so far is released before the error
    /// is returned.
    pub fn allocate(
        device: &PresentationDevice<D>,
        id: GenerationId,
        extent: Extent,
    ) -> Result<Self, SurfaceError> {
        if extent.is_empty() {
            return Err(SurfaceError::ZeroExtent(extent));
        }

        let format = device.format();
        let raw = device.raw();

        let swapchain = raw.create_swapchain(&SwapchainDesc::for_composition(extent, format))?;
        let shared_texture = raw.create_shared_texture(&SharedTextureDesc::render_target(extent, format))?;
        let handle = SharedHandle::new(shared_texture.raw_shared_handle()?, id);
        let back_buffer = swapchain.back_buffer(0)?;

        if swapchain.extent() != extent
            || shared_texture.extent() != extent
            || back_buffer.extent() != extent
            || shared_texture.format() != swapchain.format()
            || back_buffer.format() != swapchain.format()
        {
            return Err(SurfaceError::Mismatch {
                swapchain: swapchain.extent(),
                swapchain_format: swapchain.format(),
                texture: shared_texture.extent(),
                texture_format: shared_texture.format(),
                back_buffer: back_buffer.extent(),
                back_buffer_format: back_buffer.format(),
            });
        }

        tracing::info!("✨ Shared texture created: {handle} at {extent}");

        Ok(Self {
            shared_texture,
            back_buffer,
            swapchain,
            handle,
            extent,
            format,
        })
    }

    pub fn id(&self) -> GenerationId {
        self.handle.generation()
    }

    pub fn handle(&self) -> SharedHandle {
        self.handle
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn swapchain(&self) -> &D::Swapchain {
        &self.swapchain
    }

    pub fn shared_texture(&self) -> &D::SharedTexture {
        &self.shared_texture
    }

    pub fn back_buffer(&self) -> &D::BackBuffer {
        &self.back_buffer
    }
}

impl<D: GraphicsDevice> Drop for Generation<D> {
    fn drop(&mut self) {
        tracing::debug!("🔄 Releasing {} ({})", self.handle.generation(), self.extent);
    }
}
