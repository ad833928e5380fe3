//! Frame Presenter
//!
//! Copies the shared texture into the back buffer and presents. Driven once
//! per display tick by the host; it never runs its own timer.

use crate::device::{GraphicsDevice, PresentationDevice, Swapchain};
use crate::error::NativeError;
use crate::surface::Generation;

pub struct FramePresenter {
    sync_interval: u32,
    frames_presented: u64,
}

impl FramePresenter {
    /// `sync_interval` 0 presents immediately without waiting for vblank.
    pub fn new(sync_interval: u32) -> Self {
        Self {
            sync_interval,
            frames_presented: 0,
        }
    }

    pub fn present_frame<D: GraphicsDevice>(
        &mut self,
        device: &PresentationDevice<D>,
        generation: &Generation<D>,
    ) -> Result<(), NativeError> {
        device
            .raw()
            .copy_resource(generation.back_buffer(), generation.shared_texture());

        generation.swapchain().present(self.sync_interval)?;
        self.frames_presented += 1;

        Ok(())
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn sync_interval(&self) -> u32 {
        self.sync_interval
    }
}

impl Default for FramePresenter {
    fn default() -> Self {
        Self::new(0)
    }
}
