use crate::context::{DeviceLuid, VulkanContext};
use crate::image::ImportedImage;
use ash::vk;
use interop_core::{BackendError, Extent, RenderBackend, SharedHandle};
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, Default)]
pub struct VulkanOptions {
    /// Enable `VK_LAYER_KHRONOS_validation` and route its messages to tracing
    pub enable_validation: bool,
    /// LUID of the adapter that owns the shared texture; the Vulkan device on
    /// the same GPU is preferred
    pub adapter_luid: Option<DeviceLuid>,
}

/// Clear colour for `elapsed_seconds`, as linear RGBA in `[0, 1]`
///
/// Each channel is a sine at a different phase so the whole frame slowly
/// cycles through hues. Alpha is always opaque.
pub fn clear_color(elapsed_seconds: f32) -> [f32; 4] {
    let t = elapsed_seconds * 0.5;
    let channel = |phase: f32| 0.5 + 0.5 * (t + phase * TAU).sin();
    [channel(0.0), channel(1.0 / 3.0), channel(2.0 / 3.0), 1.0]
}

/// Render backend that clears the shared texture to an animated colour
pub struct VulkanBackend {
    options: VulkanOptions,
    context: Option<VulkanContext>,
    target: Option<ImportedImage>,
}

impl VulkanBackend {
    pub fn new(options: VulkanOptions) -> Self {
        Self {
            options,
            context: None,
            target: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    pub fn target_extent(&self) -> Option<Extent> {
        self.target.as_ref().map(ImportedImage::extent)
    }

    fn release_target(&mut self) {
        if let (Some(context), Some(target)) = (self.context.as_ref(), self.target.take()) {
            context.wait_idle();
            target.destroy(context.device());
        }
    }
}

impl RenderBackend for VulkanBackend {
    fn init(&mut self, handle: SharedHandle, extent: Extent) -> Result<(), BackendError> {
        if self.context.is_some() {
            return Err(BackendError::new("init", "backend already initialized"));
        }

        let context = VulkanContext::new(self.options.enable_validation, self.options.adapter_luid)?;
        let target = ImportedImage::import(&context, handle, extent)?;
        self.context = Some(context);
        self.target = Some(target);
        Ok(())
    }

    fn resize(&mut self, handle: SharedHandle, extent: Extent) -> Result<(), BackendError> {
        // The old handle is already gone on the D3D side; drop our import first.
        self.release_target();

        let context = self
            .context
            .as_ref()
            .ok_or_else(|| BackendError::new("resize", "backend not initialized"))?;
        self.target = Some(ImportedImage::import(context, handle, extent)?);
        Ok(())
    }

    fn draw_frame(&mut self, elapsed_seconds: f32) -> Result<(), BackendError> {
        let (Some(context), Some(target)) = (self.context.as_ref(), self.target.as_ref()) else {
            return Err(BackendError::new("draw_frame", "no imported image"));
        };

        let image = target.image();
        let color = vk::ClearColorValue {
            float32: clear_color(elapsed_seconds),
        };
        let range = vk::ImageSubresourceRange::default()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .level_count(1)
            .layer_count(1);

        context.submit_and_wait(|device, cmd| unsafe {
            let to_transfer = vk::ImageMemoryBarrier::default()
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(range);
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );

            device.cmd_clear_color_image(cmd, image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &color, &[range]);

            // GENERAL is the layout the D3D side expects to find the texture in.
            let to_general = vk::ImageMemoryBarrier::default()
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::MEMORY_READ)
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::GENERAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(range);
            device.cmd_pipeline_barrier(
                cmd,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::BOTTOM_OF_PIPE,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_general],
            );
        })
    }

    fn clear(&mut self) -> Result<(), BackendError> {
        self.release_target();
        // Dropping the context waits idle and destroys the device and instance.
        self.context = None;
        Ok(())
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        self.release_target();
    }
}
