//! A D3D11 shared texture imported as a Vulkan image

use crate::context::VulkanContext;
use crate::vk_error;
use ash::vk;
use interop_core::{BackendError, Extent, SharedHandle};

const HANDLE_TYPE: vk::ExternalMemoryHandleTypeFlags = vk::ExternalMemoryHandleTypeFlags::D3D11_TEXTURE_KMT;

/// Image and dedicated memory bound to one shared handle. Must be destroyed
/// with [`ImportedImage::destroy`] on the device that imported it.
pub struct ImportedImage {
    image: vk::Image,
    memory: vk::DeviceMemory,
    extent: Extent,
}

impl ImportedImage {
    pub fn import(context: &VulkanContext, handle: SharedHandle, extent: Extent) -> Result<Self, BackendError> {
        let device = context.device();

        unsafe {
            let mut external_info = vk::ExternalMemoryImageCreateInfo::default().handle_types(HANDLE_TYPE);
            let image_info = vk::ImageCreateInfo::default()
                .push_next(&mut external_info)
                .image_type(vk::ImageType::TYPE_2D)
                .format(vk::Format::B8G8R8A8_UNORM)
                .extent(vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = device
                .create_image(&image_info, None)
                .map_err(vk_error("vkCreateImage"))?;

            let requirements = device.get_image_memory_requirements(image);
            let Some(memory_type_index) =
                context.memory_type_index(requirements.memory_type_bits, vk::MemoryPropertyFlags::DEVICE_LOCAL)
            else {
                device.destroy_image(image, None);
                return Err(BackendError::new("vkAllocateMemory", "no device-local memory type for the shared image"));
            };

            let mut import_info = vk::ImportMemoryWin32HandleInfoKHR::default()
                .handle_type(HANDLE_TYPE)
                .handle(handle.raw() as vk::HANDLE);
            let mut dedicated_info = vk::MemoryDedicatedAllocateInfo::default().image(image);
            let allocate_info = vk::MemoryAllocateInfo::default()
                .push_next(&mut import_info)
                .push_next(&mut dedicated_info)
                .allocation_size(requirements.size)
                .memory_type_index(memory_type_index);

            let memory = match device.allocate_memory(&allocate_info, None) {
                Ok(memory) => memory,
                Err(err) => {
                    device.destroy_image(image, None);
                    return Err(vk_error("vkAllocateMemory")(err));
                }
            };

            if let Err(err) = device.bind_image_memory(image, memory, 0) {
                device.destroy_image(image, None);
                device.free_memory(memory, None);
                return Err(vk_error("vkBindImageMemory")(err));
            }

            tracing::info!("✨ Imported shared handle {handle} as a {extent} Vulkan image");
            Ok(Self { image, memory, extent })
        }
    }

    pub fn image(&self) -> vk::Image {
        self.image
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn destroy(self, device: &ash::Device) {
        unsafe {
            device.destroy_image(self.image, None);
            device.free_memory(self.memory, None);
        }
        tracing::debug!("🔄 Released imported {} image", self.extent);
    }
}
