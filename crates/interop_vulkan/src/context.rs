//! Vulkan instance, device, queue and the single command buffer used per frame

use crate::vk_error;
use ash::vk;
use interop_core::BackendError;
use std::ffi::{c_void, CStr};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Adapter LUID as reported by DXGI and by `VkPhysicalDeviceIDProperties`
pub type DeviceLuid = [u8; vk::LUID_SIZE];

struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

/// Instance plus its optional debug messenger; destroyed together on drop
struct InstanceOwner {
    instance: ash::Instance,
    debug: Option<DebugMessenger>,
    entry: ash::Entry,
}

impl Drop for InstanceOwner {
    fn drop(&mut self) {
        unsafe {
            if let Some(debug) = self.debug.take() {
                debug.loader.destroy_debug_utils_messenger(debug.messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

struct DeviceOwner(ash::Device);

impl Drop for DeviceOwner {
    fn drop(&mut self) {
        unsafe { self.0.destroy_device(None) }
    }
}

/// What device selection needs to know about one physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeviceCandidate {
    graphics_queue: Option<u32>,
    external_memory_win32: bool,
    luid: Option<DeviceLuid>,
}

impl DeviceCandidate {
    fn is_usable(&self) -> bool {
        self.graphics_queue.is_some() && self.external_memory_win32
    }
}

/// Index of the device to use: the usable one on `adapter_luid` if there is
/// one, otherwise the first usable device.
fn pick_device(candidates: &[DeviceCandidate], adapter_luid: Option<DeviceLuid>) -> Option<usize> {
    let mut usable = candidates.iter().enumerate().filter(|(_, candidate)| candidate.is_usable());

    if let Some(luid) = adapter_luid {
        if let Some((index, _)) = usable.clone().find(|(_, candidate)| candidate.luid == Some(luid)) {
            return Some(index);
        }
        tracing::warn!("⚠️ No Vulkan device matches adapter LUID {luid:02X?}, shared textures may fail to import");
    }
    usable.next().map(|(index, _)| index)
}

/// Everything that lives as long as the backend, independent of the shared
/// texture generation
pub struct VulkanContext {
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    fence: vk::Fence,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    // Destroyed in field order: device before instance.
    device: DeviceOwner,
    _instance: InstanceOwner,
}

impl VulkanContext {
    /// Create instance and device. With `adapter_luid` set, the device on the
    /// same GPU as the D3D11 adapter is preferred. Anything created before a
    /// failing step is destroyed again.
    pub fn new(enable_validation: bool, adapter_luid: Option<DeviceLuid>) -> Result<Self, BackendError> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|err| BackendError::new("vkGetInstanceProcAddr", err.to_string()))?;

            let validation = enable_validation && Self::has_validation_layer(&entry);
            if enable_validation && !validation {
                tracing::warn!("⚠️ Vulkan validation requested but {VALIDATION_LAYER:?} is not installed");
            }

            let mut instance = InstanceOwner {
                instance: Self::create_instance(&entry, validation)?,
                debug: None,
                entry,
            };
            if validation {
                instance.debug = Some(Self::create_debug_messenger(&instance.entry, &instance.instance)?);
            }

            let (physical_device, queue_family_index) =
                Self::select_physical_device(&instance.instance, adapter_luid)?;
            let memory_properties = instance.instance.get_physical_device_memory_properties(physical_device);
            let device = DeviceOwner(Self::create_device(
                &instance.instance,
                physical_device,
                queue_family_index,
            )?);
            let queue = device.0.get_device_queue(queue_family_index, 0);
            let (command_pool, command_buffer, fence) = Self::create_commands(&device.0, queue_family_index)?;

            let name = instance
                .instance
                .get_physical_device_properties(physical_device)
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::info!("✅ Vulkan backend ready on {name} (validation: {validation})");

            Ok(Self {
                queue,
                command_pool,
                command_buffer,
                fence,
                memory_properties,
                device,
                _instance: instance,
            })
        }
    }

    unsafe fn create_commands(
        device: &ash::Device,
        queue_family_index: u32,
    ) -> Result<(vk::CommandPool, vk::CommandBuffer, vk::Fence), BackendError> {
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = device
            .create_command_pool(&pool_info, None)
            .map_err(vk_error("vkCreateCommandPool"))?;

        let buffer_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        // Destroying the pool frees its buffers.
        let command_buffer = match device.allocate_command_buffers(&buffer_info) {
            Ok(buffers) => buffers[0],
            Err(err) => {
                device.destroy_command_pool(command_pool, None);
                return Err(vk_error("vkAllocateCommandBuffers")(err));
            }
        };

        let fence = match device.create_fence(&vk::FenceCreateInfo::default(), None) {
            Ok(fence) => fence,
            Err(err) => {
                device.destroy_command_pool(command_pool, None);
                return Err(vk_error("vkCreateFence")(err));
            }
        };

        Ok((command_pool, command_buffer, fence))
    }

    unsafe fn has_validation_layer(entry: &ash::Entry) -> bool {
        entry
            .enumerate_instance_layer_properties()
            .map(|layers| {
                layers
                    .iter()
                    .any(|layer| layer.layer_name_as_c_str() == Ok(VALIDATION_LAYER))
            })
            .unwrap_or(false)
    }

    unsafe fn create_instance(entry: &ash::Entry, validation: bool) -> Result<ash::Instance, BackendError> {
        let app_info = vk::ApplicationInfo::default()
            .application_name(c"Interop")
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(c"interop_vulkan")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_2);

        let mut layers = Vec::new();
        let mut extensions = vec![ash::khr::get_physical_device_properties2::NAME.as_ptr()];
        if validation {
            layers.push(VALIDATION_LAYER.as_ptr());
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layers)
            .enabled_extension_names(&extensions);

        entry
            .create_instance(&create_info, None)
            .map_err(vk_error("vkCreateInstance"))
    }

    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<DebugMessenger, BackendError> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);
        let info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = loader
            .create_debug_utils_messenger(&info, None)
            .map_err(vk_error("vkCreateDebugUtilsMessengerEXT"))?;
        Ok(DebugMessenger { loader, messenger })
    }

    /// Device with a graphics queue and Win32 external memory, preferring
    /// the one on `adapter_luid`
    unsafe fn select_physical_device(
        instance: &ash::Instance,
        adapter_luid: Option<DeviceLuid>,
    ) -> Result<(vk::PhysicalDevice, u32), BackendError> {
        let devices = instance
            .enumerate_physical_devices()
            .map_err(vk_error("vkEnumeratePhysicalDevices"))?;

        let candidates: Vec<DeviceCandidate> = devices
            .iter()
            .map(|&device| Self::describe_device(instance, device))
            .collect();

        let Some(index) = pick_device(&candidates, adapter_luid) else {
            return Err(BackendError::new(
                "vkEnumeratePhysicalDevices",
                "no GPU with a graphics queue and VK_KHR_external_memory_win32",
            ));
        };
        let queue_family_index = candidates[index].graphics_queue.unwrap_or_default();
        Ok((devices[index], queue_family_index))
    }

    unsafe fn describe_device(instance: &ash::Instance, device: vk::PhysicalDevice) -> DeviceCandidate {
        let graphics_queue = instance
            .get_physical_device_queue_family_properties(device)
            .iter()
            .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|index| index as u32);

        let external_memory_win32 = instance
            .enumerate_device_extension_properties(device)
            .map(|extensions| {
                extensions
                    .iter()
                    .any(|ext| ext.extension_name_as_c_str() == Ok(ash::khr::external_memory_win32::NAME))
            })
            .unwrap_or(false);

        let mut id_properties = vk::PhysicalDeviceIDProperties::default();
        {
            let mut properties = vk::PhysicalDeviceProperties2::default().push_next(&mut id_properties);
            instance.get_physical_device_properties2(device, &mut properties);
        }
        let luid = (id_properties.device_luid_valid == vk::TRUE).then_some(id_properties.device_luid);

        DeviceCandidate {
            graphics_queue,
            external_memory_win32,
            luid,
        }
    }

    unsafe fn create_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        queue_family_index: u32,
    ) -> Result<ash::Device, BackendError> {
        let priorities = [1.0];
        let queue_info = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&priorities);

        // External memory and dedicated allocation are core in 1.1; only the
        // Win32 handle import needs an extension.
        let extensions = [ash::khr::external_memory_win32::NAME.as_ptr()];

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_info))
            .enabled_extension_names(&extensions);

        instance
            .create_device(physical_device, &create_info, None)
            .map_err(vk_error("vkCreateDevice"))
    }

    pub fn device(&self) -> &ash::Device {
        &self.device.0
    }

    /// Index of a memory type allowed by `type_bits` with all of `flags`
    pub fn memory_type_index(&self, type_bits: u32, flags: vk::MemoryPropertyFlags) -> Option<u32> {
        let props = &self.memory_properties;
        (0..props.memory_type_count).find(|&index| {
            type_bits & (1 << index) != 0
                && props.memory_types[index as usize].property_flags.contains(flags)
        })
    }

    /// Record commands with `record`, submit them and block until the GPU is
    /// done.
    pub fn submit_and_wait(
        &self,
        record: impl FnOnce(&ash::Device, vk::CommandBuffer),
    ) -> Result<(), BackendError> {
        unsafe {
            let device = &self.device.0;
            device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(vk_error("vkResetCommandBuffer"))?;

            let begin_info =
                vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(vk_error("vkBeginCommandBuffer"))?;
            record(device, self.command_buffer);
            device
                .end_command_buffer(self.command_buffer)
                .map_err(vk_error("vkEndCommandBuffer"))?;

            let submit_info = vk::SubmitInfo::default().command_buffers(std::slice::from_ref(&self.command_buffer));
            device
                .queue_submit(self.queue, &[submit_info], self.fence)
                .map_err(vk_error("vkQueueSubmit"))?;
            device
                .wait_for_fences(&[self.fence], true, u64::MAX)
                .map_err(vk_error("vkWaitForFences"))?;
            device
                .reset_fences(&[self.fence])
                .map_err(vk_error("vkResetFences"))
        }
    }

    pub fn wait_idle(&self) {
        unsafe {
            if let Err(err) = self.device.0.device_wait_idle() {
                tracing::warn!("⚠️ vkDeviceWaitIdle failed: {err}");
            }
        }
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        self.wait_idle();
        unsafe {
            let device = &self.device.0;
            device.destroy_fence(self.fence, None);
            device.free_command_buffers(self.command_pool, &[self.command_buffer]);
            device.destroy_command_pool(self.command_pool, None);
        }
        tracing::info!("🧹 Vulkan backend destroyed");
    }
}

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    _kind: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() || (*data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*data).p_message).to_string_lossy();

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!(target: "interop_vulkan::validation", "{message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!(target: "interop_vulkan::validation", "{message}");
    } else {
        tracing::debug!(target: "interop_vulkan::validation", "{message}");
    }
    vk::FALSE
}
