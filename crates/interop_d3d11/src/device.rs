//! Direct3D 11 device, composition swapchain and shared texture
//!
//! Each wrapper owns its COM reference; dropping it releases the native
//! object. Sizes reported through [`SurfaceInfo`] are read back from the
//! native descriptors, not echoed from the request.

use crate::native::{native_error, NativeResultExt};
use interop_core::{
    CompositionApi, Extent, GraphicsDevice, NativeError, PixelFormat, SharedTexture,
    SharedTextureDesc, SurfaceInfo, Swapchain, SwapchainDesc,
};
use interop_core::types::{AlphaMode, Scaling, SwapEffect};
use windows::core::Interface;
use windows::Win32::Foundation::{E_FAIL, FALSE, HMODULE, LUID};
use windows::Win32::Graphics::Direct3D::{D3D_DRIVER_TYPE_UNKNOWN, D3D_FEATURE_LEVEL};
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;

fn dxgi_format(format: PixelFormat) -> DXGI_FORMAT {
    match format {
        PixelFormat::Bgra8Unorm => DXGI_FORMAT_B8G8R8A8_UNORM,
    }
}

/// LUID of a DXGI adapter, in the byte layout Vulkan reports as `deviceLUID`
pub type AdapterLuid = [u8; 8];

fn luid_bytes(luid: LUID) -> AdapterLuid {
    let mut bytes = [0u8; 8];
    bytes[..4].copy_from_slice(&luid.LowPart.to_le_bytes());
    bytes[4..].copy_from_slice(&luid.HighPart.to_le_bytes());
    bytes
}

fn adapter_description(desc: &DXGI_ADAPTER_DESC1) -> String {
    let len = desc.Description.iter().position(|&c| c == 0).unwrap_or(desc.Description.len());
    String::from_utf16_lossy(&desc.Description[..len])
}

/// First hardware adapter, in DXGI enumeration order
unsafe fn hardware_adapter(factory: &IDXGIFactory2) -> Result<(IDXGIAdapter1, DXGI_ADAPTER_DESC1), NativeError> {
    let mut index = 0;
    loop {
        // DXGI_ERROR_NOT_FOUND once the list is exhausted.
        let adapter = factory.EnumAdapters1(index).native("IDXGIFactory1::EnumAdapters1")?;
        let desc = adapter.GetDesc1().native("IDXGIAdapter1::GetDesc1")?;
        if desc.Flags & DXGI_ADAPTER_FLAG_SOFTWARE.0 as u32 == 0 {
            return Ok((adapter, desc));
        }
        tracing::debug!("Skipping software adapter {}", adapter_description(&desc));
        index += 1;
    }
}

/// Hardware Direct3D 11 entry point
#[derive(Debug, Default, Clone, Copy)]
pub struct D3d11Api;

impl D3d11Api {
    /// LUID of the adapter [`CompositionApi::create_device`] will use, so a
    /// render backend can open the shared texture on the same GPU
    pub fn adapter_luid(&self) -> Result<AdapterLuid, NativeError> {
        unsafe {
            let factory: IDXGIFactory2 = CreateDXGIFactory1().native("CreateDXGIFactory1")?;
            let (_, desc) = hardware_adapter(&factory)?;
            Ok(luid_bytes(desc.AdapterLuid))
        }
    }
}

impl CompositionApi for D3d11Api {
    type Device = D3d11Device;

    fn create_device(&self) -> Result<D3d11Device, NativeError> {
        unsafe { D3d11Device::create() }
    }
}

/// `ID3D11Device` with its immediate context and the DXGI factory used for
/// swapchain creation
pub struct D3d11Device {
    factory: IDXGIFactory2,
    context: ID3D11DeviceContext,
    device: ID3D11Device,
    adapter_name: String,
}

impl D3d11Device {
    unsafe fn create() -> Result<Self, NativeError> {
        let factory: IDXGIFactory2 = CreateDXGIFactory1().native("CreateDXGIFactory1")?;
        // No WARP fallback: a missing hardware adapter is fatal.
        let (adapter, desc) = hardware_adapter(&factory)?;

        let mut device = None;
        let mut context = None;
        let mut feature_level = D3D_FEATURE_LEVEL::default();

        D3D11CreateDevice(
            &adapter,
            D3D_DRIVER_TYPE_UNKNOWN,
            HMODULE(std::ptr::null_mut()),
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            Some(&mut feature_level),
            Some(&mut context),
        )
        .native("D3D11CreateDevice")?;

        let (Some(device), Some(context)) = (device, context) else {
            return Err(native_error("D3D11CreateDevice", E_FAIL));
        };

        let adapter_name = adapter_description(&desc);
        tracing::debug!(
            "✨ D3D11 device created on {adapter_name} (LUID {:02X?}) at feature level 0x{:X}",
            luid_bytes(desc.AdapterLuid),
            feature_level.0
        );

        Ok(Self {
            factory,
            context,
            device,
            adapter_name,
        })
    }
}

impl GraphicsDevice for D3d11Device {
    type Swapchain = D3d11Swapchain;
    type SharedTexture = D3d11SharedTexture;
    type BackBuffer = D3d11BackBuffer;

    fn adapter_name(&self) -> String {
        self.adapter_name.clone()
    }

    fn create_swapchain(&self, desc: &SwapchainDesc) -> Result<D3d11Swapchain, NativeError> {
        let native_desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: desc.extent.width,
            Height: desc.extent.height,
            Format: dxgi_format(desc.format),
            Stereo: FALSE,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: desc.buffer_count,
            Scaling: match desc.scaling {
                Scaling::Stretch => DXGI_SCALING_STRETCH,
            },
            SwapEffect: match desc.swap_effect {
                SwapEffect::FlipSequential => DXGI_SWAP_EFFECT_FLIP_SEQUENTIAL,
            },
            AlphaMode: match desc.alpha_mode {
                AlphaMode::Unspecified => DXGI_ALPHA_MODE_UNSPECIFIED,
            },
            Flags: 0,
        };

        unsafe {
            let swapchain = self
                .factory
                .CreateSwapChainForComposition(&self.device, &native_desc, None)
                .native("IDXGIFactory2::CreateSwapChainForComposition")?;

            let actual = swapchain.GetDesc1().native("IDXGISwapChain1::GetDesc1")?;
            Ok(D3d11Swapchain {
                swapchain,
                extent: Extent::new(actual.Width, actual.Height),
                format: desc.format,
            })
        }
    }

    fn create_shared_texture(&self, desc: &SharedTextureDesc) -> Result<D3d11SharedTexture, NativeError> {
        let native_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.extent.width,
            Height: desc.extent.height,
            MipLevels: desc.mip_levels,
            ArraySize: 1,
            Format: dxgi_format(desc.format),
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: D3D11_BIND_RENDER_TARGET.0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: D3D11_RESOURCE_MISC_SHARED.0 as u32,
        };

        unsafe {
            let mut texture: Option<ID3D11Texture2D> = None;
            self.device
                .CreateTexture2D(&native_desc, None, Some(&mut texture))
                .native("ID3D11Device::CreateTexture2D")?;
            let texture = texture.ok_or_else(|| native_error("ID3D11Device::CreateTexture2D", E_FAIL))?;

            let (extent, format) = texture_info(&texture, desc.format);
            Ok(D3d11SharedTexture {
                texture,
                extent,
                format,
            })
        }
    }

    fn copy_resource(&self, dst: &D3d11BackBuffer, src: &D3d11SharedTexture) {
        unsafe {
            self.context.CopyResource(&dst.texture, &src.texture);
        }
    }
}

impl Drop for D3d11Device {
    fn drop(&mut self) {
        unsafe {
            self.context.ClearState();
            self.context.Flush();
        }
        tracing::debug!("🔄 D3D11 device on {} released", self.adapter_name);
    }
}

unsafe fn texture_info(texture: &ID3D11Texture2D, format: PixelFormat) -> (Extent, PixelFormat) {
    let mut desc = D3D11_TEXTURE2D_DESC::default();
    texture.GetDesc(&mut desc);
    (Extent::new(desc.Width, desc.Height), format)
}

/// Composition swapchain created with `CreateSwapChainForComposition`
pub struct D3d11Swapchain {
    swapchain: IDXGISwapChain1,
    extent: Extent,
    format: PixelFormat,
}

impl D3d11Swapchain {
    pub fn raw(&self) -> &IDXGISwapChain1 {
        &self.swapchain
    }
}

impl SurfaceInfo for D3d11Swapchain {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn format(&self) -> PixelFormat {
        self.format
    }
}

impl Swapchain for D3d11Swapchain {
    type BackBuffer = D3d11BackBuffer;

    fn back_buffer(&self, index: u32) -> Result<D3d11BackBuffer, NativeError> {
        unsafe {
            let texture: ID3D11Texture2D = self
                .swapchain
                .GetBuffer(index)
                .native("IDXGISwapChain1::GetBuffer")?;
            let (extent, format) = texture_info(&texture, self.format);
            Ok(D3d11BackBuffer {
                texture,
                extent,
                format,
            })
        }
    }

    fn present(&self, sync_interval: u32) -> Result<(), NativeError> {
        unsafe {
            self.swapchain
                .Present(sync_interval, DXGI_PRESENT(0))
                .ok()
                .native("IDXGISwapChain1::Present")
        }
    }
}

/// Render-target texture created with `D3D11_RESOURCE_MISC_SHARED`
pub struct D3d11SharedTexture {
    texture: ID3D11Texture2D,
    extent: Extent,
    format: PixelFormat,
}

impl SurfaceInfo for D3d11SharedTexture {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn format(&self) -> PixelFormat {
        self.format
    }
}

impl SharedTexture for D3d11SharedTexture {
    fn raw_shared_handle(&self) -> Result<usize, NativeError> {
        unsafe {
            let resource: IDXGIResource = self
                .texture
                .cast()
                .native("ID3D11Texture2D::QueryInterface(IDXGIResource)")?;
            let handle = resource.GetSharedHandle().native("IDXGIResource::GetSharedHandle")?;
            Ok(handle.0 as usize)
        }
    }
}

/// Buffer 0 of a [`D3d11Swapchain`]
pub struct D3d11BackBuffer {
    texture: ID3D11Texture2D,
    extent: Extent,
    format: PixelFormat,
}

impl SurfaceInfo for D3d11BackBuffer {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn format(&self) -> PixelFormat {
        self.format
    }
}
