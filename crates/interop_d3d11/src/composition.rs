//! DirectComposition presentation sink
//!
//! Plays the role of a XAML swapchain panel for a plain Win32 window: a
//! composition target on the window's HWND with one visual whose content is
//! the current swapchain. The window must be created without a redirection
//! bitmap for the visual to show.

use crate::device::{D3d11Device, D3d11Swapchain};
use crate::native::{native_error, NativeResultExt};
use interop_core::{NativeError, PresentationSink};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use windows::core::{IUnknown, Interface};
use windows::Win32::Foundation::{E_HANDLE, HWND};
use windows::Win32::Graphics::DirectComposition::{
    DCompositionCreateDevice, IDCompositionDevice, IDCompositionTarget, IDCompositionVisual,
};
use windows::Win32::Graphics::Dxgi::IDXGIDevice;

/// Visual tree of one composition device. Release order: visual, target,
/// device, then the DXGI device it was built on.
struct CompositionTree {
    visual: IDCompositionVisual,
    _target: IDCompositionTarget,
    device: IDCompositionDevice,
    dxgi_device: IDXGIDevice,
}

impl CompositionTree {
    unsafe fn create(hwnd: HWND, dxgi_device: IDXGIDevice) -> Result<Self, NativeError> {
        let device: IDCompositionDevice =
            DCompositionCreateDevice(&dxgi_device).native("DCompositionCreateDevice")?;
        let target = device
            .CreateTargetForHwnd(hwnd, true)
            .native("IDCompositionDevice::CreateTargetForHwnd")?;
        let visual = device.CreateVisual().native("IDCompositionDevice::CreateVisual")?;
        target.SetRoot(&visual).native("IDCompositionTarget::SetRoot")?;
        tracing::debug!("✨ Composition target created");

        Ok(Self {
            visual,
            _target: target,
            device,
            dxgi_device,
        })
    }

    fn built_on(&self, dxgi_device: &IDXGIDevice) -> bool {
        self.dxgi_device.as_raw() == dxgi_device.as_raw()
    }
}

/// Binds composition swapchains to a window
pub struct CompositionSink {
    hwnd: HWND,
    tree: Option<CompositionTree>,
}

impl CompositionSink {
    pub fn new(hwnd: HWND) -> Self {
        Self { hwnd, tree: None }
    }

    pub fn for_window(window: &impl HasWindowHandle) -> Result<Self, NativeError> {
        let raw = window
            .window_handle()
            .map_err(|_| native_error("HasWindowHandle::window_handle", E_HANDLE))?
            .as_raw();

        match raw {
            RawWindowHandle::Win32(handle) => Ok(Self::new(HWND(handle.hwnd.get() as *mut _))),
            _ => Err(native_error("HasWindowHandle::window_handle", E_HANDLE)),
        }
    }

    /// Visual tree for the device that created `swapchain`. Reused across
    /// resizes; rebuilt when the swapchain comes from a different device.
    unsafe fn tree_for(&mut self, swapchain: &D3d11Swapchain) -> Result<&CompositionTree, NativeError> {
        let dxgi_device: IDXGIDevice = swapchain
            .raw()
            .GetDevice()
            .native("IDXGISwapChain1::GetDevice")?;

        let tree = match self.tree.take() {
            Some(tree) if tree.built_on(&dxgi_device) => tree,
            stale => {
                drop(stale);
                CompositionTree::create(self.hwnd, dxgi_device)?
            }
        };
        Ok(self.tree.insert(tree))
    }
}

impl PresentationSink<D3d11Device> for CompositionSink {
    fn attach(&mut self, swapchain: &D3d11Swapchain) -> Result<(), NativeError> {
        unsafe {
            let tree = self.tree_for(swapchain)?;
            tree.visual
                .SetContent(swapchain.raw())
                .native("IDCompositionVisual::SetContent")?;
            tree.device.Commit().native("IDCompositionDevice::Commit")
        }
    }

    /// Clear the visual so it no longer references the swapchain. The tree
    /// stays for the next generation on the same device.
    fn detach(&mut self) -> Result<(), NativeError> {
        let Some(tree) = &self.tree else {
            return Ok(());
        };

        unsafe {
            tree.visual
                .SetContent(None::<&IUnknown>)
                .native("IDCompositionVisual::SetContent")?;
            tree.device.Commit().native("IDCompositionDevice::Commit")
        }
    }

    fn reset(&mut self) {
        if self.tree.take().is_some() {
            tracing::debug!("🔄 Composition target released");
        }
    }
}

impl Drop for CompositionSink {
    fn drop(&mut self) {
        PresentationSink::<D3d11Device>::reset(self);
    }
}
