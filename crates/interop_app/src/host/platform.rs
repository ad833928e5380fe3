//! Builds the platform's surface lifecycle for a window

use crate::settings::InteropSettings;
use interop_core::SurfaceEvents;
use winit::window::Window;

/// Direct3D 11 compositing with a DirectComposition sink on the window,
/// rendered into by the Vulkan backend.
#[cfg(windows)]
pub fn build_surface(window: &Window, settings: &InteropSettings) -> anyhow::Result<Box<dyn SurfaceEvents>> {
    use anyhow::Context;
    use interop_core::SurfaceLifecycle;
    use interop_d3d11::{CompositionSink, D3d11Api};
    use interop_vulkan::VulkanBackend;

    let api = D3d11Api;
    let sink = CompositionSink::for_window(window).context("Window has no Win32 handle")?;

    let mut options = settings.vulkan_options();
    match api.adapter_luid() {
        Ok(luid) => options.adapter_luid = Some(luid),
        Err(err) => tracing::warn!("⚠️ Could not read the D3D11 adapter LUID: {err}"),
    }
    let backend = VulkanBackend::new(options);

    Ok(Box::new(SurfaceLifecycle::new(
        api,
        sink,
        backend,
        settings.lifecycle_options(),
    )))
}

#[cfg(not(windows))]
pub fn build_surface(_window: &Window, _settings: &InteropSettings) -> anyhow::Result<Box<dyn SurfaceEvents>> {
    anyhow::bail!("The shared surface needs Direct3D 11 and DirectComposition, which are only available on Windows")
}
