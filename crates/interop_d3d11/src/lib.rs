//! # Direct3D 11 compositing backend
//!
//! Implements the `interop_core` device traits on top of Direct3D 11 and DXGI,
//! and binds composition swapchains to a window through DirectComposition.
//!
//! ```text
//! D3d11Api ──► first hardware IDXGIAdapter1 ──► D3d11Device (ID3D11Device, context, IDXGIFactory2)
//!                 ├── CreateSwapChainForComposition ─► D3d11Swapchain ──► CompositionSink (HWND target + visual)
//!                 ├── CreateTexture2D(MISC_SHARED)   ─► D3d11SharedTexture ─► GetSharedHandle
//!                 └── CopyResource(back buffer ◄─ shared texture)
//! ```
//!
//! Everything here is Windows only; on other targets the crate is empty.

#[cfg(windows)]
mod composition;
#[cfg(windows)]
mod device;
#[cfg(windows)]
mod native;

#[cfg(windows)]
pub use composition::CompositionSink;
#[cfg(windows)]
pub use device::{AdapterLuid, D3d11Api, D3d11BackBuffer, D3d11Device, D3d11SharedTexture, D3d11Swapchain};
#[cfg(windows)]
pub use native::classify;
