//! # Interop Core
//!
//! Composites frames rendered by one graphics API into a swapchain owned by
//! another. A device on the compositing API allocates a texture that can be
//! shared through an OS handle; the render backend imports that handle and
//! draws into it; every display tick the shared texture is copied into the
//! swapchain's back buffer and presented.
//!
//! ## Layout
//!
//! - [`device`] - traits over the compositing API and the owned device
//! - [`surface`] - one size-matched generation of swapchain, shared texture and back buffer
//! - [`presenter`] - copy and present, once per tick
//! - [`backend`] - the render backend contract and its sequencing guard
//! - [`lifecycle`] - the state machine driven by host notifications
//! - [`clock`] - elapsed time fed to the backend
//!
//! Nothing here is platform specific. The Direct3D 11 and Vulkan halves live
//! in their own crates.

pub mod backend;
pub mod clock;
pub mod device;
pub mod error;
pub mod lifecycle;
pub mod presenter;
pub mod surface;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use backend::{BackendBoundary, RenderBackend};
pub use clock::Clock;
pub use device::{CompositionApi, GraphicsDevice, PresentationDevice, PresentationSink, SharedTexture, SurfaceInfo, Swapchain};
pub use error::{BackendError, HostEvent, InteropError, NativeError, NativeErrorKind, SurfaceError};
pub use lifecycle::{LifecycleOptions, LifecyclePhase, ResizeOutcome, SurfaceEvents, SurfaceLifecycle, TickOutcome};
pub use presenter::FramePresenter;
pub use surface::Generation;
pub use types::{Extent, GenerationId, PixelFormat, SharedHandle, SharedTextureDesc, SwapchainDesc};
