//! Plain data shared by every layer of the surface pipeline
//!
//! Sizes, formats and the descriptors handed to the compositing API when a
//! generation is allocated. Nothing in here owns a GPU object.

use std::fmt;

/// Width and height of a surface in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Clamp both dimensions to at least one pixel.
    ///
    /// Used for the initial load, where the host may report a panel that has
    /// not been laid out yet.
    pub fn clamped(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// True when either dimension is zero (minimized or collapsed surface)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel formats the pipeline knows how to share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit BGRA with alpha, the format composition surfaces require
    Bgra8Unorm,
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bgra8Unorm => f.write_str("B8G8R8A8_UNORM"),
        }
    }
}

/// Monotonic counter identifying one swapchain/texture/back-buffer generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationId(u64);

impl GenerationId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// OS-level identifier of a cross-API shareable texture
///
/// The value is only meaningful while the generation it was taken from is
/// alive. It carries that generation's id so the backend boundary can reject
/// stale handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SharedHandle {
    raw: usize,
    generation: GenerationId,
}

impl SharedHandle {
    pub const fn new(raw: usize, generation: GenerationId) -> Self {
        Self { raw, generation }
    }

    /// The raw OS handle value, as the importing API expects it
    pub fn raw(&self) -> usize {
        self.raw
    }

    pub fn generation(&self) -> GenerationId {
        self.generation
    }
}

impl fmt::Display for SharedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X} ({})", self.raw, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapEffect {
    FlipSequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scaling {
    Stretch,
}

/// Swapchain parameters for a composition (not window-handle) swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub extent: Extent,
    pub format: PixelFormat,
    pub buffer_count: u32,
    pub alpha_mode: AlphaMode,
    pub swap_effect: SwapEffect,
    pub scaling: Scaling,
}

impl SwapchainDesc {
    pub const BUFFER_COUNT: u32 = 2;

    pub fn for_composition(extent: Extent, format: PixelFormat) -> Self {
        Self {
            extent,
            format,
            buffer_count: Self::BUFFER_COUNT,
            alpha_mode: AlphaMode::Unspecified,
            swap_effect: SwapEffect::FlipSequential,
            scaling: Scaling::Stretch,
        }
    }
}

/// Texture parameters for the cross-API shared render target
///
/// Always default usage, bindable as a render target, one mip level, no CPU
/// access and plain (non keyed-mutex) shared-handle semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedTextureDesc {
    pub extent: Extent,
    pub format: PixelFormat,
    pub mip_levels: u32,
}

impl SharedTextureDesc {
    pub fn render_target(extent: Extent, format: PixelFormat) -> Self {
        Self {
            extent,
            format,
            mip_levels: 1,
        }
    }
}
