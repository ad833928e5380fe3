//! # Interop host
//!
//! Opens a window, composes a Direct3D 11 swapchain into it and lets a Vulkan
//! backend draw the content through a shared texture.

pub mod appdata;
pub mod args;
pub mod host;
pub mod logging;
pub mod settings;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
