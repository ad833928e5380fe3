//! Persistent settings (`interop.toml`)

use interop_core::LifecycleOptions;
use interop_vulkan::VulkanOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "D3D11 / Vulkan Interop".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationSettings {
    /// 0 presents immediately, 1..=4 waits for that many vertical blanks
    pub sync_interval: u32,
    pub recover_device_lost: bool,
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self {
            sync_interval: 0,
            recover_device_lost: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSettings {
    pub start_running: bool,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self { start_running: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub enable_validation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteropSettings {
    pub window: WindowSettings,
    pub presentation: PresentationSettings,
    pub clock: ClockSettings,
    pub backend: BackendSettings,
}

impl InteropSettings {
    /// Load settings, falling back to defaults if the file is missing or bad.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to load settings from {}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn lifecycle_options(&self) -> LifecycleOptions {
        LifecycleOptions {
            // DXGI rejects intervals above 4.
            sync_interval: self.presentation.sync_interval.min(4),
            recover_device_lost: self.presentation.recover_device_lost,
            start_clock: self.clock.start_running,
        }
    }

    pub fn vulkan_options(&self) -> VulkanOptions {
        VulkanOptions {
            enable_validation: self.backend.enable_validation,
            // Only known once the compositing adapter is picked.
            adapter_luid: None,
        }
    }
}
