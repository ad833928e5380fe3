//! Per-user data and config directories
//
// The default settings file is written on first run, once logging is up.

use crate::settings::InteropSettings;
use anyhow::Context;
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "interop.toml";

pub struct AppDataPaths {
    pub logs_dir: PathBuf,
    pub config_file: PathBuf,
}

impl AppDataPaths {
    pub fn under(data_dir: &Path, config_dir: &Path) -> Self {
        Self {
            logs_dir: data_dir.join("logs"),
            config_file: config_dir.join(CONFIG_FILE_NAME),
        }
    }
}

pub fn project_dirs() -> anyhow::Result<ProjectDirs> {
    ProjectDirs::from("com", "Interop", "Interop_Demo").context("Could not determine app data directory")
}

/// Resolve the per-user directories.
pub fn setup_appdata() -> anyhow::Result<AppDataPaths> {
    let dirs = project_dirs()?;
    Ok(AppDataPaths::under(dirs.data_dir(), dirs.config_dir()))
}

/// Write default settings to `path` if nothing is there yet.
pub fn ensure_default_config(path: &Path) {
    if path.exists() {
        return;
    }
    if let Err(e) = fs::create_dir_all(path.parent().unwrap_or(Path::new("."))) {
        tracing::error!("Failed to create config directory: {e}");
        return;
    }
    match InteropSettings::default().save(path) {
        Ok(()) => tracing::info!("📝 Wrote default settings to {}", path.display()),
        Err(e) => tracing::error!("Failed to write default settings: {e}"),
    }
}
