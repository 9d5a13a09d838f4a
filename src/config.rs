// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, CONFIG_VERSION, DEFAULT_PREVIEW_HEIGHT,
    DEFAULT_PREVIEW_WIDTH,
};
use crate::errors::{AppError, AppResult};
use crate::frame::Layout;
use crate::renderer::RendererConfig;
use crate::transform::Orientation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Persisted settings
///
/// Missing fields fall back to their defaults, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema version of the file
    pub version: u32,
    /// Renderer settings (viewport, clear colour, present mode, adapter)
    pub renderer: RendererConfig,
    /// Layout assumed for input files when none is given
    pub layout: Layout,
    /// Orientation applied to input frames when none is given
    pub orientation: Orientation,
    /// Offscreen render size
    pub surface_width: u32,
    pub surface_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            renderer: RendererConfig::default(),
            layout: Layout::Nv21,
            orientation: Orientation::default(),
            surface_width: DEFAULT_PREVIEW_WIDTH,
            surface_height: DEFAULT_PREVIEW_HEIGHT,
        }
    }
}

impl Config {
    /// Default location: `<config dir>/yuvplay/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location; defaults if there is no file
    pub fn load() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a path; defaults if the file does not exist
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut config: Config = serde_json::from_str(&text)?;
        if config.version > CONFIG_VERSION {
            return Err(AppError::Config(format!(
                "{} has version {}, newer than supported version {}",
                path.display(),
                config.version,
                CONFIG_VERSION
            )));
        }
        if config.version < CONFIG_VERSION {
            info!(
                from = config.version,
                to = CONFIG_VERSION,
                "Upgrading config version"
            );
            config.version = CONFIG_VERSION;
        }
        Ok(config)
    }

    /// Save to the default location, returning the path written
    pub fn save(&self) -> AppResult<PathBuf> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("no config directory on this platform".into()))?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }
}
