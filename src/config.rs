//! Configuration for the window core and its replay tool
//!
//! Loads configuration from TOML file at `~/.config/area/dix.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::dix::{Depth, SaverSettings, ScreenInfo};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub screen: ScreenConfig,
    pub saver: SaverSettings,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location, or use defaults if the
    /// file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from `path`. A missing file is created with the
    /// defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            if let Err(e) = Self::save_default(path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;

        info!("Configuration loaded from {:?}", path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area");

        Ok(config_dir.join("dix.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string)
            .context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Screen geometry and visuals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
    /// Root window id
    pub root_window: u32,
    pub root_depth: u8,
    pub root_visual: u32,
    pub default_colormap: u32,
    pub root_cursor: u32,
    /// Pixel values (hex: 0xRRGGBB)
    pub black_pixel: u32,
    pub white_pixel: u32,
    /// Visuals allowed at each depth
    pub depths: Vec<DepthConfig>,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        let info = ScreenInfo::default();
        Self {
            width: info.width,
            height: info.height,
            root_window: info.root,
            root_depth: info.root_depth,
            root_visual: info.root_visual,
            default_colormap: info.default_colormap,
            root_cursor: info.root_cursor,
            black_pixel: info.black_pixel,
            white_pixel: info.white_pixel,
            depths: info
                .depths
                .into_iter()
                .map(|d| DepthConfig { depth: d.depth, visuals: d.visuals })
                .collect(),
        }
    }
}

impl ScreenConfig {
    pub fn screen_info(&self) -> ScreenInfo {
        ScreenInfo {
            root: self.root_window,
            width: self.width,
            height: self.height,
            root_depth: self.root_depth,
            root_visual: self.root_visual,
            default_colormap: self.default_colormap,
            black_pixel: self.black_pixel,
            white_pixel: self.white_pixel,
            root_cursor: self.root_cursor,
            depths: self
                .depths
                .iter()
                .map(|d| Depth { depth: d.depth, visuals: d.visuals.clone() })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthConfig {
    pub depth: u8,
    pub visuals: Vec<u32>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is not set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "area_dix=debug,info".to_string(),
        }
    }
}
