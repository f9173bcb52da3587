// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{
    APP_ID, IMAGE_CACHE_TTL, LOW_RES_JPEG_QUALITY, LOW_RES_MAX_DIMENSION, OFFLOAD_THREAD_NAME,
};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Frame dispatch settings
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Run filter passes on the offload worker (inline when disabled)
    pub offload_enabled: bool,
    /// Name given to the offload worker thread
    pub worker_thread_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            offload_enabled: true,
            worker_thread_name: OFFLOAD_THREAD_NAME.to_string(),
        }
    }
}

/// Image acquisition cache settings
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a loaded image stays valid
    pub ttl_secs: u64,
    /// Longest edge of low-resolution previews
    pub low_res_max_dimension: u32,
    /// JPEG quality (1-100) of recompressed previews
    pub low_res_quality: u8,
    /// Ask known CDNs for a small rendition instead of downsampling locally
    pub cdn_rewrite: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: IMAGE_CACHE_TTL.as_secs(),
            low_res_max_dimension: LOW_RES_MAX_DIMENSION,
            low_res_quality: LOW_RES_JPEG_QUALITY,
            cdn_rewrite: true,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dispatch: DispatchConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Default location: `<config dir>/tryon/config.json`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join("config.json"))
    }

    /// Load from the default location, falling back to defaults if absent
    pub fn load() -> AppResult<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }
}
