use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::*;
use crate::utils::AppError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_capture_interval")]
    pub capture_interval_secs: f64,

    /// Periodic time observer fires every 1/scale seconds
    #[serde(default = "default_time_scale")]
    pub periodic_time_scale: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_extractions: usize,

    #[serde(default = "default_cell_width")]
    pub cell_width: f64,

    #[serde(default = "default_cell_height")]
    pub cell_height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        info!("Config loaded successfully");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), AppError> {
        let interval = self.playback.capture_interval_secs;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(AppError::Configuration(format!(
                "capture_interval_secs must be positive, got {}",
                interval
            )));
        }
        if self.playback.periodic_time_scale == 0 {
            return Err(AppError::Configuration(
                "periodic_time_scale must be non-zero".to_string(),
            ));
        }
        if self.thumbnails.max_concurrent_extractions == 0 {
            return Err(AppError::Configuration(
                "max_concurrent_extractions must be non-zero".to_string(),
            ));
        }
        if !(self.thumbnails.cell_width > 0.0) || !(self.thumbnails.cell_height > 0.0) {
            return Err(AppError::Configuration(format!(
                "cell size must be positive, got {}x{}",
                self.thumbnails.cell_width, self.thumbnails.cell_height
            )));
        }
        if self.events.channel_capacity == 0 {
            return Err(AppError::Configuration(
                "channel_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn periodic_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.playback.periodic_time_scale.max(1)))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("filmstrip").join("config.toml"))
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            capture_interval_secs: default_capture_interval(),
            periodic_time_scale: default_time_scale(),
        }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            max_concurrent_extractions: default_max_concurrent(),
            cell_width: default_cell_width(),
            cell_height: default_cell_height(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            history_size: default_history_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

// Default value functions
fn default_capture_interval() -> f64 { DEFAULT_CAPTURE_INTERVAL_SECS }
fn default_time_scale() -> u32 { DEFAULT_PERIODIC_TIME_SCALE }
fn default_max_concurrent() -> usize { DEFAULT_MAX_CONCURRENT_EXTRACTIONS }
fn default_cell_width() -> f64 { DEFAULT_CELL_WIDTH }
fn default_cell_height() -> f64 { DEFAULT_CELL_HEIGHT }
fn default_channel_capacity() -> usize { DEFAULT_EVENT_CHANNEL_CAPACITY }
fn default_history_size() -> usize { DEFAULT_EVENT_HISTORY_SIZE }
fn default_log_filter() -> String { "filmstrip=info".to_string() }
