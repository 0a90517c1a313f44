use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::frame::FrameFormat;
use crate::source::TestPattern;

/// Largest accepted frame edge in pixels
pub const MAX_RESOLUTION_EDGE: u32 = 8192;

/// Highest accepted source frame rate
pub const MAX_SOURCE_FPS: u32 = 1000;

/// Largest accepted number of pooled frame buffers
pub const MAX_POOL_SIZE: usize = 64;

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct LumaConfig {
    pub source: SourceConfig,
    pub analyzer: AnalyzerConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    /// Frame resolution (width, height)
    #[serde(default = "default_source_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second produced by the source
    #[serde(default = "default_source_fps")]
    pub fps: u32,

    /// Pixel layout of produced frames (yuv420, gray8)
    #[serde(default = "default_source_format")]
    pub format: FrameFormat,

    /// Number of frame buffers recycled by the source
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Synthetic image content (solid, gradient, ramp)
    #[serde(default = "default_pattern")]
    pub pattern: TestPattern,

    /// Base sample level used by the solid and ramp patterns
    #[serde(default = "default_level")]
    pub level: u8,

    /// Stop after this many frames
    #[serde(default)]
    pub frame_limit: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// Log a luminosity summary every N analyzed frames (0 disables)
    #[serde(default = "default_summary_interval")]
    pub summary_interval: u64,
}

impl LumaConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("lumacam.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "source.resolution",
                vec![default_source_resolution().0, default_source_resolution().1],
            )?
            .set_default("source.fps", default_source_fps())?
            .set_default("source.format", default_source_format().as_str())?
            .set_default("source.pool_size", default_pool_size() as i64)?
            .set_default("source.pattern", default_pattern().as_str())?
            .set_default("source.level", default_level() as i64)?
            .set_default("analyzer.summary_interval", default_summary_interval() as i64)?
            .add_source(File::with_name(&path_str).required(false))
            // LUMACAM_SOURCE__POOL_SIZE=8 -> source.pool_size
            .add_source(
                Environment::with_prefix("LUMACAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: LumaConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.resolution.0 == 0 || self.source.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Source resolution must be greater than 0".to_string(),
            ));
        }

        if self.source.resolution.0 > MAX_RESOLUTION_EDGE
            || self.source.resolution.1 > MAX_RESOLUTION_EDGE
        {
            return Err(ConfigError::Message(format!(
                "Source resolution must not exceed {}x{}",
                MAX_RESOLUTION_EDGE, MAX_RESOLUTION_EDGE
            )));
        }

        if self.source.fps == 0 || self.source.fps > MAX_SOURCE_FPS {
            return Err(ConfigError::Message(format!(
                "Source fps must be between 1 and {}",
                MAX_SOURCE_FPS
            )));
        }

        if self.source.pool_size == 0 || self.source.pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::Message(format!(
                "Source pool_size must be between 1 and {}",
                MAX_POOL_SIZE
            )));
        }

        if self.source.frame_limit == Some(0) {
            return Err(ConfigError::Message(
                "Source frame_limit must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            resolution: default_source_resolution(),
            fps: default_source_fps(),
            format: default_source_format(),
            pool_size: default_pool_size(),
            pattern: default_pattern(),
            level: default_level(),
            frame_limit: None,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            summary_interval: default_summary_interval(),
        }
    }
}

// Default value functions
fn default_source_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_source_fps() -> u32 {
    30
}
fn default_source_format() -> FrameFormat {
    FrameFormat::Yuv420
}
fn default_pool_size() -> usize {
    4
}
fn default_pattern() -> TestPattern {
    TestPattern::Gradient
}
fn default_level() -> u8 {
    128
}

fn default_summary_interval() -> u64 {
    30
}
