//! Construction-time stamp configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_STAMP_WIDTH: f64 = 150.0;
pub const DEFAULT_STAMP_HEIGHT: f64 = 75.0;
pub const DEFAULT_MARGIN: f64 = 50.0;

/// Size of the stamp and its distance from the page edge, in PDF points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampConfig {
    #[serde(default = "default_stamp_width")]
    pub stamp_width: f64,
    #[serde(default = "default_stamp_height")]
    pub stamp_height: f64,
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// When set, serialization goes through a transient file in this
    /// directory instead of staying in memory.
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
}

fn default_stamp_width() -> f64 {
    DEFAULT_STAMP_WIDTH
}

fn default_stamp_height() -> f64 {
    DEFAULT_STAMP_HEIGHT
}

fn default_margin() -> f64 {
    DEFAULT_MARGIN
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            stamp_width: DEFAULT_STAMP_WIDTH,
            stamp_height: DEFAULT_STAMP_HEIGHT,
            margin: DEFAULT_MARGIN,
            spool_dir: None,
        }
    }
}

impl StampConfig {
    pub fn new(stamp_width: f64, stamp_height: f64, margin: f64) -> Result<Self, ConfigError> {
        let config = Self {
            stamp_width,
            stamp_height,
            margin,
            spool_dir: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.stamp_width.is_finite() && self.stamp_width > 0.0) {
            return Err(ConfigError::NonPositive("width"));
        }
        if !(self.stamp_height.is_finite() && self.stamp_height > 0.0) {
            return Err(ConfigError::NonPositive("height"));
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(ConfigError::InvalidMargin);
        }
        Ok(())
    }
}
