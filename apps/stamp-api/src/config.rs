//! Service configuration from command-line arguments and environment

use clap::Parser;
use stamp_core::{ConfigError, StampConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Default upload limit: 100 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(name = "stamp-api")]
#[command(version, about = "REST service that stamps signature images onto PDF documents")]
pub struct ServiceConfig {
    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    pub port: u16,

    /// SQLite connection string (defaults to a database inside the storage dir)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Directory holding uploaded and signed files
    #[arg(long, env = "STORAGE_DIR", default_value = "media")]
    pub storage_dir: PathBuf,

    /// Records and files older than this many days are deleted by the sweep
    #[arg(long, env = "RETENTION_DAYS", default_value = "3")]
    pub retention_days: u32,

    /// Seconds between background retention sweeps
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "3600")]
    pub sweep_interval_secs: u64,

    /// Stamp width in points
    #[arg(long, env = "STAMP_WIDTH", default_value = "150")]
    pub stamp_width: f64,

    /// Stamp height in points
    #[arg(long, env = "STAMP_HEIGHT", default_value = "75")]
    pub stamp_height: f64,

    /// Distance of the default stamp from the bottom-right corner, in points
    #[arg(long, env = "STAMP_MARGIN", default_value = "50")]
    pub stamp_margin: f64,

    /// Maximum size of an uploaded file in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// Run one retention sweep and exit
    #[arg(long)]
    pub sweep_once: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServiceConfig {
    pub fn stamp_config(&self) -> Result<StampConfig, ConfigError> {
        StampConfig::new(self.stamp_width, self.stamp_height, self.stamp_margin)
    }

    pub fn database_url(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            format!(
                "sqlite:{}?mode=rwc",
                self.storage_dir.join("stamp.db").display()
            )
        })
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
