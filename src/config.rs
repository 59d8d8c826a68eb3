//! Configuration module for vidstash.

use serde::Deserialize;
use std::path::Path;

use crate::upload::DEFAULT_PARALLEL_LIMIT;
use crate::{Result, VideoError};

/// Remote drive configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Folder under the drive root that holds one folder per owner.
    #[serde(default = "default_app_root")]
    pub app_root: String,
    /// Well-known identifier of the drive root.
    #[serde(default = "default_root_id")]
    pub root_id: String,
    /// Media type declared for stored videos.
    #[serde(default = "default_media_type")]
    pub media_type: String,
    /// Local directory where downloads are staged before being streamed.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
    /// Page size used when listing an owner's videos.
    #[serde(default = "default_list_page_size")]
    pub list_page_size: usize,
}

fn default_app_root() -> String {
    "VideosApp".to_string()
}

fn default_root_id() -> String {
    "root".to_string()
}

fn default_media_type() -> String {
    "video/mp4".to_string()
}

fn default_staging_dir() -> String {
    "data/staging".to_string()
}

fn default_list_page_size() -> usize {
    1000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            app_root: default_app_root(),
            root_id: default_root_id(),
            media_type: default_media_type(),
            staging_dir: default_staging_dir(),
            list_page_size: default_list_page_size(),
        }
    }
}

/// Upload admission configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum number of uploads a single owner may have in flight.
    #[serde(default = "default_parallel_limit")]
    pub parallel_limit: usize,
    /// Number of transfers that may run at the same time across all owners.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_parallel_limit() -> usize {
    DEFAULT_PARALLEL_LIMIT
}

fn default_workers() -> usize {
    16
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            parallel_limit: default_parallel_limit(),
            workers: default_workers(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/vidstash.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Remote drive configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload admission configuration.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(VideoError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| VideoError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `VIDSTASH_STAGING_DIR`: Override the download staging directory
    pub fn apply_env_overrides(&mut self) {
        if let Ok(staging_dir) = std::env::var("VIDSTASH_STAGING_DIR") {
            if !staging_dir.is_empty() {
                self.storage.staging_dir = staging_dir;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.upload.parallel_limit == 0 {
            return Err(VideoError::Config(
                "upload.parallel_limit must be at least 1".to_string(),
            ));
        }
        if self.upload.workers == 0 {
            return Err(VideoError::Config(
                "upload.workers must be at least 1".to_string(),
            ));
        }
        if self.storage.list_page_size == 0 {
            return Err(VideoError::Config(
                "storage.list_page_size must be at least 1".to_string(),
            ));
        }
        if self.storage.app_root.is_empty() || self.storage.root_id.is_empty() {
            return Err(VideoError::Config(
                "storage.app_root and storage.root_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
