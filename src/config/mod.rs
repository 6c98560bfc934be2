//! Configuration management for chaptervault
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use chaptervault::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Downloads go to: {}", config.paths.downloads_root.display());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `CHAPTERVAULT__<section>__<key>`
//!
//! Examples:
//! - `CHAPTERVAULT__DOWNLOADS__DOWNLOAD_AS_CBZ=true`
//! - `CHAPTERVAULT__PATHS__DOWNLOADS_ROOT=/srv/manga`
//! - `CHAPTERVAULT__METADATA__USE_ANILIST=false`
//!
//! The AniList access token is only read from `ANILIST_TOKEN`.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/chaptervault.toml`.
//! This can be overridden using the `CHAPTERVAULT_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use models::{Config, ContentType, DownloadsConfig, HttpSettings, MetadataConfig, PathsConfig};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(sources::config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
