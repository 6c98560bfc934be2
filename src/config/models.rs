use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::metadata::{ANILIST_ENDPOINT, UncertainAction};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub http: HttpSettings,
}

/// Filesystem roots
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_downloads_root")]
    pub downloads_root: PathBuf,
    /// Staging area for archive downloads
    #[serde(default = "default_cache_root")]
    pub cache_root: PathBuf,
    /// Token and metadata cache files
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
    #[serde(default = "default_local_source_root")]
    pub local_source_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            downloads_root: default_downloads_root(),
            cache_root: default_cache_root(),
            data_root: default_data_root(),
            local_source_root: default_local_source_root(),
        }
    }
}

fn default_downloads_root() -> PathBuf {
    PathBuf::from("data/downloads")
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("data/cache/downloads")
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_local_source_root() -> PathBuf {
    PathBuf::from("data/local")
}

/// Download layout and representation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadsConfig {
    /// New chapters are packed as `.cbz` instead of kept as folders
    #[serde(default)]
    pub download_as_cbz: bool,
    #[serde(default = "default_manga_folder_format")]
    pub manga_folder_format: String,
    #[serde(default = "default_chapter_folder_format")]
    pub chapter_folder_format: String,
    /// File name (without `.cbz`) offered when exporting an archive
    #[serde(default = "default_cbz_file_format")]
    pub cbz_file_format: String,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            download_as_cbz: false,
            manga_folder_format: default_manga_folder_format(),
            chapter_folder_format: default_chapter_folder_format(),
            cbz_file_format: default_cbz_file_format(),
        }
    }
}

fn default_manga_folder_format() -> String {
    "{title}".to_string()
}

fn default_chapter_folder_format() -> String {
    "{scanlator}{name}".to_string()
}

fn default_cbz_file_format() -> String {
    "{title} {volume_prefix}Ch.{number_padded3}".to_string()
}

/// Kind of content in the library; western comics never query AniList
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Manga,
    Manhwa,
    Manhua,
    Webtoon,
    Comic,
}

impl ContentType {
    pub fn right_to_left_by_default(&self) -> bool {
        matches!(self, Self::Manga)
    }
}

/// AniList enrichment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataConfig {
    #[serde(default = "default_true")]
    pub use_anilist: bool,
    #[serde(default)]
    pub content_type: ContentType,
    /// `skip` drops unverified title matches; anything else keeps them
    #[serde(default = "default_uncertain_action")]
    pub default_uncertain_action: String,
    #[serde(default = "default_cache_retention_days")]
    pub cache_retention_days: u32,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// AniList access token (loaded from environment, not from config file)
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            use_anilist: true,
            content_type: ContentType::default(),
            default_uncertain_action: default_uncertain_action(),
            cache_retention_days: default_cache_retention_days(),
            endpoint: default_endpoint(),
            token: None,
        }
    }
}

impl MetadataConfig {
    pub fn uncertain_action(&self) -> UncertainAction {
        UncertainAction::parse(&self.default_uncertain_action)
    }
}

fn default_true() -> bool {
    true
}

fn default_uncertain_action() -> String {
    "use".to_string()
}

fn default_cache_retention_days() -> u32 {
    30
}

fn default_endpoint() -> String {
    ANILIST_ENDPOINT.to_string()
}

/// Outbound HTTP settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("chaptervault/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.downloads.download_as_cbz);
        assert_eq!(config.downloads.chapter_folder_format, "{scanlator}{name}");
        assert!(config.metadata.use_anilist);
        assert_eq!(config.metadata.cache_retention_days, 30);
        assert_eq!(config.metadata.uncertain_action(), UncertainAction::Use);
        assert_eq!(config.http.max_retries, 3);
    }

    #[test]
    fn test_content_type_reading_direction() {
        assert!(ContentType::Manga.right_to_left_by_default());
        assert!(!ContentType::Manhwa.right_to_left_by_default());
        assert!(!ContentType::Comic.right_to_left_by_default());
    }
}
