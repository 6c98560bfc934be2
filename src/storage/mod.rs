//! On-disk chapter storage in two interchangeable representations.
//!
//! A chapter is kept either as an expanded folder of page images or as a
//! single `.cbz` archive. [`StorageSelector`] decides per call which one
//! applies; both satisfy the [`ChapterProvider`] contract.
//!
//! ## Key Components
//!
//! - [`ChapterProvider`] - Read a page, delete, download, stream as archive
//! - [`FolderProvider`] - Chapter as a directory of `NNN.<ext>` pages
//! - [`ArchiveProvider`] - Chapter as a packed `.cbz` next to the folder path
//! - [`StorageSelector`] - Picks the representation from disk state and config
//! - [`PathLayout`] - Canonical paths and folder name templates
//!
//! ## Example
//!
//! ```rust,ignore
//! let selector = StorageSelector::new(layout, config.downloads.download_as_cbz);
//! let provider = selector.provider_for(&manga, &chapter);
//! let (stream, mime) = provider.get_image(0).await?;
//! ```

mod archive;
mod folder;
mod layout;
pub mod pages;
mod selector;

use async_trait::async_trait;
use mime::Mime;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::{info, warn};

use crate::downloader::{DownloadState, DownloadUnit};
use crate::sources::{Source, SourceError};

pub use archive::{ArchiveProvider, pack_directory, replace_entry};
pub use folder::FolderProvider;
pub use layout::{
    ChapterPaths, PathLayout, chapter_variables, extract_title_suffix, extract_volume,
    format_template, pad_chapter_number, sanitize_file_name,
};
pub use selector::{Representation, StorageSelector};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Readable byte stream handed to callers
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

/// Progress callback: `(unit, finished)`
pub type ProgressFn<'a> = dyn FnMut(&DownloadUnit, bool) + Send + 'a;

/// The representation a chapter is stored in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Directory(PathBuf),
    Archive(PathBuf),
}

impl Artifact {
    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(path) | Self::Archive(path) => path,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive(_))
    }
}

/// Uniform access to one chapter's stored content
#[async_trait]
pub trait ChapterProvider: Send + Sync {
    /// The artifact this provider manages
    fn artifact(&self) -> Artifact;

    /// Open page `index` (0-based) together with its mime type
    async fn get_image(&self, index: usize) -> Result<(ContentStream, Mime)>;

    /// Remove the chapter; `false` when nothing existed
    async fn delete(&self) -> Result<bool>;

    /// Fetch every page through `source`.
    ///
    /// `progress(unit, false)` fires after each page and `progress(unit, true)`
    /// exactly once at the end, whether or not the download succeeded.
    async fn download(
        &self,
        source: &dyn Source,
        unit: &mut DownloadUnit,
        progress: &mut ProgressFn<'_>,
    ) -> bool;

    /// The chapter packed as an archive, with its exact size in bytes
    async fn archive_stream(&self) -> Result<(ContentStream, u64)>;
}

/// Settle a download attempt: record the final state and fire the completion callback
pub(crate) fn finish_download(
    unit: &mut DownloadUnit,
    progress: &mut ProgressFn<'_>,
    result: Result<()>,
) -> bool {
    let ok = match result {
        Ok(()) => {
            unit.state = DownloadState::Finished;
            info!(
                manga_id = unit.manga_id,
                chapter_id = unit.chapter_id,
                pages = unit.completed_pages,
                "Chapter downloaded"
            );
            true
        }
        Err(e) => {
            unit.state = DownloadState::Error;
            warn!(
                manga_id = unit.manga_id,
                chapter_id = unit.chapter_id,
                completed = unit.completed_pages,
                error = %e,
                "Chapter download failed"
            );
            false
        }
    };

    progress(&*unit, true);
    ok
}

/// Remove a directory tree, reporting whether it existed
pub(crate) async fn remove_dir_if_exists(path: &Path) -> Result<bool> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove a file, reporting whether it existed
pub(crate) async fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
