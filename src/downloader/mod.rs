//! Chapter download orchestration.
//!
//! [`ChapterDownloader`] picks the storage provider for a chapter, resolves
//! its source backend, runs the download with progress reporting and then
//! packages the descriptor into the finished artifact.

mod runner;
mod unit;

pub use runner::{ArchiveDownload, ChapterDownloader};
pub use unit::{DownloadState, DownloadUnit};
