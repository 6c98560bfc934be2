use mime::Mime;
use std::sync::Arc;
use tracing::{debug, info};

use super::unit::DownloadUnit;
use crate::comic_info::PackagingService;
use crate::records::{ChapterRecord, MangaRecord};
use crate::sources::SourceRegistry;
use crate::storage::{ChapterProvider, ContentStream, ProgressFn, Result, StorageSelector};

/// A chapter archive ready to hand to a client
pub struct ArchiveDownload {
    pub stream: ContentStream,
    pub file_name: String,
    pub size: u64,
}

/// Drives chapter downloads and is the entry point for reading stored chapters
pub struct ChapterDownloader {
    selector: StorageSelector,
    registry: Arc<SourceRegistry>,
    packaging: Arc<PackagingService>,
}

impl ChapterDownloader {
    pub fn new(
        selector: StorageSelector,
        registry: Arc<SourceRegistry>,
        packaging: Arc<PackagingService>,
    ) -> Self {
        Self {
            selector,
            registry,
            packaging,
        }
    }

    pub fn provider_for(
        &self,
        manga: &MangaRecord,
        chapter: &ChapterRecord,
    ) -> Box<dyn ChapterProvider> {
        self.selector.provider_for(manga, chapter)
    }

    /// Download a chapter, then write its descriptor.
    ///
    /// Progress events from the provider reach `progress` unchanged. Pages
    /// written before a failure stay on disk, and calling this again with
    /// the same `unit` resumes from them.
    pub async fn download(
        &self,
        manga: &MangaRecord,
        chapter: &ChapterRecord,
        unit: &mut DownloadUnit,
        progress: &mut ProgressFn<'_>,
    ) -> bool {
        let provider = self.provider_for(manga, chapter);
        let source = self.registry.resolve(manga.source_id);
        debug!(
            chapter_id = chapter.id,
            source_id = source.id(),
            source = source.name(),
            "Starting chapter download"
        );

        if !provider.download(source.as_ref(), unit, progress).await {
            return false;
        }

        let mut packaged = chapter.clone();
        if packaged.page_count <= 0 {
            packaged.page_count = i32::try_from(unit.pages.len()).unwrap_or(i32::MAX);
        }
        self.packaging
            .write(&provider.artifact(), manga, &packaged)
            .await;
        true
    }

    /// Rewrite the descriptor of an already stored chapter
    pub async fn package(&self, manga: &MangaRecord, chapter: &ChapterRecord) {
        let provider = self.provider_for(manga, chapter);
        self.packaging
            .write(&provider.artifact(), manga, chapter)
            .await;
    }

    /// Follow a title change: move the manga's stored chapters to the new folder name
    pub async fn rename_manga(&self, manga: &MangaRecord, new_title: &str) -> Result<bool> {
        self.selector.layout().rename_manga_dir(manga, new_title).await
    }

    pub async fn get_image(
        &self,
        manga: &MangaRecord,
        chapter: &ChapterRecord,
        index: usize,
    ) -> Result<(ContentStream, Mime)> {
        self.provider_for(manga, chapter).get_image(index).await
    }

    pub async fn delete(&self, manga: &MangaRecord, chapter: &ChapterRecord) -> Result<bool> {
        let deleted = self.provider_for(manga, chapter).delete().await?;
        info!(manga_id = manga.id, chapter_id = chapter.id, deleted, "Deleted chapter");
        Ok(deleted)
    }

    pub async fn archive_stream(
        &self,
        manga: &MangaRecord,
        chapter: &ChapterRecord,
    ) -> Result<(ContentStream, u64)> {
        self.provider_for(manga, chapter).archive_stream().await
    }

    /// Chapter archive named after the archive file template
    pub async fn archive_for_download(
        &self,
        manga: &MangaRecord,
        chapter: &ChapterRecord,
    ) -> Result<ArchiveDownload> {
        let (stream, size) = self.archive_stream(manga, chapter).await?;
        Ok(ArchiveDownload {
            stream,
            file_name: self.selector.layout().archive_file_name(manga, chapter),
            size,
        })
    }
}
