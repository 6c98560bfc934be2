use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::COMIC_INFO_FILE;
use super::document::ComicInfo;
use super::metadata::SeriesMetadata;
use crate::config::{ContentType, MetadataConfig};
use crate::metadata::MetadataEnricher;
use crate::records::{ChapterRecord, MangaRecord};
use crate::storage::pages::write_atomic;
use crate::storage::{Artifact, Result, StorageError, replace_entry};

/// Writes `ComicInfo.xml` into stored chapters
pub struct PackagingService {
    enricher: Option<Arc<MetadataEnricher>>,
    use_anilist: bool,
    content_type: ContentType,
}

impl PackagingService {
    pub fn new(config: &MetadataConfig, enricher: Option<Arc<MetadataEnricher>>) -> Self {
        Self {
            enricher,
            use_anilist: config.use_anilist,
            content_type: config.content_type,
        }
    }

    /// Packaging without any external lookup
    pub fn plain(content_type: ContentType) -> Self {
        Self {
            enricher: None,
            use_anilist: false,
            content_type,
        }
    }

    fn enricher(&self) -> Option<&MetadataEnricher> {
        if !self.use_anilist || self.content_type == ContentType::Comic {
            return None;
        }
        self.enricher.as_deref()
    }

    pub fn plain_descriptor(&self, manga: &MangaRecord, chapter: &ChapterRecord) -> ComicInfo {
        let meta = SeriesMetadata::from_records(manga, chapter, self.content_type);
        ComicInfo::build(&meta, chapter)
    }

    /// Descriptor with AniList data merged in when enrichment applies
    pub async fn descriptor(&self, manga: &MangaRecord, chapter: &ChapterRecord) -> ComicInfo {
        let mut meta = SeriesMetadata::from_records(manga, chapter, self.content_type);
        if let Some(enricher) = self.enricher() {
            let enrichment = enricher.find_match(&manga.url, &manga.title).await;
            if let Some(confidence) = enrichment.confidence() {
                info!(
                    manga_id = manga.id,
                    confidence = confidence.as_str(),
                    "Enriching descriptor with AniList data"
                );
            }
            meta.apply(&enrichment);
        }
        ComicInfo::build(&meta, chapter)
    }

    /// Write the descriptor into `artifact`.
    ///
    /// Never fails: an error on the enriched path falls back to the plain
    /// descriptor, and a failure there is only logged.
    pub async fn write(&self, artifact: &Artifact, manga: &MangaRecord, chapter: &ChapterRecord) {
        if self.enricher().is_some() {
            let info = self.descriptor(manga, chapter).await;
            match write_descriptor(artifact, &info).await {
                Ok(()) => {
                    debug!(path = %artifact.path().display(), "Wrote enriched descriptor");
                    return;
                }
                Err(e) => {
                    warn!(path = %artifact.path().display(), error = %e, "Enriched descriptor failed, falling back");
                }
            }
        }

        let info = self.plain_descriptor(manga, chapter);
        match write_descriptor(artifact, &info).await {
            Ok(()) => debug!(path = %artifact.path().display(), "Wrote descriptor"),
            Err(e) => error!(path = %artifact.path().display(), error = %e, "Could not write descriptor"),
        }
    }
}

async fn write_descriptor(artifact: &Artifact, info: &ComicInfo) -> Result<()> {
    let xml = info.to_xml().into_bytes();
    match artifact {
        Artifact::Directory(dir) => {
            if !tokio::fs::try_exists(dir).await? {
                return Err(StorageError::NotFound(dir.display().to_string()));
            }
            write_atomic(&dir.join(COMIC_INFO_FILE), &xml).await
        }
        Artifact::Archive(path) => replace_entry(path, COMIC_INFO_FILE, xml).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MangaStatus;
    use tempfile::TempDir;

    fn manga() -> MangaRecord {
        MangaRecord {
            id: 1,
            source_id: 1,
            title: "Frieren".to_string(),
            url: String::new(),
            description: None,
            author: Some("Kanehito Yamada".to_string()),
            artist: None,
            genre: None,
            status: MangaStatus::Ongoing,
            categories: Vec::new(),
        }
    }

    fn chapter(number: f32) -> ChapterRecord {
        ChapterRecord {
            id: 2,
            manga_id: 1,
            url: "/c/2".to_string(),
            real_url: Some("https://example.org/c/2".to_string()),
            name: "Ch.5".to_string(),
            chapter_number: number,
            scanlator: Some("Group".to_string()),
            date_upload: 1_700_000_000_000,
            page_count: 18,
        }
    }

    #[tokio::test]
    async fn test_write_into_directory() {
        let temp_dir = TempDir::new().unwrap();
        let service = PackagingService::plain(ContentType::Manga);

        service
            .write(&Artifact::Directory(temp_dir.path().to_path_buf()), &manga(), &chapter(5.0))
            .await;

        let xml = std::fs::read_to_string(temp_dir.path().join(COMIC_INFO_FILE)).unwrap();
        assert!(xml.contains("<Number>5</Number>"));
        assert!(xml.contains("<Writer>Kanehito Yamada</Writer>"));
        assert!(xml.contains("<ScanInformation>Released by Group</ScanInformation>"));
        assert!(xml.contains("<Web>https://example.org/c/2</Web>"));
        assert!(xml.contains("<Year>2023</Year>"));
        assert!(xml.contains("<PageCount>18</PageCount>"));
    }

    #[test]
    fn test_number_rendering() {
        let service = PackagingService::plain(ContentType::Manga);
        assert_eq!(service.plain_descriptor(&manga(), &chapter(5.5)).number.as_deref(), Some("5.5"));
        assert_eq!(service.plain_descriptor(&manga(), &chapter(-1.0)).number, None);
    }

    #[tokio::test]
    async fn test_missing_artifact_does_not_panic() {
        let temp_dir = TempDir::new().unwrap();
        let service = PackagingService::plain(ContentType::Manga);
        let missing = Artifact::Archive(temp_dir.path().join("missing.cbz"));

        service.write(&missing, &manga(), &chapter(1.0)).await;
        assert!(!temp_dir.path().join("missing.cbz").exists());
    }
}
