use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::traits::{LOCAL_SOURCE_ID, Page, PageImage, Source, SourceError, SourceId};
use crate::records::ChapterRecord;
use crate::storage::pages::{is_image_file, mime_for_path, sort_pages};

/// Backend serving chapters stored as image folders under a local root.
///
/// A chapter's `url` is the folder path relative to the root.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Source for LocalSource {
    fn id(&self) -> SourceId {
        LOCAL_SOURCE_ID
    }

    fn name(&self) -> &str {
        "Local source"
    }

    async fn page_list(&self, chapter: &ChapterRecord) -> Result<Vec<Page>, SourceError> {
        let dir = self.root.join(chapter.url.trim_start_matches('/'));
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| SourceError::PageList(format!("{}: {}", dir.display(), e)))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && is_image_file(&path) {
                files.push(path);
            }
        }
        sort_pages(&mut files, |p| p.file_name().and_then(|n| n.to_str()).unwrap_or_default());

        debug!(dir = %dir.display(), pages = files.len(), "Listed local chapter");

        Ok(files
            .into_iter()
            .enumerate()
            .map(|(index, path)| Page::new(index, path.to_string_lossy()))
            .collect())
    }

    async fn fetch_image(&self, page: &Page) -> Result<PageImage, SourceError> {
        let path = PathBuf::from(&page.url);
        let bytes = tokio::fs::read(&path).await.map_err(|e| SourceError::Fetch {
            index: page.index,
            reason: e.to_string(),
        })?;

        Ok(PageImage {
            bytes: bytes.into(),
            content_type: Some(mime_for_path(&path).to_string()),
        })
    }
}
