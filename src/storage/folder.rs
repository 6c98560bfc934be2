use async_trait::async_trait;
use mime::Mime;
use std::path::PathBuf;
use tracing::debug;

use super::archive::pack_to_vec;
use super::pages::{fetch_pages, list_pages, mime_for_path};
use super::{
    Artifact, ChapterProvider, ContentStream, ProgressFn, Result, StorageError, finish_download,
    remove_dir_if_exists,
};
use crate::comic_info::COMIC_INFO_FILE;
use crate::downloader::DownloadUnit;
use crate::records::ChapterRecord;
use crate::sources::Source;

/// Chapter stored as a directory of page images
pub struct FolderProvider {
    directory: PathBuf,
    chapter: ChapterRecord,
}

impl FolderProvider {
    pub fn new(directory: PathBuf, chapter: ChapterRecord) -> Self {
        Self { directory, chapter }
    }
}

#[async_trait]
impl ChapterProvider for FolderProvider {
    fn artifact(&self) -> Artifact {
        Artifact::Directory(self.directory.clone())
    }

    async fn get_image(&self, index: usize) -> Result<(ContentStream, Mime)> {
        let pages = list_pages(&self.directory).await?;
        let path = pages.get(index).ok_or_else(|| {
            StorageError::NotFound(format!("page {} of {}", index, self.directory.display()))
        })?;

        let file = tokio::fs::File::open(path).await?;
        Ok((Box::new(file), mime_for_path(path)))
    }

    async fn delete(&self) -> Result<bool> {
        let existed = remove_dir_if_exists(&self.directory).await?;
        debug!(dir = %self.directory.display(), existed, "Deleted chapter folder");
        Ok(existed)
    }

    async fn download(
        &self,
        source: &dyn Source,
        unit: &mut DownloadUnit,
        progress: &mut ProgressFn<'_>,
    ) -> bool {
        let result = fetch_pages(&self.directory, source, &self.chapter, unit, progress).await;
        finish_download(unit, progress, result)
    }

    async fn archive_stream(&self) -> Result<(ContentStream, u64)> {
        let mut files = list_pages(&self.directory).await?;
        let descriptor = self.directory.join(COMIC_INFO_FILE);
        if tokio::fs::try_exists(&descriptor).await? {
            files.push(descriptor);
        }

        let bytes = tokio::task::spawn_blocking(move || pack_to_vec(&files)).await??;
        let size = bytes.len() as u64;
        Ok((Box::new(std::io::Cursor::new(bytes)), size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn chapter() -> ChapterRecord {
        ChapterRecord {
            id: 7,
            manga_id: 3,
            url: "/c/7".to_string(),
            real_url: None,
            name: "Ch.7".to_string(),
            chapter_number: 7.0,
            scanlator: None,
            date_upload: 0,
            page_count: 0,
        }
    }

    #[tokio::test]
    async fn test_get_image_by_index() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("ch7");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("002.png"), b"second").unwrap();
        std::fs::write(dir.join("001.jpg"), b"first").unwrap();
        std::fs::write(dir.join(COMIC_INFO_FILE), b"<ComicInfo/>").unwrap();

        let provider = FolderProvider::new(dir, chapter());

        let (mut stream, mime) = provider.get_image(1).await.unwrap();
        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"second");
        assert_eq!(mime, mime::IMAGE_PNG);

        assert!(matches!(provider.get_image(2).await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_image_ignores_strays_and_orders_numerically() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("long");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("1000.jpg"), b"p1000").unwrap();
        std::fs::write(dir.join("101.jpg"), b"p101").unwrap();
        std::fs::write(dir.join("000_readme.txt"), b"junk").unwrap();

        let provider = FolderProvider::new(dir, chapter());

        let (mut stream, mime) = provider.get_image(0).await.unwrap();
        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"p101");
        assert_eq!(mime, mime::IMAGE_JPEG);

        let (mut stream, _) = provider.get_image(1).await.unwrap();
        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"p1000");

        assert!(matches!(provider.get_image(2).await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("ch7");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("001.jpg"), b"x").unwrap();

        let provider = FolderProvider::new(dir.clone(), chapter());
        assert!(provider.delete().await.unwrap());
        assert!(!dir.exists());
        assert!(!provider.delete().await.unwrap());
    }

    #[tokio::test]
    async fn test_archive_stream_size_is_exact() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("ch7");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("001.jpg"), b"page one").unwrap();
        std::fs::write(dir.join(COMIC_INFO_FILE), b"<ComicInfo/>").unwrap();

        let provider = FolderProvider::new(dir.clone(), chapter());
        let (mut stream, size) = provider.archive_stream().await.unwrap();
        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();

        assert_eq!(body.len() as u64, size);
        let archive = zip::ZipArchive::new(std::io::Cursor::new(body)).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["001.jpg", COMIC_INFO_FILE]);
        // Packing on the fly never persists an archive
        assert!(!temp_dir.path().join("ch7.cbz").exists());
    }
}
