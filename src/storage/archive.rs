use async_trait::async_trait;
use mime::Mime;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::pages::{fetch_pages, is_page_name, list_pages, mime_for_path, sort_pages, temp_sibling};
use super::{
    Artifact, ChapterProvider, ContentStream, ProgressFn, Result, StorageError, finish_download,
    remove_dir_if_exists, remove_file_if_exists,
};
use crate::comic_info::COMIC_INFO_FILE;
use crate::downloader::DownloadUnit;
use crate::records::ChapterRecord;
use crate::sources::Source;

const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Chapter stored as a single `.cbz` archive.
///
/// Pages are fetched into a staging folder under the cache root and packed
/// once the last page is on disk, so the archive path only ever holds a
/// complete archive.
pub struct ArchiveProvider {
    archive: PathBuf,
    staging: PathBuf,
    chapter: ChapterRecord,
}

impl ArchiveProvider {
    pub fn new(archive: PathBuf, staging: PathBuf, chapter: ChapterRecord) -> Self {
        Self {
            archive,
            staging,
            chapter,
        }
    }

    async fn fetch_and_pack(
        &self,
        source: &dyn Source,
        unit: &mut DownloadUnit,
        progress: &mut ProgressFn<'_>,
    ) -> Result<()> {
        fetch_pages(&self.staging, source, &self.chapter, unit, progress).await?;

        pack_directory(&self.staging, &self.archive).await?;
        remove_dir_if_exists(&self.staging).await?;
        Ok(())
    }
}

#[async_trait]
impl ChapterProvider for ArchiveProvider {
    fn artifact(&self) -> Artifact {
        Artifact::Archive(self.archive.clone())
    }

    async fn get_image(&self, index: usize) -> Result<(ContentStream, Mime)> {
        let archive = self.archive.clone();
        let (name, bytes) = tokio::task::spawn_blocking(move || read_page(&archive, index)).await??;

        Ok((Box::new(Cursor::new(bytes)), mime_for_path(Path::new(&name))))
    }

    async fn delete(&self) -> Result<bool> {
        let removed_archive = remove_file_if_exists(&self.archive).await?;
        let removed_staging = remove_dir_if_exists(&self.staging).await?;
        debug!(
            archive = %self.archive.display(),
            removed_archive,
            removed_staging,
            "Deleted chapter archive"
        );
        Ok(removed_archive || removed_staging)
    }

    async fn download(
        &self,
        source: &dyn Source,
        unit: &mut DownloadUnit,
        progress: &mut ProgressFn<'_>,
    ) -> bool {
        let result = self.fetch_and_pack(source, unit, progress).await;
        finish_download(unit, progress, result)
    }

    async fn archive_stream(&self) -> Result<(ContentStream, u64)> {
        let file = match tokio::fs::File::open(&self.archive).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(self.archive.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();
        Ok((Box::new(file), size))
    }
}

fn open_archive(path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StorageError::NotFound(path.display().to_string()),
        _ => e.into(),
    })?;
    Ok(ZipArchive::new(file)?)
}

/// Page entry names of an archive, in reading order
pub fn page_entries<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .filter(|name| {
            let base = name.rsplit('/').next().unwrap_or(name);
            is_page_name(base)
        })
        .map(str::to_string)
        .collect();
    sort_pages(&mut names, |name| name.rsplit('/').next().unwrap_or(name.as_str()));
    names
}

fn read_page(path: &Path, index: usize) -> Result<(String, Vec<u8>)> {
    let mut archive = open_archive(path)?;
    let name = page_entries(&archive)
        .into_iter()
        .nth(index)
        .ok_or_else(|| StorageError::NotFound(format!("page {} of {}", index, path.display())))?;

    let mut entry = archive.by_name(&name)?;
    let mut bytes = Vec::with_capacity(read_capacity(entry.size()));
    entry.read_to_end(&mut bytes)?;
    Ok((name, bytes))
}

/// Pre-allocation for an entry; the declared size comes from the archive header and is not trusted
fn read_capacity(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0)
}

fn write_entries<W: Write + Seek>(writer: W, files: &[PathBuf]) -> Result<W> {
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(writer);

    for path in files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        zip.start_file(name, options)?;
        let mut file = File::open(path)?;
        std::io::copy(&mut file, &mut zip)?;
    }

    Ok(zip.finish()?)
}

/// Pack files into an in-memory archive
pub(crate) fn pack_to_vec(files: &[PathBuf]) -> Result<Vec<u8>> {
    let cursor = write_entries(Cursor::new(Vec::new()), files)?;
    Ok(cursor.into_inner())
}

/// Pack the pages (and descriptor, if any) of `dir` into the archive at `dest`.
///
/// The archive is written to a sibling temp file and renamed into place.
pub async fn pack_directory(dir: &Path, dest: &Path) -> Result<u64> {
    let mut files = list_pages(dir).await?;
    let descriptor = dir.join(COMIC_INFO_FILE);
    if tokio::fs::try_exists(&descriptor).await? {
        files.push(descriptor);
    }
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_sibling(dest);
    let target = tmp.clone();
    let entries = files.len();
    let packed = tokio::task::spawn_blocking(move || -> Result<()> {
        let file = File::create(&target)?;
        write_entries(file, &files)?.sync_all()?;
        Ok(())
    })
    .await?;

    if let Err(e) = packed {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp, dest).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    let size = tokio::fs::metadata(dest).await?.len();
    info!(archive = %dest.display(), entries, size, "Packed chapter archive");
    Ok(size)
}

/// Replace (or add) the entry `name` of an existing archive.
///
/// Every other entry is copied over without recompression and the result is
/// swapped in through a temp file.
pub async fn replace_entry(archive: &Path, name: &str, bytes: Vec<u8>) -> Result<()> {
    let source = archive.to_path_buf();
    let tmp = temp_sibling(archive);
    let target = tmp.clone();
    let name = name.to_string();

    let rewritten = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut input = open_archive(&source)?;
        let mut zip = ZipWriter::new(File::create(&target)?);

        for i in 0..input.len() {
            let entry = input.by_index_raw(i)?;
            if entry.name() == name {
                continue;
            }
            zip.raw_copy_file(entry)?;
        }

        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&bytes)?;
        zip.finish()?.sync_all()?;
        Ok(())
    })
    .await?;

    if let Err(e) = rewritten {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    if let Err(e) = tokio::fs::rename(&tmp, archive).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn chapter() -> ChapterRecord {
        ChapterRecord {
            id: 1,
            manga_id: 1,
            url: "/c/1".to_string(),
            real_url: None,
            name: "Ch.1".to_string(),
            chapter_number: 1.0,
            scanlator: None,
            date_upload: 0,
            page_count: 0,
        }
    }

    async fn packed_fixture(temp_dir: &TempDir) -> PathBuf {
        let staging = temp_dir.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("001.jpg"), b"one").unwrap();
        std::fs::write(staging.join("002.png"), b"two").unwrap();
        std::fs::write(staging.join(COMIC_INFO_FILE), b"<old/>").unwrap();

        let archive = temp_dir.path().join("out/ch1.cbz");
        pack_directory(&staging, &archive).await.unwrap();
        archive
    }

    #[tokio::test]
    async fn test_pack_and_read_pages() {
        let temp_dir = TempDir::new().unwrap();
        let archive = packed_fixture(&temp_dir).await;
        let provider = ArchiveProvider::new(archive, temp_dir.path().join("staging"), chapter());

        let (mut stream, mime) = provider.get_image(1).await.unwrap();
        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"two");
        assert_eq!(mime, mime::IMAGE_PNG);

        // The descriptor is never a page
        assert!(matches!(provider.get_image(2).await, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_read_capacity_is_capped() {
        assert_eq!(read_capacity(512), 512);
        assert_eq!(read_capacity(u64::MAX), MAX_PREALLOC as usize);
    }

    #[tokio::test]
    async fn test_page_entries_skip_strays_and_order_numerically() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("mixed.cbz");
        {
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            let mut zip = ZipWriter::new(File::create(&path).unwrap());
            for (name, body) in [
                ("1000.jpg", "p1000"),
                ("000_readme.txt", "junk"),
                ("101.jpg", "p101"),
                (COMIC_INFO_FILE, "<ComicInfo/>"),
            ] {
                zip.start_file(name, options).unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }

        let zip = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(page_entries(&zip), vec!["101.jpg", "1000.jpg"]);

        let provider = ArchiveProvider::new(path, temp_dir.path().join("staging"), chapter());
        let (mut stream, mime) = provider.get_image(0).await.unwrap();
        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"p101");
        assert_eq!(mime, mime::IMAGE_JPEG);
    }

    #[tokio::test]
    async fn test_replace_entry_swaps_descriptor() {
        let temp_dir = TempDir::new().unwrap();
        let archive = packed_fixture(&temp_dir).await;

        replace_entry(&archive, COMIC_INFO_FILE, b"<new/>".to_vec()).await.unwrap();

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 3);
        let mut descriptor = String::new();
        zip.by_name(COMIC_INFO_FILE)
            .unwrap()
            .read_to_string(&mut descriptor)
            .unwrap();
        assert_eq!(descriptor, "<new/>");
        assert_eq!(page_entries(&zip), vec!["001.jpg", "002.png"]);
    }

    #[tokio::test]
    async fn test_archive_stream_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let archive = packed_fixture(&temp_dir).await;
        let provider =
            ArchiveProvider::new(archive.clone(), temp_dir.path().join("staging"), chapter());

        let (_, size) = provider.archive_stream().await.unwrap();
        assert_eq!(size, std::fs::metadata(&archive).unwrap().len());

        assert!(provider.delete().await.unwrap());
        assert!(!archive.exists());
        assert!(!provider.delete().await.unwrap());
        assert!(matches!(
            provider.archive_stream().await,
            Err(StorageError::NotFound(_))
        ));
    }
}
