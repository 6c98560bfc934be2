//! Page file naming, image typing and the shared page download loop

use mime::Mime;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use super::{ProgressFn, Result, StorageError};
use crate::downloader::{DownloadState, DownloadUnit};
use crate::records::ChapterRecord;
use crate::sources::{PageImage, Source, SourceError};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif"];
const TEMP_SUFFIX: &str = ".tmp";

/// File stem of the page at `position` (0-based): `001`, `002`, ...
pub fn page_stem(position: usize) -> String {
    format!("{:03}", position + 1)
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Whether an entry name is a finished page image (not the descriptor, not a temp file)
pub fn is_page_name(name: &str) -> bool {
    !name.starts_with('.') && is_image_file(Path::new(name))
}

/// Leading page number of a file name, then the name itself
fn page_order_key(name: &str) -> (u64, &str) {
    let digits = name.len() - name.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let number = name[..digits].parse().unwrap_or(u64::MAX);
    (number, name)
}

/// Sort pages into reading order by their numeric stem, so `1000.jpg` follows `999.jpg`
pub fn sort_pages<T>(pages: &mut [T], name_of: impl Fn(&T) -> &str) {
    pages.sort_by(|a, b| page_order_key(name_of(a)).cmp(&page_order_key(name_of(b))));
}

pub fn mime_for_path(path: &Path) -> Mime {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        "webp" | "avif" => format!("image/{ext}")
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Pick a file extension from the reported content type, then magic bytes
pub fn extension_for(image: &PageImage) -> &'static str {
    let declared = image
        .content_type
        .as_deref()
        .and_then(|ct| ct.parse::<Mime>().ok())
        .filter(|m| m.type_() == mime::IMAGE)
        .and_then(|m| match m.subtype().as_str() {
            "jpeg" | "jpg" => Some("jpg"),
            "png" => Some("png"),
            "gif" => Some("gif"),
            "webp" => Some("webp"),
            "avif" => Some("avif"),
            _ => None,
        });

    declared.unwrap_or_else(|| sniff_extension(&image.bytes))
}

fn sniff_extension(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "jpg"
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "png"
    } else if bytes.starts_with(b"GIF8") {
        "gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "webp"
    } else if bytes.len() >= 12 && &bytes[4..12] == b"ftypavif" {
        "avif"
    } else {
        "jpg"
    }
}

/// Write through a sibling temp file and rename into place
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StorageError::NotFound(path.display().to_string()))?;
    let tmp = path.with_file_name(format!(".{}.{}{}", file_name, Uuid::new_v4(), TEMP_SUFFIX));

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

/// Sibling temp path used when replacing `path` wholesale
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}{}", Uuid::new_v4(), TEMP_SUFFIX));
    path.with_file_name(name)
}

/// Finished page files of a chapter folder, in reading order
pub async fn list_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::NotFound(dir.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let mut pages = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if is_page_name(&name.to_string_lossy()) {
            pages.push(entry.path());
        }
    }
    sort_pages(&mut pages, |p| p.file_name().and_then(|n| n.to_str()).unwrap_or_default());
    Ok(pages)
}

async fn existing_stems(dir: &Path) -> Result<HashSet<String>> {
    let pages = match list_pages(dir).await {
        Ok(pages) => pages,
        Err(StorageError::NotFound(_)) => return Ok(HashSet::new()),
        Err(e) => return Err(e),
    };

    Ok(pages
        .iter()
        .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .collect())
}

/// Fetch every page of `unit` into `dir`, reporting progress after each one.
///
/// Pages already present in `dir` are kept, so a retry resumes where the
/// previous attempt stopped. The final completion callback is left to the
/// caller.
pub async fn fetch_pages(
    dir: &Path,
    source: &dyn Source,
    chapter: &ChapterRecord,
    unit: &mut DownloadUnit,
    progress: &mut ProgressFn<'_>,
) -> Result<()> {
    if !source.is_available() {
        return Err(SourceError::Unavailable(source.id()).into());
    }

    unit.state = DownloadState::Downloading;
    if unit.pages.is_empty() {
        unit.pages = source.page_list(chapter).await?;
    }

    tokio::fs::create_dir_all(dir).await?;
    let existing = existing_stems(dir).await?;
    unit.completed_pages = 0;

    for position in 0..unit.pages.len() {
        let stem = page_stem(position);
        if existing.contains(&stem) {
            debug!(chapter_id = unit.chapter_id, page = position + 1, "Page already on disk");
        } else {
            if unit.pages[position].image_url.is_none() {
                let url = source.image_url(&unit.pages[position]).await?;
                unit.pages[position].image_url = Some(url);
            }
            let image = source.fetch_image(&unit.pages[position]).await?;
            let file = dir.join(format!("{}.{}", stem, extension_for(&image)));
            write_atomic(&file, &image.bytes).await?;
        }

        unit.completed_pages = position + 1;
        progress(&*unit, false);
    }

    info!(
        manga_id = unit.manga_id,
        chapter_id = unit.chapter_id,
        pages = unit.pages.len(),
        "Fetched chapter pages"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comic_info::COMIC_INFO_FILE;
    use crate::sources::Page;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn image(bytes: &'static [u8], content_type: Option<&str>) -> PageImage {
        PageImage {
            bytes: bytes::Bytes::from_static(bytes),
            content_type: content_type.map(str::to_string),
        }
    }

    #[test]
    fn test_page_stem_is_one_based() {
        assert_eq!(page_stem(0), "001");
        assert_eq!(page_stem(41), "042");
    }

    #[test]
    fn test_extension_prefers_declared_type() {
        assert_eq!(extension_for(&image(b"\x89PNG\r\n\x1a\n", Some("image/webp"))), "webp");
        assert_eq!(extension_for(&image(b"\x89PNG\r\n\x1a\n", Some("text/html"))), "png");
        assert_eq!(extension_for(&image(b"GIF89a", None)), "gif");
        assert_eq!(extension_for(&image(b"RIFF\0\0\0\0WEBPVP8 ", None)), "webp");
        assert_eq!(extension_for(&image(b"unknown", None)), "jpg");
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("001.JPG")), mime::IMAGE_JPEG);
        assert_eq!(mime_for_path(Path::new("002.webp")).essence_str(), "image/webp");
        assert_eq!(mime_for_path(Path::new("ComicInfo.xml")), mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn test_page_name_filter() {
        assert!(is_page_name("001.jpg"));
        assert!(!is_page_name("ComicInfo.xml"));
        assert!(!is_page_name(".001.jpg.abc.tmp"));
        assert!(!is_page_name("000_readme.txt"));
        assert!(!is_page_name("Thumbs.db"));
    }

    #[test]
    fn test_pages_sort_by_number() {
        let mut names = vec!["1000.jpg", "101.jpg", "999.png", "001.jpg", "cover.jpg"];
        sort_pages(&mut names, |n| *n);
        assert_eq!(names, vec!["001.jpg", "101.jpg", "999.png", "1000.jpg", "cover.jpg"]);
    }

    #[tokio::test]
    async fn test_list_skips_stray_files_and_orders_past_999() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["1000.jpg", "101.jpg", "000_readme.txt", "notes.md"] {
            tokio::fs::write(temp_dir.path().join(name), b"x").await.unwrap();
        }

        let pages = list_pages(temp_dir.path()).await.unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["101.jpg", "1000.jpg"]);
    }

    /// Backend whose pages only know their reader URL until resolved
    struct ResolvingSource {
        resolved: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl Source for ResolvingSource {
        fn id(&self) -> crate::sources::SourceId {
            9
        }

        fn name(&self) -> &str {
            "Resolving"
        }

        async fn page_list(&self, _chapter: &ChapterRecord) -> std::result::Result<Vec<Page>, SourceError> {
            let mut direct = Page::new(1, "https://reader.test/p/1");
            direct.image_url = Some("https://cdn.test/direct.png".to_string());
            Ok(vec![Page::new(0, "https://reader.test/p/0"), direct])
        }

        async fn image_url(&self, page: &Page) -> std::result::Result<String, SourceError> {
            self.resolved.lock().unwrap().push(page.index);
            Ok(format!("https://cdn.test/{}.png", page.index))
        }

        async fn fetch_image(&self, page: &Page) -> std::result::Result<PageImage, SourceError> {
            let Some(url) = page.image_url.as_deref() else {
                return Err(SourceError::Fetch {
                    index: page.index,
                    reason: "image location not resolved".to_string(),
                });
            };
            assert!(url.starts_with("https://cdn.test/"));
            Ok(image(b"\x89PNG\r\n\x1a\n", Some("image/png")))
        }
    }

    #[tokio::test]
    async fn test_fetch_resolves_image_locations() {
        let temp_dir = TempDir::new().unwrap();
        let source = ResolvingSource {
            resolved: Mutex::new(Vec::new()),
        };
        let chapter = ChapterRecord {
            id: 5,
            manga_id: 1,
            url: "/c/5".to_string(),
            real_url: None,
            name: "Ch.5".to_string(),
            chapter_number: 5.0,
            scanlator: None,
            date_upload: 0,
            page_count: 0,
        };
        let mut unit = DownloadUnit::for_chapter(&chapter);
        let mut progress = |_: &DownloadUnit, _: bool| {};

        fetch_pages(temp_dir.path(), &source, &chapter, &mut unit, &mut progress)
            .await
            .unwrap();

        // Only the page without a known image location is resolved
        assert_eq!(*source.resolved.lock().unwrap(), vec![0]);
        assert_eq!(unit.pages[0].image_url.as_deref(), Some("https://cdn.test/0.png"));
        assert!(temp_dir.path().join("001.png").is_file());
        assert!(temp_dir.path().join("002.png").is_file());
    }

    #[tokio::test]
    async fn test_write_atomic_and_list() {
        let temp_dir = TempDir::new().unwrap();
        write_atomic(&temp_dir.path().join("002.png"), b"two").await.unwrap();
        write_atomic(&temp_dir.path().join("001.jpg"), b"one").await.unwrap();
        tokio::fs::write(temp_dir.path().join(COMIC_INFO_FILE), b"<x/>").await.unwrap();

        let pages = list_pages(temp_dir.path()).await.unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["001.jpg", "002.png"]);
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = list_pages(&temp_dir.path().join("missing")).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
