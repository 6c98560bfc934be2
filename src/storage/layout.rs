//! Canonical on-disk locations of chapters and the folder name templates

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use tracing::info;

use super::Result;
use crate::config::{DownloadsConfig, PathsConfig};
use crate::records::{ChapterRecord, MangaRecord, format_chapter_number};
use crate::sources::SourceRegistry;

const MAX_NAME_BYTES: usize = 240;
const INVALID_NAME: &str = "(invalid)";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z0-9_]+)\}").expect("valid placeholder regex"));

static VOLUME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)vol\.?\s*([0-9]+)").expect("valid volume regex"));

/// Where a chapter lives in each representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPaths {
    /// Expanded folder of pages
    pub directory: PathBuf,
    /// Packed archive (`<directory>.cbz`)
    pub archive: PathBuf,
    /// Scratch folder pages are fetched into before packing
    pub staging: PathBuf,
}

/// Resolves chapter paths from records and the configured templates
#[derive(Clone)]
pub struct PathLayout {
    downloads_root: PathBuf,
    cache_root: PathBuf,
    manga_format: String,
    chapter_format: String,
    archive_format: String,
    registry: Arc<SourceRegistry>,
}

impl PathLayout {
    pub fn new(paths: &PathsConfig, downloads: &DownloadsConfig, registry: Arc<SourceRegistry>) -> Self {
        Self {
            downloads_root: paths.downloads_root.clone(),
            cache_root: paths.cache_root.clone(),
            manga_format: downloads.manga_folder_format.clone(),
            chapter_format: downloads.chapter_folder_format.clone(),
            archive_format: downloads.cbz_file_format.clone(),
            registry,
        }
    }

    pub fn downloads_root(&self) -> &Path {
        &self.downloads_root
    }

    pub fn manga_dir(&self, manga: &MangaRecord) -> String {
        let mut variables = BTreeMap::new();
        variables.insert("title", manga.title.clone());
        // Resolving the backend is only worth it when the template asks for it
        if self.manga_format.contains("{source}") {
            let source = self.registry.resolve(manga.source_id);
            variables.insert("source", sanitize_file_name(source.name()));
        }
        format_template(&self.manga_format, &variables)
    }

    pub fn chapter_dir(&self, manga: &MangaRecord, chapter: &ChapterRecord) -> String {
        format_template(&self.chapter_format, &chapter_variables(manga, chapter))
    }

    pub fn chapter_paths(&self, manga: &MangaRecord, chapter: &ChapterRecord) -> ChapterPaths {
        let manga_dir = self.manga_dir(manga);
        let chapter_dir = self.chapter_dir(manga, chapter);

        let directory = self.downloads_root.join(&manga_dir).join(&chapter_dir);
        ChapterPaths {
            archive: with_archive_suffix(&directory),
            directory,
            staging: self.cache_root.join(&manga_dir).join(&chapter_dir),
        }
    }

    /// File name offered to clients exporting a chapter archive
    pub fn archive_file_name(&self, manga: &MangaRecord, chapter: &ChapterRecord) -> String {
        format!(
            "{}.cbz",
            format_template(&self.archive_format, &chapter_variables(manga, chapter))
        )
    }

    /// Move the folders of `manga` to the name `new_title` resolves to.
    ///
    /// Downloads and staged pages are moved separately. A folder is left in
    /// place when it does not exist or the target name is already taken.
    /// Returns whether the downloads folder moved.
    pub async fn rename_manga_dir(&self, manga: &MangaRecord, new_title: &str) -> Result<bool> {
        let old_dir = self.manga_dir(manga);
        let renamed = MangaRecord {
            title: new_title.to_string(),
            ..manga.clone()
        };
        let new_dir = self.manga_dir(&renamed);
        if old_dir == new_dir {
            return Ok(false);
        }

        let moved = move_if_vacant(
            &self.downloads_root.join(&old_dir),
            &self.downloads_root.join(&new_dir),
        )
        .await?;
        move_if_vacant(&self.cache_root.join(&old_dir), &self.cache_root.join(&new_dir)).await?;

        info!(manga_id = manga.id, from = %old_dir, to = %new_dir, moved, "Renamed manga folder");
        Ok(moved)
    }
}

async fn move_if_vacant(from: &Path, to: &Path) -> Result<bool> {
    if !tokio::fs::try_exists(from).await? || tokio::fs::try_exists(to).await? {
        return Ok(false);
    }
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::rename(from, to).await?;
    Ok(true)
}

fn with_archive_suffix(path: &Path) -> PathBuf {
    let mut archive = path.as_os_str().to_os_string();
    archive.push(".cbz");
    PathBuf::from(archive)
}

/// Placeholder values available to chapter and archive templates
pub fn chapter_variables(manga: &MangaRecord, chapter: &ChapterRecord) -> BTreeMap<&'static str, String> {
    let number = chapter.chapter_number;
    let volume = extract_volume(&chapter.name).unwrap_or_default();

    let mut variables = BTreeMap::new();
    variables.insert("title", manga.title.clone());
    variables.insert("name", chapter.name.clone());
    variables.insert("number", format_chapter_number(number));
    variables.insert("number_padded", pad_chapter_number(number, 2));
    variables.insert("number_padded3", pad_chapter_number(number, 3));
    variables.insert(
        "volume_prefix",
        if volume.is_empty() {
            String::new()
        } else {
            format!("Vol.{} ", volume)
        },
    );
    variables.insert("volume", volume);
    variables.insert("title_suffix", extract_title_suffix(&chapter.name, number));
    variables.insert(
        "scanlator",
        chapter
            .scanlator()
            .map(|s| format!("{}_", s))
            .unwrap_or_default(),
    );
    variables
}

/// Replace `{key}` placeholders in one pass; unknown placeholders are left as
/// written and placeholders inside substituted values are not expanded
pub fn format_template(format: &str, variables: &BTreeMap<&'static str, String>) -> String {
    let rendered = PLACEHOLDER_RE.replace_all(format, |caps: &regex::Captures<'_>| {
        variables
            .get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    });
    sanitize_file_name(&rendered)
}

/// Make a string safe to use as a single path component
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let mut trimmed = replaced.trim().trim_end_matches(['.', ' ']).to_string();
    if trimmed.len() > MAX_NAME_BYTES {
        let mut cut = MAX_NAME_BYTES;
        while !trimmed.is_char_boundary(cut) {
            cut -= 1;
        }
        trimmed.truncate(cut);
    }

    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        INVALID_NAME.to_string()
    } else {
        trimmed
    }
}

/// Zero-pad the integer part, keeping any fractional part as written
pub fn pad_chapter_number(number: f32, width: usize) -> String {
    let int_part = number.trunc() as i64;
    let rendered = format_chapter_number(number);
    let fraction = rendered
        .find('.')
        .map(|dot| rendered[dot..].to_string())
        .unwrap_or_default();

    format!("{:0width$}{}", int_part, fraction, width = width)
}

/// `"Vol.1 Ch.5"` -> `Some("1")`
pub fn extract_volume(chapter_name: &str) -> Option<String> {
    VOLUME_RE
        .captures(chapter_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// `"Chapter 5: The Battle"` -> `": The Battle"`
pub fn extract_title_suffix(chapter_name: &str, number: f32) -> String {
    let number = regex::escape(&format_chapter_number(number));
    let patterns = [
        format!(r"(?i)chapter\s*{}[:\s]\s*(.+)", number),
        format!(r"(?i)ch\.?\s*{}[:\s]\s*(.+)", number),
    ];

    patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .find_map(|re| re.captures(chapter_name).and_then(|c| c.get(1)))
        .map(|m| format!(": {}", m.as_str()))
        .unwrap_or_default()
}
