use regex::Regex;
use std::sync::LazyLock;
use time::OffsetDateTime;

use super::metadata::SeriesMetadata;
use crate::records::{ChapterRecord, format_chapter_number};

static CHAPTER_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:Vol\.\d+\s*)?(?:Ch\.\d+(?:\.\d+)?)?(?:\s*-\s*"?(.+?)"?)?$"#)
        .expect("valid chapter title regex")
});

/// Escape XML special characters
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// `Vol.1 Ch.5 - "The Name"` -> `The Name`; names without that shape are kept whole
pub fn chapter_title(name: &str) -> String {
    let extracted = CHAPTER_TITLE_RE
        .captures(name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_matches('"').trim().to_string())
        .unwrap_or_default();

    if extracted.is_empty() {
        name.to_string()
    } else {
        extracted
    }
}

/// A `ComicInfo.xml` document; `None` and empty fields are not written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComicInfo {
    pub series: Option<String>,
    pub title: Option<String>,
    pub number: Option<String>,
    pub volume: Option<String>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub writer: Option<String>,
    pub penciller: Option<String>,
    pub inker: Option<String>,
    pub colorist: Option<String>,
    pub publisher: Option<String>,
    pub genre: Option<String>,
    pub page_count: Option<i32>,
    pub characters: Option<String>,
    pub teams: Option<String>,
    pub age_rating: Option<String>,
    pub black_and_white: Option<String>,
    pub manga: Option<String>,
    pub scan_information: Option<String>,
    pub story_arc: Option<String>,
    pub translator: Option<String>,
    pub web: Option<String>,
    pub publishing_status: Option<String>,
    pub categories: Option<String>,
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn joined(values: &[String]) -> Option<String> {
    non_empty(&values.join(", "))
}

impl ComicInfo {
    /// Build the descriptor of one chapter from merged series metadata
    pub fn build(meta: &SeriesMetadata, chapter: &ChapterRecord) -> Self {
        let scanlator = chapter.scanlator().map(str::to_string);
        let upload_date = (chapter.date_upload > 0)
            .then(|| OffsetDateTime::from_unix_timestamp(chapter.date_upload / 1000).ok())
            .flatten();

        // Release date comes from AniList when it knows the year, else from the upload
        let (year, month, day) = match meta.year.filter(|y| *y > 0) {
            Some(year) => (
                Some(year),
                meta.month.filter(|m| *m > 0),
                meta.day.filter(|d| *d > 0),
            ),
            None => match upload_date {
                Some(date) => (Some(date.year()), Some(u8::from(date.month())), Some(date.day())),
                None => (None, None, None),
            },
        };

        Self {
            series: non_empty(&meta.title),
            title: non_empty(&chapter_title(&chapter.name)),
            number: (chapter.chapter_number >= 0.0)
                .then(|| format_chapter_number(chapter.chapter_number)),
            volume: non_empty(&meta.volume),
            summary: non_empty(&meta.description),
            notes: meta.notes(),
            year,
            month,
            day,
            writer: non_empty(&meta.author),
            penciller: non_empty(&meta.artist),
            inker: non_empty(&meta.artist),
            colorist: non_empty(&meta.artist),
            publisher: non_empty(&meta.publisher),
            genre: joined(&meta.genres),
            page_count: (chapter.page_count > 0).then_some(chapter.page_count),
            characters: joined(&meta.characters),
            teams: joined(&meta.teams),
            age_rating: non_empty(&meta.age_rating),
            black_and_white: Some("Yes".to_string()),
            manga: Some(meta.reading_direction().to_string()),
            scan_information: Some(
                scanlator
                    .as_ref()
                    .map(|s| format!("Released by {}", s))
                    .unwrap_or_else(|| "Unknown".to_string()),
            ),
            story_arc: non_empty(&meta.story_arc),
            translator: scanlator,
            web: non_empty(chapter.web_url()),
            publishing_status: Some(meta.publishing_status()),
            categories: joined(&meta.categories),
        }
    }

    pub fn to_xml(&self) -> String {
        let mut lines = vec![
            r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
            r#"<ComicInfo xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#.to_string(),
        ];

        let mut element = |name: &str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                lines.push(format!("  <{name}>{}</{name}>", xml_escape(&value)));
            }
        };

        element("Series", self.series.clone());
        element("Title", self.title.clone());
        element("Number", self.number.clone());
        element("Volume", self.volume.clone());
        element("Summary", self.summary.clone());
        element("Notes", self.notes.clone());
        element("Year", self.year.map(|v| v.to_string()));
        element("Month", self.month.map(|v| v.to_string()));
        element("Day", self.day.map(|v| v.to_string()));
        element("Writer", self.writer.clone());
        element("Penciller", self.penciller.clone());
        element("Inker", self.inker.clone());
        element("Colorist", self.colorist.clone());
        element("Publisher", self.publisher.clone());
        element("Genre", self.genre.clone());
        element("PageCount", self.page_count.map(|v| v.to_string()));
        element("Characters", self.characters.clone());
        element("Teams", self.teams.clone());
        element("AgeRating", self.age_rating.clone());
        element("BlackAndWhite", self.black_and_white.clone());
        element("Manga", self.manga.clone());
        element("ScanInformation", self.scan_information.clone());
        element("StoryArc", self.story_arc.clone());
        element("Translator", self.translator.clone());
        element("Web", self.web.clone());

        if let Some(status) = self.publishing_status.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!(
                r#"  <ty:PublishingStatusTachiyomi xmlns:ty="http://www.w3.org/2001/XMLSchema">{}</ty:PublishingStatusTachiyomi>"#,
                xml_escape(status)
            ));
        }
        if let Some(categories) = self.categories.as_deref().filter(|s| !s.is_empty()) {
            lines.push(format!(
                r#"  <ty:CategoriesTachiyomi xmlns:ty="http://www.w3.org/2001/XMLSchema">{}</ty:CategoriesTachiyomi>"#,
                xml_escape(categories)
            ));
        }

        lines.push("</ComicInfo>".to_string());
        lines.join("\n") + "\n"
    }
}
