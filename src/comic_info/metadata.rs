use regex::Regex;
use std::sync::LazyLock;

use crate::config::ContentType;
use crate::metadata::{Enrichment, MediaRecord};
use crate::records::{ChapterRecord, MangaRecord, MangaStatus};
use crate::storage::extract_volume;

const MAX_CHARACTERS: usize = 10;
const ADULT_RATING: &str = "Adults Only 18+";

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid HTML tag regex"));

/// Series level fields of a descriptor, merged from the records and AniList
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesMetadata {
    pub title: String,
    pub description: String,
    pub author: String,
    pub artist: String,
    pub genres: Vec<String>,
    pub volume: String,
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    /// Human readable status; empty when unknown
    pub status: String,
    pub alternative_titles: Vec<String>,
    pub characters: Vec<String>,
    pub teams: Vec<String>,
    pub story_arc: String,
    /// Library categories, written as a Tachiyomi extension element
    pub categories: Vec<String>,
    pub publisher: String,
    pub age_rating: String,
    pub right_to_left: bool,
    pub content_type: ContentType,
    pub anilist_id: Option<i64>,
    pub site_url: String,
}

impl SeriesMetadata {
    /// Fields available from the stored records alone
    pub fn from_records(manga: &MangaRecord, chapter: &ChapterRecord, content_type: ContentType) -> Self {
        Self {
            title: manga.title.clone(),
            description: manga.description.clone().unwrap_or_default(),
            author: manga.author.clone().unwrap_or_default(),
            artist: manga.artist.clone().unwrap_or_default(),
            genres: manga.genres(),
            volume: extract_volume(&chapter.name).unwrap_or_default(),
            year: None,
            month: None,
            day: None,
            status: match manga.status {
                MangaStatus::Unknown => String::new(),
                status => status.label().to_string(),
            },
            alternative_titles: Vec::new(),
            characters: Vec::new(),
            teams: Vec::new(),
            story_arc: String::new(),
            categories: manga.categories.clone(),
            publisher: String::new(),
            age_rating: "Unknown".to_string(),
            right_to_left: content_type.right_to_left_by_default(),
            content_type,
            anilist_id: None,
            site_url: String::new(),
        }
    }

    /// Overlay an enrichment result; only present, non-empty fields replace local ones
    pub fn apply(&mut self, enrichment: &Enrichment) {
        if let Some(record) = enrichment.record() {
            self.merge(record);
        }
    }

    fn merge(&mut self, record: &MediaRecord) {
        let mut alternatives: Vec<String> = Vec::new();
        for title in record.all_titles() {
            if title != self.title && !alternatives.iter().any(|t| t == title) {
                alternatives.push(title.to_string());
            }
        }
        self.alternative_titles = alternatives;

        if let Some(description) = record.description.as_deref() {
            let cleaned = HTML_TAG_RE.replace_all(description, "").trim().to_string();
            if !cleaned.is_empty() {
                self.description = cleaned;
            }
        }

        let authors = record
            .staff
            .names_where(|role| role.contains("story") || role.contains("author") || role.contains("writer"));
        if !authors.is_empty() {
            self.author = authors.join(", ");
        }
        let artists = record.staff.names_where(|role| {
            !(role.contains("story") || role.contains("author") || role.contains("writer"))
                && (role.contains("art") || role.contains("illustrat"))
        });
        if !artists.is_empty() {
            self.artist = artists.join(", ");
        }

        if !record.genres.is_empty() {
            self.genres = record.genres.clone();
        }

        if let Some(date) = record.start_date {
            self.year = date.year.or(self.year);
            self.month = date.month.or(self.month);
            self.day = date.day.or(self.day);
        }

        if let Some(status) = record.status.as_deref().filter(|s| !s.is_empty()) {
            self.status = anilist_status_label(status).to_string();
        }

        let characters: Vec<String> = record
            .characters
            .names_where(|_| true)
            .into_iter()
            .take(MAX_CHARACTERS)
            .collect();
        if !characters.is_empty() {
            self.characters = characters;
        }

        if record.country_of_origin.as_deref() == Some("JP") {
            self.right_to_left = true;
        }
        if record.is_adult {
            self.age_rating = ADULT_RATING.to_string();
        }
        if let Some(url) = record.site_url.as_deref().filter(|u| !u.is_empty()) {
            self.site_url = url.to_string();
        }
        self.anilist_id = Some(record.id);
    }

    /// Free-text notes: alternative titles, status, AniList ID, AniList URL
    pub fn notes(&self) -> Option<String> {
        let mut notes = Vec::new();
        if !self.alternative_titles.is_empty() {
            notes.push(format!("Alternative Titles:\n{}", self.alternative_titles.join("\n")));
        }
        if !self.status.is_empty() {
            notes.push(format!("Status: {}", self.status));
        }
        if let Some(id) = self.anilist_id {
            notes.push(format!("AniList ID: {}", id));
        }
        if !self.site_url.is_empty() {
            notes.push(format!("AniList URL: {}", self.site_url));
        }

        (!notes.is_empty()).then(|| notes.join("\n"))
    }

    pub fn publishing_status(&self) -> String {
        if self.status.is_empty() {
            "Unknown".to_string()
        } else {
            self.status.clone()
        }
    }

    /// Value of the `Manga` element
    pub fn reading_direction(&self) -> &'static str {
        if self.right_to_left {
            "YesAndRightToLeft"
        } else if self.content_type == ContentType::Comic {
            "No"
        } else {
            "Yes"
        }
    }
}

fn anilist_status_label(status: &str) -> &str {
    match status {
        "FINISHED" => "Completed",
        "RELEASING" | "NOT_YET_RELEASED" => "Ongoing",
        "CANCELLED" => "Cancelled",
        "HIATUS" => "Hiatus",
        other => other,
    }
}
