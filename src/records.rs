//! Row-like manga and chapter records consumed by the core.
//!
//! These mirror the attribute bundles the persistence layer hands over; the
//! core never writes them back.

use serde::{Deserialize, Deserializer, Serialize};

use crate::sources::SourceId;

/// Publication status as stored on the manga row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MangaStatus {
    #[default]
    Unknown,
    Ongoing,
    Completed,
    Licensed,
    PublishingFinished,
    Cancelled,
    OnHiatus,
}

impl MangaStatus {
    /// Map the numeric status code used by source backends
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Ongoing,
            2 => Self::Completed,
            3 => Self::Licensed,
            4 => Self::PublishingFinished,
            5 => Self::Cancelled,
            6 => Self::OnHiatus,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Ongoing => "Ongoing",
            Self::Completed => "Completed",
            Self::Licensed => "Licensed",
            Self::PublishingFinished => "Publishing finished",
            Self::Cancelled => "Cancelled",
            Self::OnHiatus => "On hiatus",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MangaRecord {
    pub id: i64,
    pub source_id: SourceId,
    pub title: String,
    /// Source-relative URL; may embed an AniList link
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    /// Comma separated genre list, as scraped
    #[serde(default)]
    pub genre: Option<String>,
    /// Either a status name or the numeric code backends report
    #[serde(default, deserialize_with = "status_name_or_code")]
    pub status: MangaStatus,
    /// Library categories the user filed the manga under
    #[serde(default)]
    pub categories: Vec<String>,
}

fn status_name_or_code<'de, D>(deserializer: D) -> Result<MangaStatus, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Code(i32),
        Name(MangaStatus),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Code(code) => MangaStatus::from_code(code),
        Repr::Name(status) => status,
    })
}

impl MangaRecord {
    pub fn genres(&self) -> Vec<String> {
        self.genre
            .as_deref()
            .map(|g| {
                g.split(", ")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: i64,
    pub manga_id: i64,
    #[serde(default)]
    pub url: String,
    /// Public web URL of the chapter, when the source exposes one
    #[serde(default)]
    pub real_url: Option<String>,
    pub name: String,
    /// Negative when the source could not parse a number
    #[serde(default = "unknown_chapter_number")]
    pub chapter_number: f32,
    #[serde(default)]
    pub scanlator: Option<String>,
    /// Upload date in epoch milliseconds, 0 when unknown
    #[serde(default)]
    pub date_upload: i64,
    #[serde(default)]
    pub page_count: i32,
}

fn unknown_chapter_number() -> f32 {
    -1.0
}

impl ChapterRecord {
    pub fn web_url(&self) -> &str {
        self.real_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.url)
    }

    pub fn scanlator(&self) -> Option<&str> {
        self.scanlator.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Render a chapter number without a trailing `.0` when it is integral
pub fn format_chapter_number(number: f32) -> String {
    if number.fract() == 0.0 {
        format!("{}", number as i64)
    } else {
        format!("{}", number)
    }
}
