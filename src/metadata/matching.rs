use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::models::MediaRecord;

static ANILIST_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"anilist\.co/manga/(\d+)").expect("valid AniList URL regex"));

/// Lowercase and strip everything outside `[a-z0-9]`
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// `https://anilist.co/manga/30013/One-Piece` -> `Some(30013)`
pub fn extract_anilist_id(url: &str) -> Option<i64> {
    ANILIST_URL_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Whether any title or synonym of `record` normalizes to `normalized_query`
pub fn titles_match(record: &MediaRecord, normalized_query: &str) -> bool {
    !normalized_query.is_empty()
        && record
            .all_titles()
            .into_iter()
            .any(|t| normalize_title(t) == normalized_query)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// What to do with a title search result that failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UncertainAction {
    Skip,
    #[default]
    Use,
}

impl UncertainAction {
    /// `skip` in any case discards; every other value keeps the result
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("skip") {
            Self::Skip
        } else {
            Self::Use
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataMatch {
    pub record: MediaRecord,
    pub confidence: Confidence,
}

/// Outcome of an enrichment attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Matched(MetadataMatch),
    Unavailable,
}

impl Enrichment {
    pub fn record(&self) -> Option<&MediaRecord> {
        match self {
            Self::Matched(m) => Some(&m.record),
            Self::Unavailable => None,
        }
    }

    pub fn confidence(&self) -> Option<Confidence> {
        match self {
            Self::Matched(m) => Some(m.confidence),
            Self::Unavailable => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::models::MediaTitle;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Kaguya-sama: Love Is War!"), "kaguyasamaloveiswar");
        assert_eq!(normalize_title("ONE PIECE"), "onepiece");
        assert_eq!(normalize_title("進撃の巨人"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for title in ["Dr. STONE", "Re:Zero", "86 -Eighty Six-", ""] {
            let once = normalize_title(title);
            assert_eq!(normalize_title(&once), once);
        }
    }

    #[test]
    fn test_extract_anilist_id() {
        assert_eq!(extract_anilist_id("https://anilist.co/manga/30013/One-Piece/"), Some(30013));
        assert_eq!(extract_anilist_id("/manga/30013"), None);
        assert_eq!(extract_anilist_id(""), None);
    }

    #[test]
    fn test_titles_match_uses_synonyms() {
        let record = MediaRecord {
            id: 1,
            title: MediaTitle {
                romaji: Some("Shingeki no Kyojin".to_string()),
                english: Some("Attack on Titan".to_string()),
                native: None,
            },
            synonyms: vec!["AoT".to_string()],
            ..MediaRecord::default()
        };

        assert!(titles_match(&record, &normalize_title("attack-on-titan")));
        assert!(titles_match(&record, "aot"));
        assert!(!titles_match(&record, "titan"));
        assert!(!titles_match(&record, ""));
    }

    #[test]
    fn test_uncertain_action_parse() {
        assert_eq!(UncertainAction::parse("SKIP"), UncertainAction::Skip);
        assert_eq!(UncertainAction::parse("use"), UncertainAction::Use);
        assert_eq!(UncertainAction::parse("whatever"), UncertainAction::Use);
    }
}
