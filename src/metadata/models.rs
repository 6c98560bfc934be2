//! AniList media record as returned by the GraphQL API and stored in the cache

use serde::{Deserialize, Deserializer, Serialize};

/// AniList sends `null` for empty lists and flags
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: i64,
    #[serde(default)]
    pub id_mal: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub title: MediaTitle,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// `FINISHED`, `RELEASING`, `NOT_YET_RELEASED`, `CANCELLED` or `HIATUS`
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub chapters: Option<i32>,
    #[serde(default)]
    pub volumes: Option<i32>,
    #[serde(default, deserialize_with = "null_default")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub tags: Vec<MediaTag>,
    #[serde(default, deserialize_with = "null_default")]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub start_date: Option<FuzzyDate>,
    #[serde(default, deserialize_with = "null_default")]
    pub staff: Connection,
    #[serde(default, deserialize_with = "null_default")]
    pub characters: Connection,
    #[serde(default)]
    pub country_of_origin: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub average_score: Option<i32>,
    #[serde(default, deserialize_with = "null_default")]
    pub is_adult: bool,
    #[serde(default)]
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaTitle {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub native: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FuzzyDate {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub month: Option<u8>,
    #[serde(default)]
    pub day: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaTag {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Staff or character edges
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default, deserialize_with = "null_default")]
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub node: EdgeNode,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeNode {
    #[serde(default, deserialize_with = "null_default")]
    pub name: PersonName,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersonName {
    #[serde(default)]
    pub full: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl MediaRecord {
    /// Display title: english, then romaji, then native
    pub fn display_title(&self) -> Option<&str> {
        non_empty(&self.title.english)
            .or_else(|| non_empty(&self.title.romaji))
            .or_else(|| non_empty(&self.title.native))
    }

    /// Every title variant and synonym, in that order
    pub fn all_titles(&self) -> Vec<&str> {
        [&self.title.english, &self.title.romaji, &self.title.native]
            .into_iter()
            .filter_map(non_empty)
            .chain(self.synonyms.iter().map(|s| s.trim()).filter(|s| !s.is_empty()))
            .collect()
    }
}

impl Connection {
    /// Full names of edges whose role satisfies `pred`
    pub fn names_where(&self, pred: impl Fn(&str) -> bool) -> Vec<String> {
        self.edges
            .iter()
            .filter(|e| pred(&e.role.as_deref().unwrap_or_default().to_lowercase()))
            .filter_map(|e| non_empty(&e.node.name.full).map(str::to_string))
            .collect()
    }
}
