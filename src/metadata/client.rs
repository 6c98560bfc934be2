use async_trait::async_trait;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use super::models::MediaRecord;
use crate::net::{HttpClient, HttpError};

pub const ANILIST_ENDPOINT: &str = "https://graphql.anilist.co";

/// Fields requested for every media lookup
const MEDIA_FIELDS: &str = r#"
    id
    idMal
    title { romaji english native }
    description
    format
    status
    chapters
    volumes
    genres
    tags { name category }
    synonyms
    startDate { year month day }
    staff { edges { role node { name { full } } } }
    characters { edges { role node { name { full } } } }
    countryOfOrigin
    source
    averageScore
    isAdult
    siteUrl
"#;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("GraphQL error: {0}")]
    Graphql(String),

    #[error("Malformed media record: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Network seam of the enricher
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn media_by_id(&self, id: i64) -> Result<Option<MediaRecord>>;

    async fn search_media(&self, title: &str) -> Result<Option<MediaRecord>>;
}

/// AniList GraphQL client
pub struct AniListClient {
    http: HttpClient,
    endpoint: String,
    token: Option<String>,
}

impl AniListClient {
    pub fn new(http: HttpClient, endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            token,
        }
    }

    async fn query_media(&self, query: &str, variables: Value) -> Result<Option<MediaRecord>> {
        let body = json!({ "query": query, "variables": variables });

        let response = match self
            .http
            .post_json(&self.endpoint, &body, self.token.as_deref())
            .await
        {
            Ok(response) => response,
            // AniList answers a search without results with 404
            Err(HttpError::Status { status: 404, .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        parse_media_response(response)
    }
}

#[async_trait]
impl CatalogClient for AniListClient {
    async fn media_by_id(&self, id: i64) -> Result<Option<MediaRecord>> {
        debug!(id, "Querying AniList by ID");
        let query = format!(
            "query ($id: Int) {{ Media(type: MANGA, id: $id) {{ {} }} }}",
            MEDIA_FIELDS
        );
        self.query_media(&query, json!({ "id": id })).await
    }

    async fn search_media(&self, title: &str) -> Result<Option<MediaRecord>> {
        debug!(title, "Searching AniList by title");
        let query = format!(
            "query ($search: String) {{ Media(type: MANGA, search: $search) {{ {} }} }}",
            MEDIA_FIELDS
        );
        self.query_media(&query, json!({ "search": title })).await
    }
}

/// Extract `data.Media` from a GraphQL response
fn parse_media_response(mut response: Value) -> Result<Option<MediaRecord>> {
    match response.pointer_mut("/data/Media").map(Value::take) {
        Some(Value::Null) | None => {
            if let Some(errors) = response.get("errors").filter(|e| !e.is_null()) {
                if response.pointer("/data").is_none_or(Value::is_null) {
                    return Err(CatalogError::Graphql(errors.to_string()));
                }
            }
            Ok(None)
        }
        Some(media) => Ok(Some(serde_json::from_value(media)?)),
    }
}
