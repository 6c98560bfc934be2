use std::sync::Arc;
use tracing::{debug, info, warn};

use super::cache::{CacheStats, MetadataCache};
use super::client::CatalogClient;
use super::matching::{
    Confidence, Enrichment, MetadataMatch, UncertainAction, extract_anilist_id, normalize_title,
    titles_match,
};
use super::models::MediaRecord;

/// Cache-first AniList lookups with confidence-scored matching.
///
/// The cache lock is only taken for map reads and writes, never across a
/// network call, so lookups for different keys run independently.
pub struct MetadataEnricher {
    client: Arc<dyn CatalogClient>,
    cache: MetadataCache,
    uncertain_action: UncertainAction,
}

impl MetadataEnricher {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        cache: MetadataCache,
        uncertain_action: UncertainAction,
    ) -> Self {
        Self {
            client,
            cache,
            uncertain_action,
        }
    }

    pub async fn lookup_by_id(&self, id: i64) -> Option<MediaRecord> {
        if id <= 0 {
            return None;
        }
        if let Some(record) = self.cache.by_id(id) {
            debug!(id, "Using cached AniList data");
            return Some(record);
        }

        let record = match self.client.media_by_id(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(id, "No AniList media for ID");
                return None;
            }
            Err(e) => {
                warn!(id, error = %e, "AniList lookup by ID failed");
                return None;
            }
        };

        self.cache.insert(&record, None);
        self.cache.save().await;
        Some(record)
    }

    pub async fn lookup_by_title(&self, title: &str) -> Option<MediaRecord> {
        let key = normalize_title(title);
        if key.is_empty() {
            return None;
        }
        if let Some(record) = self.cache.by_title(&key) {
            debug!(title, "Using cached AniList data");
            return Some(record);
        }

        let record = match self.client.search_media(title).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(title, "No AniList match for title");
                return None;
            }
            Err(e) => {
                warn!(title, error = %e, "AniList title search failed");
                return None;
            }
        };

        self.cache.insert(&record, Some(title));
        self.cache.save().await;
        Some(record)
    }

    /// Find the AniList record for a manga.
    ///
    /// An ID embedded in `manga_url` is trusted outright. Otherwise the title
    /// search result is verified against the query; an unverified result is
    /// kept or dropped according to the configured uncertain action.
    pub async fn find_match(&self, manga_url: &str, title: &str) -> Enrichment {
        if let Some(id) = extract_anilist_id(manga_url) {
            info!(id, "Found AniList ID in manga URL");
            if let Some(record) = self.lookup_by_id(id).await {
                return Enrichment::Matched(MetadataMatch {
                    record,
                    confidence: Confidence::High,
                });
            }
        }

        let Some(record) = self.lookup_by_title(title).await else {
            return Enrichment::Unavailable;
        };

        let confidence = if titles_match(&record, &normalize_title(title)) {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        if confidence == Confidence::Low && self.uncertain_action == UncertainAction::Skip {
            info!(title, anilist_id = record.id, "Discarding unverified AniList match");
            return Enrichment::Unavailable;
        }

        debug!(title, anilist_id = record.id, confidence = confidence.as_str(), "AniList match");
        Enrichment::Matched(MetadataMatch { record, confidence })
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}
