//! AniList metadata lookups backed by a disk cache.
//!
//! ## Key Components
//!
//! - [`MetadataEnricher`] - Cache-first lookups by ID or title with match scoring
//! - [`MetadataCache`] - By-ID and by-title keyspaces mirrored to `anilist_cache.json`
//! - [`CatalogClient`] - Network seam, implemented by [`AniListClient`]
//! - [`TokenStore`] - Persisted access token
//!
//! ## Example
//!
//! ```rust,ignore
//! let enricher = MetadataEnricher::new(client, MetadataCache::load(&data_root, 30), action);
//! match enricher.find_match(&manga.url, &manga.title).await {
//!     Enrichment::Matched(m) => println!("{} ({})", m.record.id, m.confidence.as_str()),
//!     Enrichment::Unavailable => {}
//! }
//! ```

mod cache;
mod client;
mod enricher;
mod matching;
mod models;
mod token;

pub use cache::{CACHE_FILE, CacheStats, MetadataCache};
pub use client::{ANILIST_ENDPOINT, AniListClient, CatalogClient, CatalogError};
pub use enricher::MetadataEnricher;
pub use matching::{
    Confidence, Enrichment, MetadataMatch, UncertainAction, extract_anilist_id, normalize_title,
    titles_match,
};
pub use models::{Connection, Edge, EdgeNode, FuzzyDate, MediaRecord, MediaTag, MediaTitle, PersonName};
pub use token::{TOKEN_FILE, TokenStore};
