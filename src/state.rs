use std::sync::Arc;
use tracing::info;

use crate::comic_info::PackagingService;
use crate::config::Config;
use crate::downloader::ChapterDownloader;
use crate::metadata::{AniListClient, CatalogClient, MetadataCache, MetadataEnricher, TokenStore};
use crate::net::{HttpClient, HttpConfig, HttpError};
use crate::sources::{LocalSource, SourceLoader, SourceRegistry};
use crate::storage::{PathLayout, StorageSelector};

/// Fully wired services for one process
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<SourceRegistry>,
    pub enricher: Arc<MetadataEnricher>,
    pub packaging: Arc<PackagingService>,
    pub downloader: Arc<ChapterDownloader>,
}

impl AppState {
    /// Wire everything against the live AniList API
    pub fn new(config: Config, loader: Arc<dyn SourceLoader>) -> Result<Self, HttpError> {
        let token = config
            .metadata
            .token
            .clone()
            .or_else(|| TokenStore::new(&config.paths.data_root).load());
        let http = HttpClient::new(HttpConfig::from(&config.http))?;
        let client = AniListClient::new(http, config.metadata.endpoint.clone(), token);

        Ok(Self::assemble(config, loader, Arc::new(client)))
    }

    /// Wire everything against an arbitrary catalog client
    pub fn assemble(
        config: Config,
        loader: Arc<dyn SourceLoader>,
        catalog: Arc<dyn CatalogClient>,
    ) -> Self {
        let local = Arc::new(LocalSource::new(config.paths.local_source_root.clone()));
        let registry = Arc::new(SourceRegistry::with_local(loader, local));

        let cache = MetadataCache::load(&config.paths.data_root, config.metadata.cache_retention_days);
        let enricher = Arc::new(MetadataEnricher::new(
            catalog,
            cache,
            config.metadata.uncertain_action(),
        ));

        let packaging = Arc::new(PackagingService::new(
            &config.metadata,
            Some(enricher.clone()),
        ));

        let layout = PathLayout::new(&config.paths, &config.downloads, registry.clone());
        let selector = StorageSelector::new(layout, config.downloads.download_as_cbz);
        let downloader = Arc::new(ChapterDownloader::new(
            selector,
            registry.clone(),
            packaging.clone(),
        ));

        info!(
            downloads_root = %config.paths.downloads_root.display(),
            download_as_cbz = config.downloads.download_as_cbz,
            use_anilist = config.metadata.use_anilist,
            "Services ready"
        );

        Self {
            config: Arc::new(config),
            registry,
            enricher,
            packaging,
            downloader,
        }
    }
}
