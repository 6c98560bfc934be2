use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use super::loader::{LoadError, LoadedBackend, SourceLoader};
use super::stub::StubSource;
use super::traits::{LOCAL_SOURCE_ID, Source, SourceId};

/// Process-wide cache of live source backends keyed by source ID.
///
/// Loading happens outside the lock. Two callers racing on an unseen ID may
/// both load the backend, but the first insert wins and every caller gets
/// the retained handle back.
pub struct SourceRegistry {
    sources: RwLock<HashMap<SourceId, Arc<dyn Source>>>,
    loader: Arc<dyn SourceLoader>,
}

impl SourceRegistry {
    pub fn new(loader: Arc<dyn SourceLoader>) -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            loader,
        }
    }

    /// Create a registry with `local` installed under the reserved ID
    pub fn with_local(loader: Arc<dyn SourceLoader>, local: Arc<dyn Source>) -> Self {
        let registry = Self::new(loader);
        registry.register(LOCAL_SOURCE_ID, local);
        registry
    }

    /// Resolve a backend, falling back to a stub that reports itself unavailable
    pub fn resolve(&self, id: SourceId) -> Arc<dyn Source> {
        self.get_or_none(id)
            .unwrap_or_else(|| Arc::new(StubSource::new(id)))
    }

    /// Resolve a backend, returning `None` when it cannot be loaded
    pub fn get_or_none(&self, id: SourceId) -> Option<Arc<dyn Source>> {
        match self.try_resolve(id) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!(source_id = id, error = %e, "Source resolution failed");
                None
            }
        }
    }

    fn try_resolve(&self, id: SourceId) -> Result<Arc<dyn Source>, LoadError> {
        if let Some(source) = self.cached(id) {
            return Ok(source);
        }

        let produced = match self.loader.load(id)? {
            LoadedBackend::Single(source) => vec![source],
            LoadedBackend::Factory(sources) => sources,
        };
        if produced.is_empty() {
            return Err(LoadError::UnknownShape(id));
        }

        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        for source in produced {
            sources.entry(source.id()).or_insert(source);
        }
        debug!(source_id = id, cached = sources.len(), "Loaded source backend");

        sources.get(&id).cloned().ok_or(LoadError::NotFound(id))
    }

    fn cached(&self, id: SourceId) -> Option<Arc<dyn Source>> {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Install an already-instantiated backend
    pub fn register(&self, id: SourceId, source: Arc<dyn Source>) {
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, source);
    }

    pub fn unregister(&self, id: SourceId) {
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Drop every cached backend except the local one
    pub fn unregister_all(&self) {
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|id, _| *id == LOCAL_SOURCE_ID);
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ChapterRecord;
    use crate::sources::loader::StaticLoader;
    use crate::sources::traits::{Page, PageImage, SourceError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NamedSource {
        id: SourceId,
        name: String,
    }

    impl NamedSource {
        fn arc(id: SourceId, name: &str) -> Arc<dyn Source> {
            Arc::new(Self {
                id,
                name: name.to_string(),
            })
        }
    }

    #[async_trait]
    impl Source for NamedSource {
        fn id(&self) -> SourceId {
            self.id
        }

        fn name(&self) -> &str {
            &self.name
        }

        async fn page_list(&self, _chapter: &ChapterRecord) -> Result<Vec<Page>, SourceError> {
            Ok(Vec::new())
        }

        async fn fetch_image(&self, page: &Page) -> Result<PageImage, SourceError> {
            Err(SourceError::Fetch {
                index: page.index,
                reason: "not implemented".to_string(),
            })
        }
    }

    #[test]
    fn test_resolve_unknown_returns_stub() {
        let registry = SourceRegistry::new(Arc::new(StaticLoader::new()));

        let source = registry.resolve(77);
        assert_eq!(source.id(), 77);
        assert!(!source.is_available());
        assert!(!registry.contains(77));
    }

    #[test]
    fn test_construction_failure_is_not_cached() {
        let loader = StaticLoader::new().with(5, || {
            Err(LoadError::Construction("missing class".to_string()))
        });
        let registry = SourceRegistry::new(Arc::new(loader));

        assert!(registry.get_or_none(5).is_none());
        assert!(!registry.resolve(5).is_available());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_factory_is_unknown_shape() {
        let loader = StaticLoader::new().with(9, || Ok(LoadedBackend::Factory(Vec::new())));
        let registry = SourceRegistry::new(Arc::new(loader));

        assert!(matches!(registry.try_resolve(9), Err(LoadError::UnknownShape(9))));
    }

    #[test]
    fn test_factory_caches_every_produced_source() {
        let loader = StaticLoader::new().with(10, || {
            Ok(LoadedBackend::Factory(vec![
                NamedSource::arc(10, "en"),
                NamedSource::arc(11, "ja"),
            ]))
        });
        let registry = SourceRegistry::new(Arc::new(loader));

        assert_eq!(registry.resolve(10).name(), "en");
        assert!(registry.contains(11));
        assert_eq!(registry.resolve(11).name(), "ja");
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = SourceRegistry::new(Arc::new(StaticLoader::new()));
        registry.register(3, NamedSource::arc(3, "manual"));

        assert_eq!(registry.resolve(3).name(), "manual");

        registry.unregister(3);
        assert!(!registry.contains(3));
    }

    #[test]
    fn test_unregister_all_keeps_local_source() {
        let registry = SourceRegistry::with_local(
            Arc::new(StaticLoader::new()),
            NamedSource::arc(LOCAL_SOURCE_ID, "Local source"),
        );
        registry.register(1, NamedSource::arc(1, "one"));
        registry.register(2, NamedSource::arc(2, "two"));

        registry.unregister_all();

        assert_eq!(registry.len(), 1);
        let local = registry.resolve(LOCAL_SOURCE_ID);
        assert!(local.is_available());
        assert_eq!(local.name(), "Local source");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_resolve_settles_on_one_handle() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let loader = StaticLoader::new().with(42, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(LoadedBackend::Single(NamedSource::arc(42, "racy")))
        });
        let registry = Arc::new(SourceRegistry::new(Arc::new(loader)));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move { registry.resolve(42) }));
        }

        let mut resolved = Vec::new();
        for handle in handles {
            resolved.push(handle.await.unwrap());
        }

        let retained = registry.resolve(42);
        assert!(loads.load(Ordering::SeqCst) >= 1);
        assert_eq!(registry.len(), 1);
        for source in resolved {
            assert!(Arc::ptr_eq(&source, &retained));
        }
    }
}
