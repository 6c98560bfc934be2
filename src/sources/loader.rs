use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use super::traits::{Source, SourceId};

/// What a backend entry point hands back when instantiated
pub enum LoadedBackend {
    /// The entry point is a single source
    Single(Arc<dyn Source>),
    /// The entry point is a factory producing several sources
    Factory(Vec<Arc<dyn Source>>),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no backend registered for source {0}")]
    NotFound(SourceId),
    #[error("backend construction failed: {0}")]
    Construction(String),
    #[error("unknown backend shape for source {0}")]
    UnknownShape(SourceId),
}

/// Locates and instantiates source backends by ID.
///
/// Only called from [`SourceRegistry`](super::SourceRegistry) on a cache miss.
pub trait SourceLoader: Send + Sync {
    fn load(&self, id: SourceId) -> Result<LoadedBackend, LoadError>;
}

type BackendFactory = Arc<dyn Fn() -> Result<LoadedBackend, LoadError> + Send + Sync>;

/// Compiled-in plugin table
#[derive(Clone, Default)]
pub struct StaticLoader {
    table: HashMap<SourceId, BackendFactory>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, id: SourceId, factory: F)
    where
        F: Fn() -> Result<LoadedBackend, LoadError> + Send + Sync + 'static,
    {
        self.table.insert(id, Arc::new(factory));
    }

    pub fn with<F>(mut self, id: SourceId, factory: F) -> Self
    where
        F: Fn() -> Result<LoadedBackend, LoadError> + Send + Sync + 'static,
    {
        self.insert(id, factory);
        self
    }
}

impl SourceLoader for StaticLoader {
    fn load(&self, id: SourceId) -> Result<LoadedBackend, LoadError> {
        let factory = self.table.get(&id).ok_or(LoadError::NotFound(id))?;
        factory()
    }
}
