//! Source backends and the registry that caches them.
//!
//! ## Key Components
//!
//! - [`Source`] - Capability contract for a backend (list pages, fetch images)
//! - [`SourceRegistry`] - Lazily loads and caches backends by numeric ID
//! - [`SourceLoader`] - Seam to whatever instantiates backends
//! - [`StaticLoader`] - Compiled-in plugin table
//! - [`StubSource`] - Inert fallback when a backend cannot be loaded
//! - [`LocalSource`] - Always-present backend reading local image folders
//!
//! ## Example
//!
//! ```rust,ignore
//! use chaptervault::sources::{LocalSource, SourceRegistry, StaticLoader};
//!
//! let registry = SourceRegistry::with_local(
//!     Arc::new(StaticLoader::new()),
//!     Arc::new(LocalSource::new("data/local")),
//! );
//! let source = registry.resolve(manga.source_id);
//! let pages = source.page_list(&chapter).await?;
//! ```

mod loader;
mod local;
mod registry;
mod stub;
mod traits;

pub use loader::{LoadError, LoadedBackend, SourceLoader, StaticLoader};
pub use local::LocalSource;
pub use registry::SourceRegistry;
pub use stub::StubSource;
pub use traits::{LOCAL_SOURCE_ID, Page, PageImage, Source, SourceError, SourceId};
