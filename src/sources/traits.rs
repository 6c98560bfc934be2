use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::records::ChapterRecord;

pub type SourceId = i64;

/// Reserved ID of the always-present local backend
pub const LOCAL_SOURCE_ID: SourceId = 0;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source {0} is not available")]
    Unavailable(SourceId),
    #[error("page list failed: {0}")]
    PageList(String),
    #[error("image fetch failed for page {index}: {reason}")]
    Fetch { index: usize, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page of a chapter as reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    pub url: String,
    pub image_url: Option<String>,
}

impl Page {
    pub fn new(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
            image_url: None,
        }
    }
}

/// Raw page image returned by a backend
#[derive(Debug, Clone)]
pub struct PageImage {
    pub bytes: Bytes,
    /// Content type reported by the backend, if any
    pub content_type: Option<String>,
}

/// Capability contract every source backend satisfies.
///
/// Handles are shared across concurrent downloads, so implementations must
/// be `Send + Sync` and keep per-call state on the stack.
#[async_trait]
pub trait Source: Send + Sync {
    fn id(&self) -> SourceId;

    fn name(&self) -> &str;

    /// Whether the backend can serve requests at all
    fn is_available(&self) -> bool {
        true
    }

    /// List the pages of a chapter in reading order
    async fn page_list(&self, chapter: &ChapterRecord) -> Result<Vec<Page>, SourceError>;

    /// Resolve where the image of a page lives
    async fn image_url(&self, page: &Page) -> Result<String, SourceError> {
        Ok(page.image_url.clone().unwrap_or_else(|| page.url.clone()))
    }

    /// Fetch the image bytes of a page
    async fn fetch_image(&self, page: &Page) -> Result<PageImage, SourceError>;
}
