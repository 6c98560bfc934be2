use async_trait::async_trait;

use super::traits::{Page, PageImage, Source, SourceError, SourceId};
use crate::records::ChapterRecord;

/// Inert stand-in returned when a backend cannot be loaded
#[derive(Debug, Clone)]
pub struct StubSource {
    id: SourceId,
    name: String,
}

impl StubSource {
    pub fn new(id: SourceId) -> Self {
        Self {
            id,
            name: id.to_string(),
        }
    }
}

#[async_trait]
impl Source for StubSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn page_list(&self, _chapter: &ChapterRecord) -> Result<Vec<Page>, SourceError> {
        Err(SourceError::Unavailable(self.id))
    }

    async fn image_url(&self, _page: &Page) -> Result<String, SourceError> {
        Err(SourceError::Unavailable(self.id))
    }

    async fn fetch_image(&self, _page: &Page) -> Result<PageImage, SourceError> {
        Err(SourceError::Unavailable(self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_reports_unavailable() {
        let stub = StubSource::new(1234);
        assert!(!stub.is_available());
        assert_eq!(stub.name(), "1234");

        let err = stub.fetch_image(&Page::new(0, "x")).await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(1234)));
    }
}
