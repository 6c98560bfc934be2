use serde::{Deserialize, Serialize};

use crate::records::ChapterRecord;
use crate::sources::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    #[default]
    Queued,
    Downloading,
    Finished,
    Error,
}

/// Transient download state of one chapter, owned by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadUnit {
    pub manga_id: i64,
    pub chapter_id: i64,
    /// Filled from the backend on first attempt, reused on retries
    pub pages: Vec<Page>,
    pub completed_pages: usize,
    pub state: DownloadState,
}

impl DownloadUnit {
    pub fn new(manga_id: i64, chapter_id: i64) -> Self {
        Self {
            manga_id,
            chapter_id,
            ..Self::default()
        }
    }

    pub fn for_chapter(chapter: &ChapterRecord) -> Self {
        Self::new(chapter.manga_id, chapter.id)
    }

    /// Completion ratio in `0.0..=1.0`; zero until the page list is known
    pub fn progress(&self) -> f32 {
        if self.pages.is_empty() {
            0.0
        } else {
            self.completed_pages as f32 / self.pages.len() as f32
        }
    }
}
