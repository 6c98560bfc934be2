use std::path::Path;
use tracing::debug;

use super::archive::ArchiveProvider;
use super::folder::FolderProvider;
use super::layout::{ChapterPaths, PathLayout};
use super::ChapterProvider;
use crate::records::{ChapterRecord, MangaRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Folder,
    Archive,
}

/// Chooses the storage representation of a chapter at call time
#[derive(Clone)]
pub struct StorageSelector {
    layout: PathLayout,
    download_as_cbz: bool,
}

impl StorageSelector {
    pub fn new(layout: PathLayout, download_as_cbz: bool) -> Self {
        Self {
            layout,
            download_as_cbz,
        }
    }

    pub fn layout(&self) -> &PathLayout {
        &self.layout
    }

    /// An existing archive always wins; otherwise a fresh chapter follows
    /// `download_as_cbz` and an existing folder stays a folder.
    pub fn select(&self, paths: &ChapterPaths) -> Representation {
        select_representation(&paths.archive, &paths.directory, self.download_as_cbz)
    }

    pub fn provider_for(
        &self,
        manga: &MangaRecord,
        chapter: &ChapterRecord,
    ) -> Box<dyn ChapterProvider> {
        let paths = self.layout.chapter_paths(manga, chapter);
        let representation = self.select(&paths);
        debug!(
            chapter_id = chapter.id,
            ?representation,
            path = %paths.directory.display(),
            "Selected chapter storage"
        );

        match representation {
            Representation::Archive => Box::new(ArchiveProvider::new(
                paths.archive,
                paths.staging,
                chapter.clone(),
            )),
            Representation::Folder => Box::new(FolderProvider::new(paths.directory, chapter.clone())),
        }
    }
}

fn select_representation(archive: &Path, directory: &Path, download_as_cbz: bool) -> Representation {
    if archive.is_file() {
        Representation::Archive
    } else if !directory.exists() && download_as_cbz {
        Representation::Archive
    } else {
        Representation::Folder
    }
}
