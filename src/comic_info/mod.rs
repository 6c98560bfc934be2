//! `ComicInfo.xml` descriptors for stored chapters.
//!
//! ## Key Components
//!
//! - [`PackagingService`] - Builds the descriptor and writes it into a folder or archive
//! - [`SeriesMetadata`] - Record fields with AniList data merged over them
//! - [`ComicInfo`] - The document and its XML rendering

mod document;
mod metadata;
mod service;

pub use document::{ComicInfo, chapter_title, xml_escape};
pub use metadata::SeriesMetadata;
pub use service::PackagingService;

/// Descriptor file name inside a chapter folder or archive
pub const COMIC_INFO_FILE: &str = "ComicInfo.xml";
