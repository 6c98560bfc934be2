pub mod comic_info;
pub mod config;
pub mod downloader;
pub mod metadata;
pub mod net;
pub mod records;
pub mod sources;
pub mod state;
pub mod storage;
